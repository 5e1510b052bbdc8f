//! Outcome tallies, the locked-capital integral and the final run record.

use floodgate_core::{
    ConsistencyError, MILLIS_PER_DAY, RunParameters, SATS_PER_BTC, Sats, SimTime, TopologyKind,
};
use serde::{Deserialize, Serialize};

use crate::deterministic::CapitalBounds;
use crate::topology::{OperationalStats, OutcomeRecord};

/// Everything the accumulator needs from the rest of the run to finalize.
#[derive(Debug, Clone)]
pub struct RunContext<'a> {
    /// Parameters of the run
    pub params: &'a RunParameters,
    /// Counters reported by the topology
    pub operations: OperationalStats,
    /// Events dispatched by the scheduler
    pub events_processed: u64,
}

/// Flat, serializable summary of one run.
///
/// Parameters are flattened into the record so that one row of a results
/// table identifies its run completely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Parameters of the run
    #[serde(flatten)]
    pub parameters: RunParameters,
    /// Length of the observation window in seconds
    pub duration_secs: f64,
    /// Payment intents attempted
    pub total_payments: u64,
    /// Payments that succeeded
    pub total_successes: u64,
    /// Payments that failed
    pub total_failures: u64,
    /// Sats moved by successful payments
    pub total_volume: Sats,
    /// Sats of failed payments
    pub failed_volume: Sats,
    /// Failures over attempts, 0 without attempts
    pub failure_rate: f64,
    /// Time-weighted average locked capital in sats
    pub avg_tvl: f64,
    /// Highest locked capital observed
    pub peak_tvl: Sats,
    /// Configured ceiling on locked capital
    pub tvl_ceiling: Sats,
    /// Integral of locked capital in BTC times days
    pub btc_days: f64,
    /// Volume over average locked capital, 0 without locked capital
    pub capital_velocity: f64,
    /// Mean settlement latency of successful payments
    pub mean_latency_secs: f64,
    /// Completed channel rebalances
    pub rebalance_count: u64,
    /// Completed settlement rounds
    pub round_count: u64,
    /// Sats spent on rebalances or rounds
    pub fees_paid: Sats,
    /// Whether the failure rate stayed within target
    pub meets_target: bool,
    /// Events dispatched by the scheduler
    pub events_processed: u64,
}

impl RunResult {
    /// Topology of the run.
    pub fn topology(&self) -> TopologyKind {
        self.parameters.topology
    }

    /// Seed of the run.
    pub fn seed(&self) -> u64 {
        self.parameters.seed
    }
}

/// Collects outcomes and capital snapshots over one run.
#[derive(Debug, Clone)]
pub struct MetricsAccumulator {
    bounds: CapitalBounds,
    last_snapshot: Option<(SimTime, Sats)>,
    // sat-milliseconds
    capital_integral: u128,
    peak_locked: Sats,
    payments: u64,
    successes: u64,
    failures: u64,
    volume: u128,
    failed_volume: u128,
    latency_millis: u128,
    outcomes: Option<Vec<OutcomeRecord>>,
}

impl MetricsAccumulator {
    /// Creates an accumulator enforcing `bounds`.
    pub fn new(bounds: CapitalBounds) -> Self {
        Self {
            bounds,
            last_snapshot: None,
            capital_integral: 0,
            peak_locked: 0,
            payments: 0,
            successes: 0,
            failures: 0,
            volume: 0,
            failed_volume: 0,
            latency_millis: 0,
            outcomes: None,
        }
    }

    /// Keeps every outcome record for later inspection.
    pub fn retain_outcomes(mut self) -> Self {
        self.outcomes = Some(Vec::new());
        self
    }

    /// Retained outcome records, empty unless retention was enabled.
    pub fn outcomes(&self) -> &[OutcomeRecord] {
        self.outcomes.as_deref().unwrap_or(&[])
    }

    /// Takes the retained outcome records.
    pub fn take_outcomes(&mut self) -> Vec<OutcomeRecord> {
        self.outcomes.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Tallies one outcome.
    pub fn record_outcome(&mut self, record: OutcomeRecord) {
        self.payments += 1;
        if record.is_success() {
            self.successes += 1;
            self.volume += u128::from(record.amount);
            self.latency_millis += record.latency.as_millis();
        } else {
            self.failures += 1;
            self.failed_volume += u128::from(record.amount);
        }
        if let Some(outcomes) = &mut self.outcomes {
            outcomes.push(record);
        }
    }

    /// Records locked capital from `time` onwards.
    ///
    /// The integral is left-Riemann: the previous level holds until this
    /// snapshot.
    ///
    /// # Errors
    ///
    /// - `ConsistencyError::LockedCapitalExceedsCeiling` - If `locked` is above the ceiling
    /// - `ConsistencyError::ClockRewind` - If `time` precedes the previous snapshot
    pub fn record_snapshot(&mut self, time: SimTime, locked: Sats) -> Result<(), ConsistencyError> {
        self.bounds.check(time, locked)?;
        self.integrate_to(time)?;
        self.last_snapshot = Some((time, locked));
        self.peak_locked = self.peak_locked.max(locked);
        Ok(())
    }

    fn integrate_to(&mut self, time: SimTime) -> Result<(), ConsistencyError> {
        if let Some((last_time, last_locked)) = self.last_snapshot {
            if time < last_time {
                return Err(ConsistencyError::ClockRewind {
                    now: last_time,
                    requested: time,
                });
            }
            let span = time.saturating_since(last_time).as_millis();
            self.capital_integral += u128::from(last_locked) * span;
        }
        Ok(())
    }

    /// Payments recorded so far.
    pub fn payments(&self) -> u64 {
        self.payments
    }

    /// Failures recorded so far.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Closes the integral at the horizon and builds the run record.
    ///
    /// # Errors
    ///
    /// - `ConsistencyError::ClockRewind` - If a snapshot lies past the horizon
    pub fn finalize(mut self, context: RunContext<'_>) -> Result<RunResult, ConsistencyError> {
        let params = context.params;
        let horizon = params.horizon();
        self.integrate_to(horizon)?;

        let horizon_millis = horizon.as_millis();
        let avg_tvl = if horizon_millis == 0 {
            0.0
        } else {
            self.capital_integral as f64 / horizon_millis as f64
        };
        let total_volume = saturate(self.volume);
        let capital_velocity = if avg_tvl > 0.0 {
            total_volume as f64 / avg_tvl
        } else {
            0.0
        };
        let failure_rate = if self.payments == 0 {
            0.0
        } else {
            self.failures as f64 / self.payments as f64
        };
        let mean_latency_secs = if self.successes == 0 {
            0.0
        } else {
            self.latency_millis as f64 / self.successes as f64 / 1_000.0
        };
        let btc_days =
            self.capital_integral as f64 / SATS_PER_BTC as f64 / MILLIS_PER_DAY as f64;

        Ok(RunResult {
            parameters: params.clone(),
            duration_secs: horizon.as_secs_f64(),
            total_payments: self.payments,
            total_successes: self.successes,
            total_failures: self.failures,
            total_volume,
            failed_volume: saturate(self.failed_volume),
            failure_rate,
            avg_tvl,
            peak_tvl: self.peak_locked,
            tvl_ceiling: self.bounds.ceiling(),
            btc_days,
            capital_velocity,
            mean_latency_secs,
            rebalance_count: context.operations.rebalance_count,
            round_count: context.operations.round_count,
            fees_paid: context.operations.fees_paid,
            meets_target: failure_rate <= params.target_failure_rate,
            events_processed: context.events_processed,
        })
    }
}

fn saturate(value: u128) -> Sats {
    Sats::try_from(value).unwrap_or(Sats::MAX)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use floodgate_core::{EndpointId, PaymentId, PaymentIntent};

    use super::*;
    use crate::topology::FailureReason;

    fn intent(id: u64, amount: Sats) -> PaymentIntent {
        PaymentIntent::inbound(PaymentId::new(id), SimTime::ZERO, amount, EndpointId::new(0))
    }

    fn context(params: &RunParameters) -> RunContext<'_> {
        RunContext {
            params,
            operations: OperationalStats::default(),
            events_processed: 0,
        }
    }

    #[test]
    fn test_time_weighted_average() {
        let params = RunParameters::default().with_duration_days(1.0);
        let mut metrics = MetricsAccumulator::new(CapitalBounds::new(1_000));
        let half_day = SimTime::from_millis(MILLIS_PER_DAY / 2);

        metrics.record_snapshot(SimTime::ZERO, 1_000).unwrap();
        metrics.record_snapshot(half_day, 0).unwrap();
        metrics.record_outcome(OutcomeRecord::success(&intent(0, 500), Duration::ZERO, 0));

        let result = metrics.finalize(context(&params)).unwrap();
        assert_eq!(result.avg_tvl, 500.0);
        assert_eq!(result.peak_tvl, 1_000);
        assert_eq!(result.total_volume, 500);
        assert_eq!(result.capital_velocity, 1.0);
        assert_eq!(result.tvl_ceiling, 1_000);
    }

    #[test]
    fn test_level_holds_until_horizon() {
        let params = RunParameters::default().with_duration_days(2.0);
        let mut metrics = MetricsAccumulator::new(CapitalBounds::new(SATS_PER_BTC));
        metrics.record_snapshot(SimTime::ZERO, SATS_PER_BTC).unwrap();

        let result = metrics.finalize(context(&params)).unwrap();
        assert_eq!(result.avg_tvl, SATS_PER_BTC as f64);
        assert_eq!(result.btc_days, 2.0);
        assert_eq!(result.capital_velocity, 0.0);
    }

    #[test]
    fn test_failure_rate_and_latency() {
        let params = RunParameters::default();
        let mut metrics = MetricsAccumulator::new(CapitalBounds::new(10));
        metrics.record_snapshot(SimTime::ZERO, 0).unwrap();
        metrics.record_outcome(OutcomeRecord::success(
            &intent(0, 7),
            Duration::from_secs(4),
            0,
        ));
        metrics.record_outcome(OutcomeRecord::success(
            &intent(1, 3),
            Duration::from_secs(2),
            0,
        ));
        metrics.record_outcome(OutcomeRecord::failure(
            &intent(2, 11),
            FailureReason::LspSideShortfall,
            0,
        ));
        metrics.record_outcome(OutcomeRecord::failure(
            &intent(3, 1),
            FailureReason::LspSideShortfall,
            0,
        ));

        let result = metrics.finalize(context(&params)).unwrap();
        assert_eq!(result.total_payments, 4);
        assert_eq!(result.total_failures, 2);
        assert_eq!(result.failure_rate, 0.5);
        assert_eq!(result.failed_volume, 12);
        assert_eq!(result.mean_latency_secs, 3.0);
        assert!(!result.meets_target);
    }

    #[test]
    fn test_zero_horizon_yields_empty_result() {
        let params = RunParameters::default().with_duration_days(0.0);
        let mut metrics = MetricsAccumulator::new(CapitalBounds::new(100));
        metrics.record_snapshot(SimTime::ZERO, 100).unwrap();

        let result = metrics.finalize(context(&params)).unwrap();
        assert_eq!(result.total_volume, 0);
        assert_eq!(result.avg_tvl, 0.0);
        assert_eq!(result.capital_velocity, 0.0);
        assert_eq!(result.failure_rate, 0.0);
        assert!(result.meets_target);
    }

    #[test]
    fn test_snapshot_above_ceiling_fails() {
        let mut metrics = MetricsAccumulator::new(CapitalBounds::new(100));
        assert!(matches!(
            metrics.record_snapshot(SimTime::ZERO, 101),
            Err(ConsistencyError::LockedCapitalExceedsCeiling { .. })
        ));
    }

    #[test]
    fn test_snapshot_rewind_fails() {
        let mut metrics = MetricsAccumulator::new(CapitalBounds::new(100));
        metrics.record_snapshot(SimTime::from_millis(10), 1).unwrap();
        assert!(matches!(
            metrics.record_snapshot(SimTime::from_millis(9), 1),
            Err(ConsistencyError::ClockRewind { .. })
        ));
    }

    #[test]
    fn test_outcome_retention() {
        let mut metrics = MetricsAccumulator::new(CapitalBounds::new(0));
        metrics.record_outcome(OutcomeRecord::success(&intent(0, 1), Duration::ZERO, 0));
        assert!(metrics.outcomes().is_empty());

        let mut metrics = MetricsAccumulator::new(CapitalBounds::new(0)).retain_outcomes();
        metrics.record_outcome(OutcomeRecord::success(&intent(0, 1), Duration::ZERO, 0));
        assert_eq!(metrics.outcomes().len(), 1);
        assert_eq!(metrics.take_outcomes().len(), 1);
        assert!(metrics.outcomes().is_empty());
    }

    #[test]
    fn test_result_serializes_flat() {
        let params = RunParameters::default();
        let metrics = MetricsAccumulator::new(CapitalBounds::new(0));
        let result = metrics.finalize(context(&params)).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["topology"], "Static");
        assert_eq!(value["seed"], 42);
        assert_eq!(value["total_volume"], 0);
        assert_eq!(result.topology(), TopologyKind::Static);
        assert_eq!(result.seed(), 42);
    }
}
