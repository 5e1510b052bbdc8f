//! Synthetic payment traffic.
//!
//! A [`TrafficGenerator`] is a lazy, finite, restartable iterator of payment
//! intents with strictly increasing timestamps. Per intent, randomness is
//! consumed in a fixed order: gap, thinning (when a daily cycle is set), flow
//! direction, amount, participants.

mod amounts;
mod arrivals;
mod endpoints;

use floodgate_core::{
    ConfigurationError, FlowKind, PaymentId, PaymentIntent, RunParameters, SimTime,
};
use tracing::debug;

pub use amounts::AmountModel;
pub use arrivals::ArrivalProcess;
pub use endpoints::{EndpointPicker, EndpointRole};

use crate::deterministic::SimRng;

/// Traffic-related subset of the run parameters, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficProfile {
    seed: u64,
    horizon: SimTime,
    balance_skew: f64,
    internal_ratio: f64,
    endpoint_count: u32,
}

impl TrafficProfile {
    /// Extracts and checks the traffic parameters.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError::InvalidParameter` - If duration is not positive or any parameter is out of range
    pub fn from_parameters(params: &RunParameters) -> Result<Self, ConfigurationError> {
        params.validate()?;
        if params.duration_days <= 0.0 || params.horizon() == SimTime::ZERO {
            return Err(ConfigurationError::invalid(
                "duration_days",
                "traffic needs a positive duration",
            ));
        }
        Ok(Self {
            seed: params.seed,
            horizon: params.horizon(),
            balance_skew: params.balance_skew,
            internal_ratio: params.internal_ratio,
            endpoint_count: params.endpoint_count,
        })
    }

    /// End of generated traffic, exclusive.
    pub fn horizon(&self) -> SimTime {
        self.horizon
    }
}

/// Deterministic payment intent stream for one run.
#[derive(Debug, Clone)]
pub struct TrafficGenerator {
    profile: TrafficProfile,
    arrivals: ArrivalProcess,
    amounts: AmountModel,
    picker: EndpointPicker,
    start_rng: SimRng,
    rng: SimRng,
    now: SimTime,
    next_id: u64,
    finished: bool,
}

impl TrafficGenerator {
    /// Creates the generator for `params`.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError` - If the parameters cannot produce traffic
    pub fn new(params: &RunParameters) -> Result<Self, ConfigurationError> {
        let profile = TrafficProfile::from_parameters(params)?;
        let arrivals =
            ArrivalProcess::new(params.arrival_rate, params.burstiness, params.diurnal_cycle)?;
        let amounts = AmountModel::new(
            params.amount_pareto_shape,
            params.amount_pareto_scale,
            params.max_amount_sats,
        )?;

        let mut rng = SimRng::from_seed(profile.seed);
        let picker = EndpointPicker::new(&params.endpoint_selection, profile.endpoint_count, &mut rng)?;
        debug!(
            seed = profile.seed,
            horizon = %profile.horizon,
            mean_gap_ms = arrivals.mean_gap_millis(),
            "Traffic generator ready"
        );

        Ok(Self {
            profile,
            arrivals,
            amounts,
            picker,
            start_rng: rng.clone(),
            rng,
            now: SimTime::ZERO,
            next_id: 0,
            finished: false,
        })
    }

    /// Rewinds to the first intent. The replayed sequence is identical.
    pub fn restart(&mut self) {
        self.rng = self.start_rng.clone();
        self.now = SimTime::ZERO;
        self.next_id = 0;
        self.finished = false;
    }

    /// Traffic profile in use.
    pub fn profile(&self) -> &TrafficProfile {
        &self.profile
    }

    /// Participant picker in use.
    pub fn picker(&self) -> &EndpointPicker {
        &self.picker
    }

    fn draw_flow(&mut self) -> FlowKind {
        let internal_possible = self.profile.endpoint_count > 1;
        if internal_possible && self.rng.random_bool(self.profile.internal_ratio) {
            return FlowKind::Internal;
        }
        if self.rng.random_bool(self.profile.balance_skew) {
            FlowKind::Inbound
        } else {
            FlowKind::Outbound
        }
    }

    fn build_intent(&mut self, timestamp: SimTime) -> PaymentIntent {
        let id = PaymentId::new(self.next_id);
        self.next_id += 1;

        let flow = self.draw_flow();
        let amount = self.amounts.sample(&mut self.rng);
        match flow {
            FlowKind::Inbound => {
                let receiver = self.picker.pick_receiver(&mut self.rng);
                PaymentIntent::inbound(id, timestamp, amount, receiver)
            }
            FlowKind::Outbound => {
                let sender = self.picker.pick_sender(&mut self.rng);
                PaymentIntent::outbound(id, timestamp, amount, sender)
            }
            FlowKind::Internal => {
                let sender = self.picker.pick_sender(&mut self.rng);
                let receiver = self.picker.pick_distinct_receiver(sender, &mut self.rng);
                PaymentIntent::internal(id, timestamp, amount, sender, receiver)
                    .unwrap_or_else(|| PaymentIntent::outbound(id, timestamp, amount, sender))
            }
        }
    }
}

impl Iterator for TrafficGenerator {
    type Item = PaymentIntent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let gap = self.arrivals.next_gap_millis(&mut self.rng);
            let candidate = self.now.saturating_add_millis(gap);
            if candidate >= self.profile.horizon {
                self.finished = true;
                return None;
            }
            self.now = candidate;
            if self.arrivals.accepts(candidate, &mut self.rng) {
                return Some(self.build_intent(candidate));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use floodgate_core::{DiurnalCycle, MILLIS_PER_HOUR};

    use super::*;

    fn params() -> RunParameters {
        RunParameters::default()
            .with_duration_days(2.0)
            .with_arrival_rate(500.0)
            .with_seed(77)
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a: Vec<PaymentIntent> = TrafficGenerator::new(&params()).unwrap().collect();
        let b: Vec<PaymentIntent> = TrafficGenerator::new(&params()).unwrap().collect();
        assert!(!a.is_empty());
        assert_eq!(a, b);

        let c: Vec<PaymentIntent> = TrafficGenerator::new(&params().with_seed(78))
            .unwrap()
            .collect();
        assert_ne!(a, c);
    }

    #[test]
    fn test_restart_replays_sequence() {
        let mut generator = TrafficGenerator::new(&params()).unwrap();
        let first: Vec<PaymentIntent> = generator.by_ref().collect();
        assert!(generator.next().is_none());
        generator.restart();
        let second: Vec<PaymentIntent> = generator.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_timestamps_strictly_increase_within_window() {
        let intents: Vec<PaymentIntent> = TrafficGenerator::new(&params()).unwrap().collect();
        let horizon = params().horizon();
        assert!(intents.windows(2).all(|w| w[0].timestamp() < w[1].timestamp()));
        assert!(intents.iter().all(|i| i.timestamp() < horizon));
        assert!(intents.iter().enumerate().all(|(n, i)| i.id().as_u64() == n as u64));
    }

    #[test]
    fn test_arrival_count_matches_rate() {
        let intents = TrafficGenerator::new(&params().with_duration_days(20.0))
            .unwrap()
            .count();
        // 10_000 expected, bursty arrivals widen the spread
        assert!((8_500..11_500).contains(&intents), "intents {intents}");
    }

    #[test]
    fn test_flow_mix_follows_skew_and_internal_ratio() {
        let p = RunParameters {
            internal_ratio: 0.2,
            balance_skew: 0.75,
            ..params().with_duration_days(20.0)
        };
        let intents: Vec<PaymentIntent> = TrafficGenerator::new(&p).unwrap().collect();
        let total = intents.len() as f64;
        let internal = intents.iter().filter(|i| i.flow() == FlowKind::Internal).count() as f64;
        let inbound = intents.iter().filter(|i| i.flow() == FlowKind::Inbound).count() as f64;
        assert!((internal / total - 0.2).abs() < 0.02);
        assert!((inbound / (total - internal) - 0.75).abs() < 0.03);
        assert!(
            intents
                .iter()
                .filter(|i| i.flow() == FlowKind::Internal)
                .all(|i| i.source() != i.destination())
        );
    }

    #[test]
    fn test_single_endpoint_has_no_internal_flow() {
        let p = params().with_endpoint_count(1);
        let intents: Vec<PaymentIntent> = TrafficGenerator::new(&p).unwrap().collect();
        assert!(!intents.is_empty());
        assert!(intents.iter().all(|i| i.flow() != FlowKind::Internal));
    }

    #[test]
    fn test_non_positive_duration_rejected() {
        assert!(TrafficGenerator::new(&params().with_duration_days(0.0)).is_err());
        assert!(TrafficGenerator::new(&params().with_duration_days(-1.0)).is_err());
        assert!(TrafficGenerator::new(&params().with_arrival_rate(0.0)).is_err());
    }

    #[test]
    fn test_diurnal_cycle_concentrates_traffic() {
        let mut p = params().with_duration_days(10.0);
        p.diurnal_cycle = Some(DiurnalCycle {
            peak_start_hour: 8.0,
            peak_end_hour: 20.0,
            peak_multiplier: 4.0,
        });
        let intents: Vec<PaymentIntent> = TrafficGenerator::new(&p).unwrap().collect();
        let in_peak = intents
            .iter()
            .filter(|i| {
                let hour = i.timestamp().as_millis() % (24 * MILLIS_PER_HOUR) / MILLIS_PER_HOUR;
                (8..20).contains(&hour)
            })
            .count();
        // Peak hours carry 4 / 5 of the traffic
        let share = in_peak as f64 / intents.len() as f64;
        assert!((share - 0.8).abs() < 0.05, "peak share {share}");
        // Mean rate preserved
        assert!((4_000..6_000).contains(&intents.len()), "{}", intents.len());
    }
}
