//! Wires one parameter set and one seed into a finished run.

use floodgate_core::{PaymentIntent, RunParameters, SimTime, SimulationError};
use tracing::{info, warn};

use crate::deterministic::{AbortSignal, CapitalBounds, EventScheduler};
use crate::metrics::{MetricsAccumulator, RunContext, RunResult};
use crate::topology::{OutcomeRecord, build_topology};
use crate::traffic::TrafficGenerator;

/// Executes single runs. Cheap to clone, stateless between runs.
#[derive(Debug, Clone)]
pub struct RunOrchestrator {
    params: RunParameters,
    abort: AbortSignal,
}

impl RunOrchestrator {
    /// Creates an orchestrator for `params`.
    pub fn new(params: RunParameters) -> Self {
        Self {
            params,
            abort: AbortSignal::new(),
        }
    }

    /// Observes `abort` instead of a private signal.
    pub fn with_abort_signal(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    /// Parameters of the run.
    pub fn params(&self) -> &RunParameters {
        &self.params
    }

    /// Signal that cancels the run when raised.
    pub fn abort_signal(&self) -> &AbortSignal {
        &self.abort
    }

    /// Runs to completion and returns the result record.
    ///
    /// # Errors
    ///
    /// - `SimulationError::Configuration` - Invalid parameters, nothing was simulated
    /// - `SimulationError::Consistency` - Broken bookkeeping during the run
    /// - `SimulationError::Aborted` - The abort signal was raised
    pub fn execute(&self) -> Result<RunResult, SimulationError> {
        self.run(MetricsAccumulator::new).map(|(result, _)| result)
    }

    /// Runs to completion and also returns every outcome record in order.
    ///
    /// # Errors
    ///
    /// Same as [`RunOrchestrator::execute`].
    pub fn execute_with_outcomes(
        &self,
    ) -> Result<(RunResult, Vec<OutcomeRecord>), SimulationError> {
        self.run(|bounds| MetricsAccumulator::new(bounds).retain_outcomes())
    }

    fn run(
        &self,
        metrics_for: impl FnOnce(CapitalBounds) -> MetricsAccumulator,
    ) -> Result<(RunResult, Vec<OutcomeRecord>), SimulationError> {
        let params = &self.params;
        let mut topology = build_topology(params)?;
        let horizon = params.horizon();
        info!(
            topology = %params.topology,
            seed = params.seed,
            days = params.duration_days,
            "Starting run"
        );

        let mut metrics = metrics_for(CapitalBounds::new(topology.capital_ceiling()));
        metrics.record_snapshot(SimTime::ZERO, topology.locked_capital()?)?;

        let mut scheduler = EventScheduler::new(horizon);
        topology.start(&mut scheduler)?;

        let summary = if horizon == SimTime::ZERO {
            warn!("Zero-length observation window, no traffic generated");
            scheduler.drive(
                topology.as_mut(),
                &mut metrics,
                &mut std::iter::empty::<PaymentIntent>(),
                &self.abort,
            )?
        } else {
            let mut traffic = TrafficGenerator::new(params)?;
            scheduler.drive(topology.as_mut(), &mut metrics, &mut traffic, &self.abort)?
        };

        let outcomes = metrics.take_outcomes();
        let result = metrics.finalize(RunContext {
            params,
            operations: topology.operations(),
            events_processed: summary.events_processed,
        })?;

        info!(
            topology = %params.topology,
            seed = params.seed,
            payments = result.total_payments,
            failure_rate = result.failure_rate,
            avg_tvl = result.avg_tvl,
            velocity = result.capital_velocity,
            dropped = summary.events_dropped,
            "Run complete"
        );
        Ok((result, outcomes))
    }
}

/// Runs `params` once.
///
/// # Errors
///
/// Same as [`RunOrchestrator::execute`].
pub fn run(params: RunParameters) -> Result<RunResult, SimulationError> {
    RunOrchestrator::new(params).execute()
}
