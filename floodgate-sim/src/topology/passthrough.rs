//! Baseline topology that routes every payment without locking capital.

use std::time::Duration;

use floodgate_core::{ConsistencyError, PaymentIntent, Sats, TopologyKind};

use super::{OperationalStats, OutcomeRecord, Topology};
use crate::deterministic::{EventSink, ScheduledEvent};

/// Every payment succeeds instantly. Used to check the harness itself.
#[derive(Debug, Clone, Default)]
pub struct Passthrough;

impl Passthrough {
    /// Creates the baseline topology.
    pub fn new() -> Self {
        Self
    }
}

impl Topology for Passthrough {
    fn kind(&self) -> TopologyKind {
        TopologyKind::Passthrough
    }

    fn start(&mut self, _sink: &mut dyn EventSink) -> Result<(), ConsistencyError> {
        Ok(())
    }

    fn process_payment(
        &mut self,
        intent: &PaymentIntent,
        _sink: &mut dyn EventSink,
    ) -> Result<OutcomeRecord, ConsistencyError> {
        Ok(OutcomeRecord::success(intent, Duration::ZERO, 0))
    }

    fn handle_scheduled_event(
        &mut self,
        event: &ScheduledEvent,
        _sink: &mut dyn EventSink,
    ) -> Result<(), ConsistencyError> {
        Err(ConsistencyError::UnexpectedEvent {
            kind: event.kind.as_str(),
            topology: TopologyKind::Passthrough.as_str(),
        })
    }

    fn locked_capital(&self) -> Result<Sats, ConsistencyError> {
        Ok(0)
    }

    fn capital_ceiling(&self) -> Sats {
        0
    }

    fn check_invariants(&self) -> Result<(), ConsistencyError> {
        Ok(())
    }

    fn operations(&self) -> OperationalStats {
        OperationalStats::default()
    }
}
