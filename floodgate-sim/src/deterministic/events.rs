//! Event types and queue ordering for the simulation loop.

use std::cmp::Ordering;

use floodgate_core::{EndpointId, PaymentIntent, SimTime};

/// Priority levels for simulation events.
///
/// Lower numeric values fire first when events share a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventPriority {
    /// Round boundaries
    Settlement = 0,
    /// Channel resets
    Rebalance = 1,
    /// Traffic
    Payment = 2,
}

/// Types of events that can occur in the simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A payment intent reaches the topology
    PaymentArrival(PaymentIntent),
    /// A channel rebalance requested earlier completes
    RebalanceComplete {
        /// Endpoint whose channel is reset
        endpoint: EndpointId,
    },
    /// A dynamic round closes and pools are reallocated
    RoundSettlement {
        /// Sequence number of the closing round, from 0
        round: u64,
    },
}

impl EventKind {
    /// Returns the tie-break priority of this kind.
    pub fn priority(&self) -> EventPriority {
        match self {
            EventKind::RoundSettlement { .. } => EventPriority::Settlement,
            EventKind::RebalanceComplete { .. } => EventPriority::Rebalance,
            EventKind::PaymentArrival(_) => EventPriority::Payment,
        }
    }

    /// Returns string representation of event type for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PaymentArrival(_) => "PaymentArrival",
            EventKind::RebalanceComplete { .. } => "RebalanceComplete",
            EventKind::RoundSettlement { .. } => "RoundSettlement",
        }
    }
}

/// Event waiting in the scheduler until its fire time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent {
    /// Simulation time at which the event fires
    pub fire_time: SimTime,
    /// What happens
    pub kind: EventKind,
}

impl ScheduledEvent {
    /// Creates new scheduled event.
    pub fn new(fire_time: SimTime, kind: EventKind) -> Self {
        Self { fire_time, kind }
    }

    /// Arrival of `intent` at its own timestamp.
    pub fn payment(intent: PaymentIntent) -> Self {
        Self::new(intent.timestamp(), EventKind::PaymentArrival(intent))
    }
}

/// Queue entry pointing at an arena slot.
///
/// Ordered so that a max-heap pops the earliest event first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueKey {
    pub(crate) fire_time: SimTime,
    pub(crate) priority: EventPriority,
    pub(crate) sequence: u64,
    pub(crate) slot: usize,
}

impl Ord for QueueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap behavior
        other
            .fire_time
            .cmp(&self.fire_time)
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
