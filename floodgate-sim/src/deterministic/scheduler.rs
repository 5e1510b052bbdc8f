//! Time-ordered event queue and the drive loop of a run.

use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use floodgate_core::{ConsistencyError, PaymentIntent, SimTime, SimulationError};
use tracing::{debug, trace};

use super::clock::SimClock;
use super::events::{EventKind, QueueKey, ScheduledEvent};
use crate::metrics::MetricsAccumulator;
use crate::topology::Topology;

/// Where topology models put their follow-up events.
///
/// Implemented by [`EventScheduler`]. Models never see the queue itself.
pub trait EventSink {
    /// Current simulation time.
    fn now(&self) -> SimTime;

    /// Schedules an event at or after the current time.
    ///
    /// # Errors
    ///
    /// - `ConsistencyError::ClockRewind` - If the fire time is in the past
    fn schedule(&mut self, event: ScheduledEvent) -> Result<(), ConsistencyError>;
}

/// Run-level cancellation flag, shareable across threads.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    raised: Arc<AtomicBool>,
}

impl AbortSignal {
    /// Creates a lowered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks every run observing this signal to stop.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Relaxed);
    }

    /// Whether the signal has been raised.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Relaxed)
    }
}

/// What a drive loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveSummary {
    /// Events dispatched to the topology
    pub events_processed: u64,
    /// Events left pending at or past the horizon
    pub events_dropped: u64,
    /// Clock value when the loop stopped
    pub final_time: SimTime,
}

/// Min-priority event queue over an arena of scheduled events.
///
/// Ordered by fire time, then kind priority, then insertion sequence. Fired
/// events are removed from the arena and their slot is reused.
#[derive(Debug, Clone)]
pub struct EventScheduler {
    clock: SimClock,
    horizon: SimTime,
    arena: Vec<Option<ScheduledEvent>>,
    free_slots: Vec<usize>,
    queue: BinaryHeap<QueueKey>,
    next_sequence: u64,
}

impl EventScheduler {
    /// Creates an empty scheduler observing `[0, horizon)`.
    pub fn new(horizon: SimTime) -> Self {
        Self {
            clock: SimClock::new(),
            horizon,
            arena: Vec::new(),
            free_slots: Vec::new(),
            queue: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    /// End of the observation window.
    pub fn horizon(&self) -> SimTime {
        self.horizon
    }

    /// Number of events waiting.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Schedules every intent as a payment arrival.
    ///
    /// # Errors
    ///
    /// - `ConsistencyError::ClockRewind` - If an intent lies before the current time
    pub fn preload<I>(&mut self, intents: I) -> Result<(), ConsistencyError>
    where
        I: IntoIterator<Item = PaymentIntent>,
    {
        for intent in intents {
            self.schedule(ScheduledEvent::payment(intent))?;
        }
        Ok(())
    }

    /// Runs the loop until the queue drains or the horizon is reached.
    ///
    /// `arrivals` is pulled lazily. One arrival is kept in the queue at a time
    /// and the next is pulled when it fires. A snapshot of locked capital is
    /// recorded after every dispatched event.
    ///
    /// # Errors
    ///
    /// - `SimulationError::Consistency` - If the topology or the metrics detect broken bookkeeping
    /// - `SimulationError::Aborted` - If `abort` is raised between events
    pub fn drive<I>(
        &mut self,
        topology: &mut dyn Topology,
        metrics: &mut MetricsAccumulator,
        arrivals: &mut I,
        abort: &AbortSignal,
    ) -> Result<DriveSummary, SimulationError>
    where
        I: Iterator<Item = PaymentIntent>,
    {
        let mut events_processed = 0u64;
        let mut events_dropped = 0u64;
        self.feed_next(arrivals)?;

        loop {
            if abort.is_raised() {
                return Err(SimulationError::Aborted {
                    at: self.clock.now(),
                    events_processed,
                });
            }

            let Some(event) = self.pop_next()? else {
                break;
            };

            if event.fire_time >= self.horizon {
                events_dropped = 1 + self.queue.len() as u64;
                debug!(
                    sim_time = %self.clock.now(),
                    dropped = events_dropped,
                    "Horizon reached, dropping pending events"
                );
                self.clear();
                break;
            }

            self.clock.advance_to(event.fire_time)?;
            trace!(sim_time = %event.fire_time, kind = event.kind.as_str(), "Dispatching event");

            if let EventKind::PaymentArrival(intent) = &event.kind {
                let record = topology.process_payment(intent, self)?;
                metrics.record_outcome(record);
                self.feed_next(arrivals)?;
            } else {
                topology.handle_scheduled_event(&event, self)?;
            }
            events_processed += 1;

            topology.check_invariants()?;
            metrics.record_snapshot(self.clock.now(), topology.locked_capital()?)?;
        }

        Ok(DriveSummary {
            events_processed,
            events_dropped,
            final_time: self.clock.now(),
        })
    }

    fn feed_next<I>(&mut self, arrivals: &mut I) -> Result<(), ConsistencyError>
    where
        I: Iterator<Item = PaymentIntent>,
    {
        if let Some(intent) = arrivals.next() {
            self.schedule(ScheduledEvent::payment(intent))?;
        }
        Ok(())
    }

    fn pop_next(&mut self) -> Result<Option<ScheduledEvent>, ConsistencyError> {
        let Some(key) = self.queue.pop() else {
            return Ok(None);
        };
        let event = self
            .arena
            .get_mut(key.slot)
            .and_then(Option::take)
            .ok_or(ConsistencyError::MissingEvent { slot: key.slot })?;
        self.free_slots.push(key.slot);
        Ok(Some(event))
    }

    fn clear(&mut self) {
        self.queue.clear();
        self.arena.clear();
        self.free_slots.clear();
    }
}

impl EventSink for EventScheduler {
    fn now(&self) -> SimTime {
        self.clock.now()
    }

    fn schedule(&mut self, event: ScheduledEvent) -> Result<(), ConsistencyError> {
        if event.fire_time < self.clock.now() {
            return Err(ConsistencyError::ClockRewind {
                now: self.clock.now(),
                requested: event.fire_time,
            });
        }

        let key = QueueKey {
            fire_time: event.fire_time,
            priority: event.kind.priority(),
            sequence: self.next_sequence,
            slot: 0,
        };
        self.next_sequence += 1;

        let slot = match self.free_slots.pop() {
            Some(slot) => {
                self.arena[slot] = Some(event);
                slot
            }
            None => {
                self.arena.push(Some(event));
                self.arena.len() - 1
            }
        };
        self.queue.push(QueueKey { slot, ..key });
        Ok(())
    }
}
