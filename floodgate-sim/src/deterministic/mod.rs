//! Deterministic discrete-event machinery.
//!
//! One logical clock, one seeded random stream and one event queue per run.
//! Nothing here knows about channels or pools.

mod clock;
mod events;
pub(crate) mod invariants;
mod scheduler;

// Re-export core types for public API
pub use clock::{SimClock, SimRng};
pub use events::{EventKind, EventPriority, ScheduledEvent};
pub use invariants::CapitalBounds;
pub use scheduler::{AbortSignal, DriveSummary, EventScheduler, EventSink};
