//! Floodgate Simulation - Deterministic comparison of L2 liquidity topologies.

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! This crate drives synthetic payment traffic through a liquidity topology
//! and measures how much capital the LSP has to lock to serve it.
//!
//! # Features
//!
//! - **Deterministic Execution**: Same parameters and seed give identical results
//! - **Event-Based Simulation**: Integer-millisecond clock with priority tie-breaks
//! - **Static Channels**: One LSP channel per endpoint with delayed rebalancing
//! - **Dynamic Pools**: Shared pools reallocated at fixed round boundaries
//! - **Capital Accounting**: Time-weighted TVL, BTC-days and capital velocity
//!
//! # Example
//!
//! ```rust,no_run
//! use floodgate_core::{RunParameters, TopologyKind};
//! use floodgate_sim::run;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let params = RunParameters::default()
//!     .with_topology(TopologyKind::Dynamic)
//!     .with_seed(7);
//! let result = run(params)?;
//! println!(
//!     "failure rate {:.4}, avg TVL {:.0} sats, velocity {:.2}",
//!     result.failure_rate, result.avg_tvl, result.capital_velocity
//! );
//! # Ok(())
//! # }
//! ```

pub mod deterministic;
pub mod metrics;
pub mod orchestrator;
pub mod topology;
pub mod traffic;

// Re-export main types for convenience
pub use deterministic::{AbortSignal, EventScheduler};
pub use metrics::{MetricsAccumulator, RunResult};
pub use orchestrator::{RunOrchestrator, run};
pub use topology::{OutcomeRecord, Topology, build_topology};
pub use traffic::TrafficGenerator;
