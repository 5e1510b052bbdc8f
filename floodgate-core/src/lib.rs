//! Floodgate Core - Domain model for liquidity topology simulations
//!
//! This crate provides the types every part of the simulator agrees on:
//! simulated time and amounts, payment intents, run parameters and the
//! error taxonomy, plus tracing setup for binaries and tests.

pub mod config;
pub mod error;
pub mod tracing_setup;
pub mod types;

// Re-export main types for convenient access
pub use config::{
    ArchetypeMix, DiurnalCycle, EndpointSelection, RebalancePolicy, RoleWeights, RunParameters,
    SettlementAllocation,
};
pub use error::{ConfigurationError, ConsistencyError, SimulationError};
pub use types::{
    EndpointId, FlowKind, MILLIS_PER_DAY, MILLIS_PER_HOUR, Party, PaymentId, PaymentIntent,
    SATS_PER_BTC, Sats, SimTime, TopologyKind,
};
