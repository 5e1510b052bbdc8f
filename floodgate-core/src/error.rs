//! Error taxonomy for simulation runs.
//!
//! A payment that cannot be routed is an outcome, not an error. The types here
//! cover invalid input detected before a run starts and broken internal
//! bookkeeping detected while it runs. Both are fatal for the run.

use crate::types::{EndpointId, Sats, SimTime};

/// Invalid run input, detected before any event is processed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    /// A parameter is outside its valid range
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter
        name: &'static str,
        /// What the valid range is
        reason: String,
    },

    /// An environment override could not be parsed
    #[error("Invalid environment override {variable}={value:?}")]
    InvalidEnvironmentOverride {
        /// Variable name
        variable: &'static str,
        /// Raw value that failed to parse
        value: String,
    },
}

impl ConfigurationError {
    /// Shorthand for [`ConfigurationError::InvalidParameter`].
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Internal invariant violation. Never silently corrected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConsistencyError {
    /// A balance would have gone below zero
    #[error("Balance underflow at {time}: {context} needs {amount} sats, holds {balance}")]
    BalanceUnderflow {
        /// Simulation time of the violation
        time: SimTime,
        /// Which balance underflowed
        context: String,
        /// Amount that was debited
        amount: Sats,
        /// Balance before the debit
        balance: Sats,
    },

    /// Locked capital above the configured ceiling
    #[error("Locked capital {locked} exceeds ceiling {ceiling} at {time}")]
    LockedCapitalExceedsCeiling {
        /// Simulation time of the snapshot
        time: SimTime,
        /// Observed locked capital
        locked: Sats,
        /// Configured ceiling
        ceiling: Sats,
    },

    /// Channel sides do not add up to capacity
    #[error(
        "Channel {endpoint} imbalance: local {local} + remote {remote} != capacity {capacity}"
    )]
    ChannelImbalance {
        /// Endpoint owning the channel
        endpoint: EndpointId,
        /// LSP-side balance
        local: Sats,
        /// Endpoint-side balance
        remote: Sats,
        /// Channel capacity
        capacity: Sats,
    },

    /// Pool shares do not add up to the pool's liquidity
    #[error("Pool {pool} shares sum to {sum}, expected {expected}")]
    PoolConservation {
        /// Pool index
        pool: usize,
        /// Observed sum of shares
        sum: u128,
        /// Liquidity the pool was funded with
        expected: u128,
    },

    /// Attempt to move the clock backwards
    #[error("Clock rewind: now {now}, requested {requested}")]
    ClockRewind {
        /// Current simulation time
        now: SimTime,
        /// Requested earlier time
        requested: SimTime,
    },

    /// Payment references an endpoint outside the population
    #[error("Unknown endpoint {endpoint}")]
    UnknownEndpoint {
        /// Offending endpoint
        endpoint: EndpointId,
    },

    /// A topology received an event kind it never schedules
    #[error("Unexpected {kind} event for {topology} topology")]
    UnexpectedEvent {
        /// Event kind name
        kind: &'static str,
        /// Topology name
        topology: &'static str,
    },

    /// Scheduler queue refers to an event that is no longer stored
    #[error("Scheduled event {slot} missing from arena")]
    MissingEvent {
        /// Arena slot
        slot: usize,
    },
}

/// Any reason a run ends without a result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// Invalid input
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Broken internal bookkeeping
    #[error("Consistency error: {0}")]
    Consistency(#[from] ConsistencyError),

    /// Abort signal raised while the run was in progress
    #[error("Run aborted at {at} after {events_processed} events")]
    Aborted {
        /// Simulation time when the abort was observed
        at: SimTime,
        /// Events processed before the abort
        events_processed: u64,
    },
}
