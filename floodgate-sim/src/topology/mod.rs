//! Liquidity topology models.
//!
//! Each model owns its liquidity state outright and talks to the rest of the
//! engine through the [`Topology`] capability trait: it decides the outcome of
//! a payment, reacts to the events it scheduled earlier and reports how much
//! capital it keeps locked.

mod dynamic_pool;
mod passthrough;
mod static_channels;

use std::time::Duration;

use floodgate_core::{
    ConfigurationError, ConsistencyError, FlowKind, PaymentId, PaymentIntent, RunParameters, Sats,
    SimTime, TopologyKind,
};
use serde::Serialize;

pub use dynamic_pool::{DynamicPools, Pool, PoolShare, RoundPhase};
pub use passthrough::Passthrough;
pub use static_channels::{Channel, ChannelState, StaticChannels};

use crate::deterministic::{EventSink, ScheduledEvent};

/// Which side of the hub lacked liquidity for a failed payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureReason {
    /// LSP-side balance too low
    LspSideShortfall,
    /// Endpoint-side balance too low
    EndpointSideShortfall,
    /// Both sides too low
    BothSides,
}

impl FailureReason {
    /// Combines per-side shortfalls, `None` when neither side is short.
    pub fn from_shortfalls(lsp_short: bool, endpoint_short: bool) -> Option<Self> {
        match (lsp_short, endpoint_short) {
            (false, false) => None,
            (true, false) => Some(Self::LspSideShortfall),
            (false, true) => Some(Self::EndpointSideShortfall),
            (true, true) => Some(Self::BothSides),
        }
    }
}

/// Result of one payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    /// Payment went through
    Success,
    /// Payment was rejected
    Failure {
        /// Side that lacked liquidity
        reason: FailureReason,
    },
}

/// What happened to one payment intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeRecord {
    /// Intent this record belongs to
    pub intent_id: PaymentId,
    /// Simulation time of the attempt
    pub time: SimTime,
    /// Direction of the payment
    pub flow: FlowKind,
    /// Payment amount
    pub amount: Sats,
    /// Success or failure
    pub outcome: Outcome,
    /// Delay until the payment is final
    pub latency: Duration,
    /// Capital locked by the topology right after the attempt
    pub locked_capital: Sats,
}

impl OutcomeRecord {
    /// Record of a successful payment.
    pub fn success(intent: &PaymentIntent, latency: Duration, locked_capital: Sats) -> Self {
        Self {
            intent_id: intent.id(),
            time: intent.timestamp(),
            flow: intent.flow(),
            amount: intent.amount(),
            outcome: Outcome::Success,
            latency,
            locked_capital,
        }
    }

    /// Record of a failed payment.
    pub fn failure(intent: &PaymentIntent, reason: FailureReason, locked_capital: Sats) -> Self {
        Self {
            intent_id: intent.id(),
            time: intent.timestamp(),
            flow: intent.flow(),
            amount: intent.amount(),
            outcome: Outcome::Failure { reason },
            latency: Duration::ZERO,
            locked_capital,
        }
    }

    /// Whether the payment went through.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success)
    }
}

/// Cost side of running a topology.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationalStats {
    /// Completed channel rebalances
    pub rebalance_count: u64,
    /// Completed settlement rounds
    pub round_count: u64,
    /// Sats spent on rebalances or rounds
    pub fees_paid: Sats,
}

/// Capability interface of a liquidity topology.
pub trait Topology: Send {
    /// Which topology this is.
    fn kind(&self) -> TopologyKind;

    /// Schedules the events the model needs from time zero.
    ///
    /// # Errors
    ///
    /// - `ConsistencyError` - If the sink rejects an event
    fn start(&mut self, sink: &mut dyn EventSink) -> Result<(), ConsistencyError>;

    /// Decides the outcome of one payment and applies it.
    ///
    /// # Errors
    ///
    /// - `ConsistencyError` - If the payment references unknown state or bookkeeping breaks
    fn process_payment(
        &mut self,
        intent: &PaymentIntent,
        sink: &mut dyn EventSink,
    ) -> Result<OutcomeRecord, ConsistencyError>;

    /// Handles an event the model scheduled earlier.
    ///
    /// # Errors
    ///
    /// - `ConsistencyError::UnexpectedEvent` - If the model never schedules this kind
    fn handle_scheduled_event(
        &mut self,
        event: &ScheduledEvent,
        sink: &mut dyn EventSink,
    ) -> Result<(), ConsistencyError>;

    /// Capital the LSP currently has committed.
    ///
    /// # Errors
    ///
    /// - `ConsistencyError` - If the total cannot be represented
    fn locked_capital(&self) -> Result<Sats, ConsistencyError>;

    /// Upper bound on locked capital.
    fn capital_ceiling(&self) -> Sats;

    /// Checks the model's conservation invariants.
    ///
    /// # Errors
    ///
    /// - `ConsistencyError` - First violated invariant
    fn check_invariants(&self) -> Result<(), ConsistencyError>;

    /// Rebalance and round counters.
    fn operations(&self) -> OperationalStats;
}

/// Builds the topology selected by `params`.
///
/// # Errors
///
/// - `ConfigurationError` - If the parameters fail validation
pub fn build_topology(params: &RunParameters) -> Result<Box<dyn Topology>, ConfigurationError> {
    params.validate()?;
    Ok(match params.topology {
        TopologyKind::Static => Box::new(StaticChannels::from_parameters(params)),
        TopologyKind::Dynamic => Box::new(DynamicPools::from_parameters(params)),
        TopologyKind::Passthrough => Box::new(Passthrough::new()),
    })
}

/// Splits `total` in proportion to `weights` with the largest remainder method.
///
/// Shares always sum to `total`. Ties on the remainder go to the lower index.
/// All-zero weights split evenly.
pub(crate) fn apportion(total: Sats, weights: &[u128]) -> Vec<Sats> {
    if weights.is_empty() {
        return Vec::new();
    }
    let weight_sum: u128 = weights.iter().sum();
    if weight_sum == 0 {
        return apportion(total, &vec![1; weights.len()]);
    }

    let total_wide = u128::from(total);
    let mut shares = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    let mut assigned: u128 = 0;
    for (index, weight) in weights.iter().enumerate() {
        let product = total_wide * weight;
        let quota = product / weight_sum;
        assigned += quota;
        shares.push(quota);
        remainders.push((product % weight_sum, index));
    }

    // Largest remainder first, lower index on ties
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    let leftover = total_wide - assigned;
    for &(_, index) in remainders.iter().take(leftover as usize) {
        shares[index] += 1;
    }

    // Every share is bounded by `total`
    shares
        .into_iter()
        .map(|share| Sats::try_from(share).unwrap_or(Sats::MAX))
        .collect()
}
