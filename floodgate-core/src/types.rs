//! Domain types shared by the traffic model, the topologies and the metrics.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Amount of bitcoin in satoshis.
pub type Sats = u64;

/// Satoshis per bitcoin.
pub const SATS_PER_BTC: Sats = 100_000_000;

/// Milliseconds in one simulated hour.
pub const MILLIS_PER_HOUR: u64 = 3_600_000;

/// Milliseconds in one simulated day.
pub const MILLIS_PER_DAY: u64 = 24 * MILLIS_PER_HOUR;

/// Point on the simulation clock, in whole milliseconds since run start.
///
/// Simulation time is integral so that equal timestamps compare exactly and
/// event ordering never depends on floating point rounding.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SimTime(u64);

impl SimTime {
    /// Start of every run.
    pub const ZERO: SimTime = SimTime(0);

    /// Creates a timestamp from milliseconds since run start.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Creates a timestamp from seconds, rounding to the nearest millisecond.
    ///
    /// Negative and NaN inputs clamp to zero, huge inputs saturate.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self::from_millis_f64(secs * 1_000.0)
    }

    /// Creates a timestamp from simulated days.
    pub fn from_days(days: f64) -> Self {
        Self::from_millis_f64(days * MILLIS_PER_DAY as f64)
    }

    fn from_millis_f64(millis: f64) -> Self {
        if millis.is_nan() || millis <= 0.0 {
            return Self::ZERO;
        }
        // `as` saturates at u64::MAX for out-of-range floats
        Self(millis.round() as u64)
    }

    /// Milliseconds since run start.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Seconds since run start.
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000.0
    }

    /// Fractional hour of the simulated day in `[0, 24)`.
    pub fn hour_of_day(self) -> f64 {
        (self.0 % MILLIS_PER_DAY) as f64 / MILLIS_PER_HOUR as f64
    }

    /// Adds a span, saturating at the end of representable time.
    pub fn saturating_add(self, span: Duration) -> Self {
        let millis = u64::try_from(span.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// Adds a span in milliseconds, saturating.
    pub fn saturating_add_millis(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Span from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_since(self, earlier: SimTime) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

/// Identifier of a peer endpoint of the LSP.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EndpointId(u32);

impl EndpointId {
    /// Creates an endpoint identifier.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw identifier, usable as a dense index.
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the identifier as a vector index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EP{:04}", self.0)
    }
}

/// Either side of a payment.
///
/// `Lsp` stands for the hub itself and for everything reached through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    /// The liquidity service provider hub
    Lsp,
    /// A peer endpoint of the hub
    Endpoint(EndpointId),
}

impl Party {
    /// Returns the endpoint identifier, if this party is an endpoint.
    pub fn endpoint(self) -> Option<EndpointId> {
        match self {
            Party::Lsp => None,
            Party::Endpoint(id) => Some(id),
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Lsp => write!(f, "LSP"),
            Party::Endpoint(id) => write!(f, "{id}"),
        }
    }
}

/// Direction of a payment relative to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowKind {
    /// LSP pays an endpoint
    Inbound,
    /// An endpoint pays the LSP
    Outbound,
    /// One endpoint pays another through the LSP
    Internal,
}

impl FlowKind {
    /// Returns string representation for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            FlowKind::Inbound => "Inbound",
            FlowKind::Outbound => "Outbound",
            FlowKind::Internal => "Internal",
        }
    }
}

/// Sequential identifier of a payment intent within one run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PaymentId(u64);

impl PaymentId {
    /// Creates a payment identifier.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PAY{:08}", self.0)
    }
}

/// A payment the traffic model wants to make.
///
/// Immutable once generated. The constructors only admit the three flow
/// shapes of [`FlowKind`], so a hub-to-hub or self payment cannot exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    id: PaymentId,
    timestamp: SimTime,
    amount: Sats,
    source: Party,
    destination: Party,
}

impl PaymentIntent {
    /// LSP pays `destination`.
    pub fn inbound(id: PaymentId, timestamp: SimTime, amount: Sats, destination: EndpointId) -> Self {
        Self {
            id,
            timestamp,
            amount,
            source: Party::Lsp,
            destination: Party::Endpoint(destination),
        }
    }

    /// `source` pays the LSP.
    pub fn outbound(id: PaymentId, timestamp: SimTime, amount: Sats, source: EndpointId) -> Self {
        Self {
            id,
            timestamp,
            amount,
            source: Party::Endpoint(source),
            destination: Party::Lsp,
        }
    }

    /// `source` pays `destination` through the LSP.
    ///
    /// Returns `None` when both ends are the same endpoint.
    pub fn internal(
        id: PaymentId,
        timestamp: SimTime,
        amount: Sats,
        source: EndpointId,
        destination: EndpointId,
    ) -> Option<Self> {
        if source == destination {
            return None;
        }
        Some(Self {
            id,
            timestamp,
            amount,
            source: Party::Endpoint(source),
            destination: Party::Endpoint(destination),
        })
    }

    /// Identifier of this intent.
    pub fn id(&self) -> PaymentId {
        self.id
    }

    /// Arrival time.
    pub fn timestamp(&self) -> SimTime {
        self.timestamp
    }

    /// Payment amount.
    pub fn amount(&self) -> Sats {
        self.amount
    }

    /// Paying side.
    pub fn source(&self) -> Party {
        self.source
    }

    /// Receiving side.
    pub fn destination(&self) -> Party {
        self.destination
    }

    /// Direction of this payment relative to the hub.
    pub fn flow(&self) -> FlowKind {
        match (self.source, self.destination) {
            (Party::Lsp, _) => FlowKind::Inbound,
            (_, Party::Lsp) => FlowKind::Outbound,
            (Party::Endpoint(_), Party::Endpoint(_)) => FlowKind::Internal,
        }
    }
}

/// Liquidity topology under study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopologyKind {
    /// One bilateral channel per endpoint
    Static,
    /// Pooled liquidity reallocated in periodic rounds
    Dynamic,
    /// Every payment succeeds without locking capital
    Passthrough,
}

impl TopologyKind {
    /// Returns string representation for logs and result records.
    pub fn as_str(self) -> &'static str {
        match self {
            TopologyKind::Static => "Static",
            TopologyKind::Dynamic => "Dynamic",
            TopologyKind::Passthrough => "Passthrough",
        }
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_time_conversions() {
        assert_eq!(SimTime::from_days(1.0).as_millis(), MILLIS_PER_DAY);
        assert_eq!(SimTime::from_secs_f64(1.2346).as_millis(), 1_235);
        assert_eq!(SimTime::from_secs_f64(-5.0), SimTime::ZERO);
        assert_eq!(SimTime::from_secs_f64(f64::NAN), SimTime::ZERO);
        assert_eq!(SimTime::from_millis(90_000).as_secs_f64(), 90.0);
    }

    #[test]
    fn test_sim_time_arithmetic_saturates() {
        let late = SimTime::from_millis(u64::MAX - 1);
        assert_eq!(
            late.saturating_add(Duration::from_secs(10)),
            SimTime::from_millis(u64::MAX)
        );
        let early = SimTime::from_millis(10);
        assert_eq!(early.saturating_since(late), Duration::ZERO);
        assert_eq!(late.saturating_since(early).as_millis() as u64, u64::MAX - 11);
    }

    #[test]
    fn test_hour_of_day_wraps() {
        let t = SimTime::from_millis(MILLIS_PER_DAY + 13 * MILLIS_PER_HOUR);
        assert_eq!(t.hour_of_day(), 13.0);
    }

    #[test]
    fn test_payment_flow_kinds() {
        let a = EndpointId::new(1);
        let b = EndpointId::new(2);
        let t = SimTime::from_millis(5);

        let inbound = PaymentIntent::inbound(PaymentId::new(0), t, 10, a);
        assert_eq!(inbound.flow(), FlowKind::Inbound);
        assert_eq!(inbound.source(), Party::Lsp);

        let outbound = PaymentIntent::outbound(PaymentId::new(1), t, 10, a);
        assert_eq!(outbound.flow(), FlowKind::Outbound);
        assert_eq!(outbound.destination(), Party::Lsp);

        let internal = PaymentIntent::internal(PaymentId::new(2), t, 10, a, b).unwrap();
        assert_eq!(internal.flow(), FlowKind::Internal);
        assert_eq!(internal.destination().endpoint(), Some(b));
    }

    #[test]
    fn test_internal_payment_rejects_self_transfer() {
        let a = EndpointId::new(3);
        assert!(PaymentIntent::internal(PaymentId::new(0), SimTime::ZERO, 1, a, a).is_none());
    }

    #[test]
    fn test_identifier_display() {
        assert_eq!(EndpointId::new(7).to_string(), "EP0007");
        assert_eq!(PaymentId::new(42).to_string(), "PAY00000042");
        assert_eq!(Party::Lsp.to_string(), "LSP");
        assert_eq!(SimTime::from_millis(1_500).to_string(), "1.500s");
    }
}
