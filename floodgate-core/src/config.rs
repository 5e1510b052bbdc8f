//! Run configuration for Floodgate.
//!
//! One flat [`RunParameters`] record describes a single run: the traffic
//! shape, the endpoint population and the parameters of the topology under
//! study. The record is serializable so it can be echoed into the result
//! row of every run.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::types::{Sats, SimTime, TopologyKind};

/// Relative weight of each endpoint role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleWeights {
    /// Weight of merchants
    pub merchant: f64,
    /// Weight of consumers
    pub consumer: f64,
    /// Weight of hodlers
    pub hodler: f64,
}

impl RoleWeights {
    /// Creates role weights.
    pub const fn new(merchant: f64, consumer: f64, hodler: f64) -> Self {
        Self {
            merchant,
            consumer,
            hodler,
        }
    }

    /// Returns weights in merchant, consumer, hodler order.
    pub fn as_array(&self) -> [f64; 3] {
        [self.merchant, self.consumer, self.hodler]
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigurationError> {
        let weights = self.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigurationError::invalid(
                name,
                "weights must be finite and non-negative",
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(ConfigurationError::invalid(
                name,
                "at least one weight must be positive",
            ));
        }
        Ok(())
    }
}

/// Population shares and traffic weights of the endpoint roles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeMix {
    /// Fraction of the population assigned to each role
    pub shares: RoleWeights,
    /// Share of payments sent by each role
    pub sender_weights: RoleWeights,
    /// Share of payments received by each role
    pub receiver_weights: RoleWeights,
}

impl Default for ArchetypeMix {
    fn default() -> Self {
        Self {
            shares: RoleWeights::new(0.05, 0.85, 0.10),
            sender_weights: RoleWeights::new(0.02, 0.93, 0.05),
            receiver_weights: RoleWeights::new(0.60, 0.30, 0.10),
        }
    }
}

/// How payment sources and destinations are drawn from the population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EndpointSelection {
    /// Every endpoint equally likely
    Uniform,
    /// Zipf-like concentration, weight of rank `r` is `1 / r^exponent`
    Hubs {
        /// Concentration exponent, 0 is uniform
        exponent: f64,
    },
    /// Role-based population
    Archetypes(ArchetypeMix),
}

/// Daily arrival pattern layered on top of the bursty arrival process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiurnalCycle {
    /// Hour of day the peak starts, inclusive
    pub peak_start_hour: f64,
    /// Hour of day the peak ends, exclusive
    pub peak_end_hour: f64,
    /// Rate during peak hours relative to off-peak hours
    pub peak_multiplier: f64,
}

impl Default for DiurnalCycle {
    fn default() -> Self {
        Self {
            peak_start_hour: 9.0,
            peak_end_hour: 21.0,
            peak_multiplier: 3.0,
        }
    }
}

/// When a depleted channel asks for a rebalance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebalancePolicy {
    /// On the first payment the channel cannot carry
    OnFirstShortfall,
    /// After `threshold` shortfalls since the last rebalance
    AfterFailures {
        /// Shortfalls needed to trigger, at least 1
        threshold: u32,
    },
    /// Never, the channel stays depleted until traffic reverses
    Never,
}

/// Target allocation applied at every round settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementAllocation {
    /// Fixed LSP fraction, endpoint side split evenly
    Even,
    /// Follow the demand observed during the round that just closed
    DemandWeighted,
}

/// Parameters of a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    /// Seed of the run's random stream
    pub seed: u64,
    /// Length of the observation window in simulated days
    pub duration_days: f64,
    /// Topology under study
    pub topology: TopologyKind,

    /// Mean payment arrivals per simulated day
    pub arrival_rate: f64,
    /// Pareto shape of payment amounts
    pub amount_pareto_shape: f64,
    /// Pareto scale of payment amounts in sats, also the minimum amount
    pub amount_pareto_scale: f64,
    /// Upper clamp on payment amounts
    pub max_amount_sats: Sats,
    /// Burstiness factor, 0 is Poisson
    pub burstiness: f64,
    /// Fraction of external payments flowing LSP to endpoint
    pub balance_skew: f64,
    /// Fraction of payments between two endpoints
    pub internal_ratio: f64,

    /// Size of the endpoint population
    pub endpoint_count: u32,
    /// How participants are drawn
    pub endpoint_selection: EndpointSelection,
    /// Optional daily arrival pattern
    pub diurnal_cycle: Option<DiurnalCycle>,

    /// Static: capacity of each channel
    pub channel_capacity: Sats,
    /// Static: fraction of capacity on the LSP side after a reset
    pub target_split: f64,
    /// Static: seconds between a rebalance request and its completion
    pub rebalance_latency_secs: f64,
    /// Static: sats of capacity lost per rebalance
    pub rebalance_cost: Sats,
    /// Static: rebalance trigger
    pub rebalance_policy: RebalancePolicy,

    /// Dynamic: liquidity committed across all pools
    pub pool_total_liquidity: Sats,
    /// Dynamic: endpoints per pool
    pub pool_size: u32,
    /// Dynamic: seconds between round settlements
    pub round_interval_secs: f64,
    /// Dynamic: sats charged per settlement round
    pub round_cost: Sats,
    /// Dynamic: fraction of pool liquidity on the LSP side under even allocation
    pub lsp_target_fraction: f64,
    /// Dynamic: settlement target allocation
    pub settlement_allocation: SettlementAllocation,

    /// Failure rate the topology must stay under
    pub target_failure_rate: f64,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            seed: 42,
            duration_days: 30.0,
            topology: TopologyKind::Static,
            arrival_rate: 1_000.0,
            amount_pareto_shape: 2.5,
            amount_pareto_scale: 10_000.0,
            max_amount_sats: 10_000_000,
            burstiness: 1.0,
            balance_skew: 0.5,
            internal_ratio: 0.2,
            endpoint_count: 10,
            endpoint_selection: EndpointSelection::Uniform,
            diurnal_cycle: None,
            channel_capacity: 1_000_000,
            target_split: 0.5,
            rebalance_latency_secs: 3_600.0, // 1 hour
            rebalance_cost: 5_000,
            rebalance_policy: RebalancePolicy::OnFirstShortfall,
            pool_total_liquidity: 10_000_000,
            pool_size: 10,
            round_interval_secs: 600.0, // 10 minutes
            round_cost: 0,
            lsp_target_fraction: 0.5,
            settlement_allocation: SettlementAllocation::Even,
            target_failure_rate: 0.01,
        }
    }
}

impl RunParameters {
    /// Static channels with default traffic.
    pub fn static_baseline() -> Self {
        Self::default()
    }

    /// Dynamic pools holding as much liquidity as the static baseline's channels.
    pub fn dynamic_baseline() -> Self {
        Self {
            topology: TopologyKind::Dynamic,
            ..Self::default()
        }
    }

    /// Creates a small, fast configuration for deterministic tests.
    pub fn deterministic_testing() -> Self {
        Self {
            seed: 42,
            duration_days: 1.0,
            arrival_rate: 200.0,
            endpoint_count: 5,
            rebalance_latency_secs: 0.0,
            rebalance_cost: 0,
            ..Self::default()
        }
    }

    /// Creates parameters from defaults with environment overrides.
    ///
    /// Reads `FLOODGATE_SEED`, `FLOODGATE_DURATION_DAYS`,
    /// `FLOODGATE_ARRIVAL_RATE` and `FLOODGATE_ENDPOINTS`.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError::InvalidEnvironmentOverride` - A variable is set but does not parse
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let mut params = Self::default();
        params.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(params)
    }

    /// Applies overrides from a variable lookup.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError::InvalidEnvironmentOverride` - A variable is set but does not parse
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigurationError> {
        if let Some(seed) = parse_override(&lookup, "FLOODGATE_SEED")? {
            self.seed = seed;
        }
        if let Some(days) = parse_override(&lookup, "FLOODGATE_DURATION_DAYS")? {
            self.duration_days = days;
        }
        if let Some(rate) = parse_override(&lookup, "FLOODGATE_ARRIVAL_RATE")? {
            self.arrival_rate = rate;
        }
        if let Some(count) = parse_override(&lookup, "FLOODGATE_ENDPOINTS")? {
            self.endpoint_count = count;
        }
        Ok(())
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the topology.
    pub fn with_topology(mut self, topology: TopologyKind) -> Self {
        self.topology = topology;
        self
    }

    /// Sets the observation window.
    pub fn with_duration_days(mut self, days: f64) -> Self {
        self.duration_days = days;
        self
    }

    /// Sets the mean arrival rate per day.
    pub fn with_arrival_rate(mut self, rate: f64) -> Self {
        self.arrival_rate = rate;
        self
    }

    /// Sets the fraction of external payments flowing to endpoints.
    pub fn with_balance_skew(mut self, skew: f64) -> Self {
        self.balance_skew = skew;
        self
    }

    /// Sets the endpoint population size.
    pub fn with_endpoint_count(mut self, count: u32) -> Self {
        self.endpoint_count = count;
        self
    }

    /// Sets the endpoint selection mode.
    pub fn with_endpoint_selection(mut self, selection: EndpointSelection) -> Self {
        self.endpoint_selection = selection;
        self
    }

    /// Sets the static channel capacity.
    pub fn with_channel_capacity(mut self, capacity: Sats) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Sets the static rebalance latency.
    pub fn with_rebalance_latency_secs(mut self, secs: f64) -> Self {
        self.rebalance_latency_secs = secs;
        self
    }

    /// Sets the static rebalance policy.
    pub fn with_rebalance_policy(mut self, policy: RebalancePolicy) -> Self {
        self.rebalance_policy = policy;
        self
    }

    /// Sets the dynamic pool liquidity.
    pub fn with_pool_total_liquidity(mut self, liquidity: Sats) -> Self {
        self.pool_total_liquidity = liquidity;
        self
    }

    /// Sets the dynamic round interval.
    pub fn with_round_interval_secs(mut self, secs: f64) -> Self {
        self.round_interval_secs = secs;
        self
    }

    /// Sets the dynamic settlement allocation.
    pub fn with_settlement_allocation(mut self, allocation: SettlementAllocation) -> Self {
        self.settlement_allocation = allocation;
        self
    }

    /// End of the observation window.
    pub fn horizon(&self) -> SimTime {
        SimTime::from_days(self.duration_days)
    }

    /// Rebalance latency in whole milliseconds.
    pub fn rebalance_latency_millis(&self) -> u64 {
        SimTime::from_secs_f64(self.rebalance_latency_secs).as_millis()
    }

    /// Round interval in whole milliseconds.
    pub fn round_interval_millis(&self) -> u64 {
        SimTime::from_secs_f64(self.round_interval_secs).as_millis()
    }

    /// Checks every parameter the selected topology uses.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError::InvalidParameter` - First parameter found out of range
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.duration_days.is_finite() || self.duration_days < 0.0 {
            return Err(ConfigurationError::invalid(
                "duration_days",
                "must be finite and non-negative",
            ));
        }
        require_positive("arrival_rate", self.arrival_rate)?;
        require_positive("amount_pareto_shape", self.amount_pareto_shape)?;
        require_positive("amount_pareto_scale", self.amount_pareto_scale)?;
        if self.max_amount_sats == 0 {
            return Err(ConfigurationError::invalid(
                "max_amount_sats",
                "must be at least 1",
            ));
        }
        if !self.burstiness.is_finite() || self.burstiness < 0.0 {
            return Err(ConfigurationError::invalid(
                "burstiness",
                "must be finite and non-negative",
            ));
        }
        require_fraction("balance_skew", self.balance_skew)?;
        require_fraction("internal_ratio", self.internal_ratio)?;
        require_fraction("target_failure_rate", self.target_failure_rate)?;
        if self.endpoint_count == 0 {
            return Err(ConfigurationError::invalid(
                "endpoint_count",
                "must be at least 1",
            ));
        }
        self.validate_selection()?;
        if let Some(cycle) = &self.diurnal_cycle {
            validate_diurnal(cycle)?;
        }

        match self.topology {
            TopologyKind::Static => self.validate_static(),
            TopologyKind::Dynamic => self.validate_dynamic(),
            TopologyKind::Passthrough => Ok(()),
        }
    }

    fn validate_selection(&self) -> Result<(), ConfigurationError> {
        match &self.endpoint_selection {
            EndpointSelection::Uniform => Ok(()),
            EndpointSelection::Hubs { exponent } => {
                if !exponent.is_finite() || *exponent < 0.0 {
                    return Err(ConfigurationError::invalid(
                        "endpoint_selection.exponent",
                        "must be finite and non-negative",
                    ));
                }
                Ok(())
            }
            EndpointSelection::Archetypes(mix) => {
                mix.shares.validate("endpoint_selection.shares")?;
                mix.sender_weights
                    .validate("endpoint_selection.sender_weights")?;
                mix.receiver_weights
                    .validate("endpoint_selection.receiver_weights")
            }
        }
    }

    fn validate_static(&self) -> Result<(), ConfigurationError> {
        if self.channel_capacity == 0 {
            return Err(ConfigurationError::invalid(
                "channel_capacity",
                "must be at least 1",
            ));
        }
        if self
            .channel_capacity
            .checked_mul(Sats::from(self.endpoint_count))
            .is_none()
        {
            return Err(ConfigurationError::invalid(
                "channel_capacity",
                "total capacity across endpoints overflows",
            ));
        }
        require_fraction("target_split", self.target_split)?;
        if !self.rebalance_latency_secs.is_finite() || self.rebalance_latency_secs < 0.0 {
            return Err(ConfigurationError::invalid(
                "rebalance_latency_secs",
                "must be finite and non-negative",
            ));
        }
        if self.rebalance_cost >= self.channel_capacity {
            return Err(ConfigurationError::invalid(
                "rebalance_cost",
                format!(
                    "must be below channel_capacity ({})",
                    self.channel_capacity
                ),
            ));
        }
        if let RebalancePolicy::AfterFailures { threshold: 0 } = self.rebalance_policy {
            return Err(ConfigurationError::invalid(
                "rebalance_policy.threshold",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    fn validate_dynamic(&self) -> Result<(), ConfigurationError> {
        if self.pool_total_liquidity == 0 {
            return Err(ConfigurationError::invalid(
                "pool_total_liquidity",
                "must be at least 1",
            ));
        }
        if self.pool_size == 0 {
            return Err(ConfigurationError::invalid(
                "pool_size",
                "must be at least 1",
            ));
        }
        if !self.round_interval_secs.is_finite() || self.round_interval_millis() == 0 {
            return Err(ConfigurationError::invalid(
                "round_interval_secs",
                "must be finite and at least one millisecond",
            ));
        }
        require_fraction("lsp_target_fraction", self.lsp_target_fraction)
    }
}

fn parse_override<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    variable: &'static str,
) -> Result<Option<T>, ConfigurationError> {
    match lookup(variable) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigurationError::InvalidEnvironmentOverride { variable, value }),
    }
}

fn require_positive(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigurationError::invalid(
            name,
            "must be finite and positive",
        ));
    }
    Ok(())
}

fn require_fraction(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigurationError::invalid(name, "must be within [0, 1]"));
    }
    Ok(())
}

fn validate_diurnal(cycle: &DiurnalCycle) -> Result<(), ConfigurationError> {
    let hours = 0.0..=24.0;
    if !hours.contains(&cycle.peak_start_hour)
        || !hours.contains(&cycle.peak_end_hour)
        || cycle.peak_start_hour >= cycle.peak_end_hour
    {
        return Err(ConfigurationError::invalid(
            "diurnal_cycle",
            "peak hours must satisfy 0 <= start < end <= 24",
        ));
    }
    if !cycle.peak_multiplier.is_finite() || cycle.peak_multiplier < 1.0 {
        return Err(ConfigurationError::invalid(
            "diurnal_cycle.peak_multiplier",
            "must be finite and at least 1",
        ));
    }
    Ok(())
}
