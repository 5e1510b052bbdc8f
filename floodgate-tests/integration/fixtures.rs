//! Shared parameter sets for integration tests.

use floodgate_core::tracing_setup::init_test_tracing;
use floodgate_core::{RunParameters, Sats, TopologyKind};
use floodgate_sim::RunResult;

/// Heavily inbound traffic that drains LSP-side channel balances.
pub const SKEWED_INBOUND: f64 = 0.7;

/// One simulated day in seconds.
pub const DAY_SECS: f64 = 86_400.0;

/// Static channels with instant rebalancing at the default fee.
pub fn instant_rebalance_channels(seed: u64) -> RunParameters {
    RunParameters::static_baseline()
        .with_seed(seed)
        .with_endpoint_count(10)
        .with_channel_capacity(1_000_000)
        .with_rebalance_latency_secs(0.0)
        .with_balance_skew(0.5)
}

/// Static channels whose rebalances take a full day.
pub fn slow_rebalance_channels(seed: u64, arrival_rate: f64) -> RunParameters {
    RunParameters::static_baseline()
        .with_seed(seed)
        .with_endpoint_count(10)
        .with_channel_capacity(1_000_000)
        .with_rebalance_latency_secs(DAY_SECS)
        .with_balance_skew(SKEWED_INBOUND)
        .with_arrival_rate(arrival_rate)
}

/// Ten endpoints sharing one pool that settles every ten minutes.
pub fn shared_pool(seed: u64, arrival_rate: f64, liquidity: Sats) -> RunParameters {
    RunParameters::dynamic_baseline()
        .with_seed(seed)
        .with_endpoint_count(10)
        .with_pool_total_liquidity(liquidity)
        .with_round_interval_secs(600.0)
        .with_arrival_rate(arrival_rate)
}

/// Runs `params` and fails the test on any error.
pub fn run_ok(params: RunParameters) -> RunResult {
    init_test_tracing();
    let label = format!("{} seed {}", params.topology, params.seed);
    floodgate_sim::run(params).unwrap_or_else(|err| panic!("{label} failed: {err}"))
}

/// Same parameters with another topology.
pub fn as_topology(params: &RunParameters, topology: TopologyKind) -> RunParameters {
    params.clone().with_topology(topology)
}
