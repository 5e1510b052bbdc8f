//! Reference scenarios comparing topologies under identical traffic.

use floodgate_core::{RunParameters, TopologyKind};

use super::fixtures::{
    SKEWED_INBOUND, as_topology, instant_rebalance_channels, run_ok, shared_pool,
    slow_rebalance_channels,
};

#[test]
fn test_balanced_traffic_with_instant_rebalancing_rarely_fails() {
    let result = run_ok(instant_rebalance_channels(1));

    assert!(result.total_payments > 25_000);
    assert!(
        result.failure_rate < 0.02,
        "failure rate {}",
        result.failure_rate
    );
    assert!(result.avg_tvl > 0.0);
    assert!(result.avg_tvl <= result.tvl_ceiling as f64);
    assert_eq!(result.mean_latency_secs, 0.0);
    assert_eq!(result.fees_paid, result.rebalance_count * 5_000);
}

#[test]
fn test_instant_rebalancing_holds_up_across_arrival_rates() {
    for rate in [100.0, 1_000.0, 10_000.0] {
        let result = run_ok(
            instant_rebalance_channels(4)
                .with_arrival_rate(rate)
                .with_duration_days(10.0),
        );

        assert!(
            result.failure_rate < 0.02,
            "rate {rate} failure rate {}",
            result.failure_rate
        );
        assert_eq!(result.tvl_ceiling, 10_000_000);
        assert!(result.avg_tvl <= result.tvl_ceiling as f64);
        assert_eq!(result.fees_paid, result.rebalance_count * 5_000);
        if rate >= 10_000.0 {
            assert!(result.rebalance_count > 0, "no rebalances at rate {rate}");
        }
    }
}

#[test]
fn test_rebalance_fees_never_drain_channels() {
    let result = run_ok(instant_rebalance_channels(1).with_arrival_rate(50_000.0));

    // Fees far beyond what one channel could ever hold
    assert!(
        result.fees_paid > 5 * 1_000_000,
        "fees {} over {} rebalances",
        result.fees_paid,
        result.rebalance_count
    );
    assert!(
        result.failure_rate < 0.02,
        "failure rate {}",
        result.failure_rate
    );
    assert!(result.avg_tvl > 0.4 * result.tvl_ceiling as f64);
}

#[test]
fn test_rebalance_latency_hurts_more_under_heavy_traffic() {
    let light = run_ok(slow_rebalance_channels(2, 100.0));
    let heavy = run_ok(slow_rebalance_channels(2, 2_000.0));

    assert!(
        heavy.failure_rate > light.failure_rate,
        "heavy {} light {}",
        heavy.failure_rate,
        light.failure_rate
    );
    assert!(heavy.rebalance_count > 0);
}

#[test]
fn test_pools_fail_less_with_less_capital_than_channels() {
    let channels = run_ok(slow_rebalance_channels(3, 2_000.0));
    let pools = run_ok(
        shared_pool(3, 2_000.0, 10_000_000).with_balance_skew(SKEWED_INBOUND),
    );

    assert_eq!(pools.total_payments, channels.total_payments);
    assert!(
        pools.failure_rate < channels.failure_rate,
        "pools {} channels {}",
        pools.failure_rate,
        channels.failure_rate
    );
    assert!(pools.avg_tvl < 10_000_000.0);
    assert!(pools.round_count > 0);
    assert!(pools.mean_latency_secs > 0.0);
    assert!(pools.mean_latency_secs <= 600.0);
}

#[test]
fn test_topologies_see_identical_traffic() {
    let base = RunParameters::deterministic_testing().with_seed(11);
    let passthrough = run_ok(as_topology(&base, TopologyKind::Passthrough));
    let channels = run_ok(as_topology(&base, TopologyKind::Static));
    let pools = run_ok(as_topology(&base, TopologyKind::Dynamic));

    assert_eq!(passthrough.total_payments, channels.total_payments);
    assert_eq!(passthrough.total_payments, pools.total_payments);
    assert_eq!(
        channels.total_volume + channels.failed_volume,
        passthrough.total_volume
    );
    assert_eq!(pools.total_volume + pools.failed_volume, passthrough.total_volume);
}

#[test]
fn test_zero_duration_moves_nothing() {
    for topology in [
        TopologyKind::Static,
        TopologyKind::Dynamic,
        TopologyKind::Passthrough,
    ] {
        let params = RunParameters::default()
            .with_topology(topology)
            .with_duration_days(0.0);
        let result = run_ok(params);
        assert_eq!(result.total_payments, 0, "{topology}");
        assert_eq!(result.total_volume, 0);
        assert_eq!(result.capital_velocity, 0.0);
        assert_eq!(result.avg_tvl, 0.0);
        assert_eq!(result.btc_days, 0.0);
        assert!(result.meets_target);
    }
}

#[test]
fn test_passthrough_is_the_zero_capital_reference() {
    let result = run_ok(
        RunParameters::deterministic_testing().with_topology(TopologyKind::Passthrough),
    );
    assert_eq!(result.total_failures, 0);
    assert_eq!(result.tvl_ceiling, 0);
    assert_eq!(result.peak_tvl, 0);
    assert_eq!(result.capital_velocity, 0.0);
    assert!(result.meets_target);
}

#[test]
fn test_static_capital_never_exceeds_committed_capacity() {
    let params = slow_rebalance_channels(4, 500.0);
    let result = run_ok(params.clone());
    assert_eq!(
        result.tvl_ceiling,
        params.channel_capacity * u64::from(params.endpoint_count)
    );
    assert!(result.peak_tvl <= result.tvl_ceiling);
    // Channels open at the target split
    assert!(result.peak_tvl >= params.channel_capacity / 2 * u64::from(params.endpoint_count));
}
