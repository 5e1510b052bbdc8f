//! More capital never means more failures under the same traffic.

use floodgate_core::{RunParameters, Sats};

use super::fixtures::{DAY_SECS, run_ok, shared_pool};

fn assert_non_increasing(label: &str, rates: &[(Sats, f64)]) {
    for pair in rates.windows(2) {
        assert!(
            pair[1].1 <= pair[0].1,
            "{label}: failure rate rose from {} at {} sats to {} at {} sats",
            pair[0].1,
            pair[0].0,
            pair[1].1,
            pair[1].0
        );
    }
}

#[test]
fn test_channel_failures_fall_as_capacity_grows() {
    let rates: Vec<(Sats, f64)> = [100_000, 1_000_000, 10_000_000]
        .into_iter()
        .map(|capacity| {
            let params = RunParameters::static_baseline()
                .with_seed(6)
                .with_arrival_rate(500.0)
                .with_rebalance_latency_secs(DAY_SECS)
                .with_channel_capacity(capacity);
            (capacity, run_ok(params).failure_rate)
        })
        .collect();

    assert_non_increasing("channels", &rates);
    assert!(rates[0].1 > rates[2].1);
}

#[test]
fn test_pool_failures_fall_as_liquidity_grows() {
    let rates: Vec<(Sats, f64)> = [50_000, 500_000, 10_000_000]
        .into_iter()
        .map(|liquidity| (liquidity, run_ok(shared_pool(6, 2_000.0, liquidity)).failure_rate))
        .collect();

    assert_non_increasing("pools", &rates);
    assert!(rates[0].1 > rates[2].1);
}
