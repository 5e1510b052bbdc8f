//! Run-level accounting holds for arbitrary small configurations.

use floodgate_core::{RunParameters, TopologyKind};
use proptest::prelude::*;

fn topology() -> impl Strategy<Value = TopologyKind> {
    prop_oneof![
        Just(TopologyKind::Static),
        Just(TopologyKind::Dynamic),
        Just(TopologyKind::Passthrough),
    ]
}

prop_compose! {
    fn small_run()(
        seed in any::<u64>(),
        topology in topology(),
        duration_days in 0.0f64..2.0,
        arrival_rate in 20.0f64..300.0,
        endpoint_count in 1u32..8,
        pool_size in 1u32..5,
        balance_skew in 0.0f64..=1.0,
        channel_capacity in 10_000u64..2_000_000,
        pool_total_liquidity in 1_000u64..5_000_000,
        round_interval_secs in 60.0f64..7_200.0,
    ) -> RunParameters {
        RunParameters {
            seed,
            topology,
            duration_days,
            arrival_rate,
            endpoint_count,
            pool_size,
            balance_skew,
            channel_capacity,
            pool_total_liquidity,
            round_interval_secs,
            ..RunParameters::default()
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 32, failure_persistence: None, .. ProptestConfig::default() })]

    #[test]
    fn prop_run_accounting_is_consistent(params in small_run()) {
        let result = floodgate_sim::run(params.clone()).unwrap();

        prop_assert_eq!(result.total_successes + result.total_failures, result.total_payments);
        prop_assert!((0.0..=1.0).contains(&result.failure_rate));
        prop_assert_eq!(result.meets_target, result.failure_rate <= params.target_failure_rate);
        prop_assert!(result.peak_tvl <= result.tvl_ceiling);
        prop_assert!(result.avg_tvl >= 0.0);
        prop_assert!(result.avg_tvl <= result.peak_tvl as f64 * (1.0 + 1e-9));

        let horizon_millis = params.horizon().as_millis() as f64;
        let expected_btc_days = result.avg_tvl * horizon_millis / 1e8 / 86_400_000.0;
        prop_assert!((result.btc_days - expected_btc_days).abs() <= 1e-9 * expected_btc_days.max(1.0));

        if result.avg_tvl > 0.0 {
            let expected_velocity = result.total_volume as f64 / result.avg_tvl;
            prop_assert!((result.capital_velocity - expected_velocity).abs() <= 1e-9 * expected_velocity.max(1.0));
        } else {
            prop_assert_eq!(result.capital_velocity, 0.0);
        }

        match params.topology {
            TopologyKind::Passthrough => {
                prop_assert_eq!(result.total_failures, 0);
                prop_assert_eq!(result.tvl_ceiling, 0);
            }
            TopologyKind::Dynamic => {
                prop_assert_eq!(result.tvl_ceiling, params.pool_total_liquidity);
                prop_assert!(result.mean_latency_secs <= params.round_interval_secs + 1e-3);
                prop_assert_eq!(result.rebalance_count, 0);
            }
            TopologyKind::Static => {
                prop_assert_eq!(
                    result.tvl_ceiling,
                    params.channel_capacity * u64::from(params.endpoint_count)
                );
                prop_assert_eq!(result.mean_latency_secs, 0.0);
                prop_assert_eq!(result.round_count, 0);
            }
        }
    }

    #[test]
    fn prop_same_seed_same_result(seed in any::<u64>(), topology in topology()) {
        let params = RunParameters::deterministic_testing()
            .with_seed(seed)
            .with_topology(topology)
            .with_duration_days(0.25);
        let first = floodgate_sim::run(params.clone()).unwrap();
        let second = floodgate_sim::run(params).unwrap();
        prop_assert_eq!(first, second);
    }
}
