//! Independent runs on separate threads share nothing.

use std::thread;

use floodgate_core::{RunParameters, SimulationError, TopologyKind};
use floodgate_sim::{AbortSignal, RunOrchestrator, RunResult};

fn sweep() -> Vec<RunParameters> {
    (0..6)
        .map(|seed| {
            let topology = if seed % 2 == 0 {
                TopologyKind::Static
            } else {
                TopologyKind::Dynamic
            };
            RunParameters::deterministic_testing()
                .with_seed(seed)
                .with_topology(topology)
                .with_channel_capacity(80_000)
                .with_pool_total_liquidity(400_000)
        })
        .collect()
}

#[test]
fn test_parallel_sweep_matches_sequential() {
    let sequential: Vec<RunResult> = sweep()
        .into_iter()
        .map(|params| floodgate_sim::run(params).unwrap())
        .collect();

    let parallel: Vec<RunResult> = thread::scope(|scope| {
        let handles: Vec<_> = sweep()
            .into_iter()
            .map(|params| scope.spawn(move || floodgate_sim::run(params)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect()
    });

    assert_eq!(sequential, parallel);
}

#[test]
fn test_shared_abort_signal_stops_every_run() {
    let abort = AbortSignal::new();
    abort.raise();

    let outcomes: Vec<Result<RunResult, SimulationError>> = thread::scope(|scope| {
        let handles: Vec<_> = sweep()
            .into_iter()
            .map(|params| {
                let orchestrator = RunOrchestrator::new(params).with_abort_signal(abort.clone());
                scope.spawn(move || orchestrator.execute())
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(outcomes.len(), 6);
    assert!(
        outcomes
            .iter()
            .all(|outcome| matches!(outcome, Err(SimulationError::Aborted { .. })))
    );
}
