//! Integration tests for Floodgate
//!
//! These tests run complete simulations through the public API and check the
//! comparative claims the simulator exists to make: capital lock-up and
//! failure rates of static channels against dynamic pools under the same
//! traffic.

#[path = "integration/fixtures.rs"]
mod fixtures;

#[path = "integration/scenarios.rs"]
mod scenarios;

#[path = "integration/determinism.rs"]
mod determinism;

#[path = "integration/monotonicity.rs"]
mod monotonicity;

#[path = "integration/properties.rs"]
mod properties;

#[path = "integration/parallel_runs.rs"]
mod parallel_runs;
