//! Simulation clock and the per-run random stream.

use floodgate_core::{ConsistencyError, SimTime};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::Distribution;

/// Logical clock of one run.
///
/// Starts at zero and only moves forward. Independent of wall-clock time.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: SimTime,
}

impl SimClock {
    /// Creates a clock at simulation time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns current simulation time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Advances simulation time to `target`.
    ///
    /// # Errors
    ///
    /// - `ConsistencyError::ClockRewind` - If target time is in the past
    pub fn advance_to(&mut self, target: SimTime) -> Result<(), ConsistencyError> {
        if target < self.now {
            return Err(ConsistencyError::ClockRewind {
                now: self.now,
                requested: target,
            });
        }
        self.now = target;
        Ok(())
    }
}

/// Deterministic random number generator for reproducible runs.
///
/// Uses ChaCha8 seeded from the run seed. Every draw of a run goes through
/// one instance, in a fixed order, so a seed fully determines the traffic.
#[derive(Debug, Clone)]
pub struct SimRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl SimRng {
    /// Creates deterministic RNG from seed value.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Returns the seed used for this RNG.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generates random number in range [0, 1).
    pub fn random_f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Generates random boolean with given probability.
    ///
    /// Probabilities outside [0, 1] behave as the nearest bound.
    pub fn random_bool(&mut self, probability: f64) -> bool {
        self.random_f64() < probability
    }

    /// Generates an index in `[0, len)`, or 0 when `len` is 0.
    pub fn random_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.rng.random_range(0..len)
    }

    /// Draws one value from a distribution.
    pub fn sample<T, D: Distribution<T>>(&mut self, distribution: &D) -> T {
        distribution.sample(&mut self.rng)
    }
}
