//! Bursty inter-arrival process with optional daily thinning.

use floodgate_core::{ConfigurationError, DiurnalCycle, MILLIS_PER_DAY, SimTime};
use rand_distr::Exp;

use crate::deterministic::SimRng;

/// Mean of an intra-burst gap relative to the nominal mean gap.
const BURST_GAP_FRACTION: f64 = 0.05;

/// Two-phase hyper-exponential gap generator.
///
/// With probability `b / (1 + b)` a gap is drawn from the short burst phase,
/// otherwise from the quiet phase. The quiet mean is chosen so the long-run
/// arrival rate stays at the configured value.
#[derive(Debug, Clone)]
pub struct ArrivalProcess {
    burst_probability: f64,
    burst: Exp<f64>,
    quiet: Exp<f64>,
    mean_gap_millis: f64,
    diurnal: Option<DiurnalThinning>,
}

impl ArrivalProcess {
    /// Creates the process for `arrival_rate` accepted arrivals per day.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError::InvalidParameter` - If the rate or burstiness is out of range
    pub fn new(
        arrival_rate: f64,
        burstiness: f64,
        diurnal: Option<DiurnalCycle>,
    ) -> Result<Self, ConfigurationError> {
        if !arrival_rate.is_finite() || arrival_rate <= 0.0 {
            return Err(ConfigurationError::invalid(
                "arrival_rate",
                "must be finite and positive",
            ));
        }
        if !burstiness.is_finite() || burstiness < 0.0 {
            return Err(ConfigurationError::invalid(
                "burstiness",
                "must be finite and non-negative",
            ));
        }

        let diurnal = diurnal.map(DiurnalThinning::new);
        // Thinning rejects candidates, so candidates arrive faster
        let acceptance = diurnal.as_ref().map_or(1.0, DiurnalThinning::mean_acceptance);
        let mean_gap_millis = MILLIS_PER_DAY as f64 / arrival_rate * acceptance;

        let burst_probability = burstiness / (1.0 + burstiness);
        let burst_mean = BURST_GAP_FRACTION * mean_gap_millis;
        let quiet_mean = (mean_gap_millis - burst_probability * burst_mean) / (1.0 - burst_probability);

        Ok(Self {
            burst_probability,
            burst: exponential("burstiness", burst_mean)?,
            quiet: exponential("arrival_rate", quiet_mean)?,
            mean_gap_millis,
            diurnal,
        })
    }

    /// Mean gap between candidate arrivals in milliseconds.
    pub fn mean_gap_millis(&self) -> f64 {
        self.mean_gap_millis
    }

    /// Draws the next gap, at least one millisecond.
    pub fn next_gap_millis(&self, rng: &mut SimRng) -> u64 {
        let gap = if rng.random_bool(self.burst_probability) {
            rng.sample(&self.burst)
        } else {
            rng.sample(&self.quiet)
        };
        // `as` saturates on huge gaps
        (gap.round() as u64).max(1)
    }

    /// Whether a candidate at `time` survives thinning.
    ///
    /// Draws from `rng` only when a daily cycle is configured.
    pub fn accepts(&self, time: SimTime, rng: &mut SimRng) -> bool {
        match &self.diurnal {
            None => true,
            Some(thinning) => rng.random_bool(thinning.acceptance(time)),
        }
    }
}

#[derive(Debug, Clone)]
struct DiurnalThinning {
    cycle: DiurnalCycle,
}

impl DiurnalThinning {
    fn new(cycle: DiurnalCycle) -> Self {
        Self { cycle }
    }

    fn in_peak(&self, hour: f64) -> bool {
        hour >= self.cycle.peak_start_hour && hour < self.cycle.peak_end_hour
    }

    fn off_peak_acceptance(&self) -> f64 {
        1.0 / self.cycle.peak_multiplier
    }

    fn acceptance(&self, time: SimTime) -> f64 {
        if self.in_peak(time.hour_of_day()) {
            1.0
        } else {
            self.off_peak_acceptance()
        }
    }

    fn mean_acceptance(&self) -> f64 {
        let peak_hours = self.cycle.peak_end_hour - self.cycle.peak_start_hour;
        (peak_hours + (24.0 - peak_hours) * self.off_peak_acceptance()) / 24.0
    }
}

fn exponential(name: &'static str, mean: f64) -> Result<Exp<f64>, ConfigurationError> {
    Exp::new(1.0 / mean)
        .map_err(|_| ConfigurationError::invalid(name, "yields an invalid mean gap"))
}
