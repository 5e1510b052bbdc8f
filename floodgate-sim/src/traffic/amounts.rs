//! Heavy-tailed payment amounts.

use floodgate_core::{ConfigurationError, Sats};
use rand_distr::Pareto;

use crate::deterministic::SimRng;

/// Pareto-distributed amounts rounded to whole sats and clamped.
#[derive(Debug, Clone)]
pub struct AmountModel {
    pareto: Pareto<f64>,
    max_amount: Sats,
}

impl AmountModel {
    /// Creates the model. `scale` is also the smallest amount drawn.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError::InvalidParameter` - If shape or scale is not positive, or the clamp is zero
    pub fn new(shape: f64, scale: f64, max_amount: Sats) -> Result<Self, ConfigurationError> {
        if !shape.is_finite() || shape <= 0.0 {
            return Err(ConfigurationError::invalid(
                "amount_pareto_shape",
                "must be finite and positive",
            ));
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ConfigurationError::invalid(
                "amount_pareto_scale",
                "must be finite and positive",
            ));
        }
        if max_amount == 0 {
            return Err(ConfigurationError::invalid(
                "max_amount_sats",
                "must be at least 1",
            ));
        }
        let pareto = Pareto::new(scale, shape)
            .map_err(|_| ConfigurationError::invalid("amount_pareto_shape", "rejected by sampler"))?;
        Ok(Self { pareto, max_amount })
    }

    /// Draws one amount in `[1, max_amount]`.
    pub fn sample(&self, rng: &mut SimRng) -> Sats {
        let raw: f64 = rng.sample(&self.pareto);
        (raw.round() as Sats).clamp(1, self.max_amount)
    }
}
