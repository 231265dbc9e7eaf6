//! Damping control for the Levenberg-Marquardt algorithm.
//!
//! Adapts the damping parameter from the agreement between predicted and
//! actual reduction in cost (the gain ratio).

use super::config::LmConfig;

/// Trust region implementation for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone)]
pub struct TrustRegion {
    /// Current value of the damping parameter
    pub lambda: f64,

    /// Minimum allowed value for the damping parameter
    pub lambda_min: f64,

    /// Maximum allowed value for the damping parameter
    pub lambda_max: f64,

    /// Factor to increase lambda by when step is rejected
    pub lambda_increase_factor: f64,

    /// Factor to decrease lambda by when a step is very good
    pub lambda_decrease_factor: f64,

    /// Minimum gain ratio required to accept a step
    pub min_gain_ratio: f64,

    /// Gain ratio above which lambda is decreased
    pub good_gain_ratio: f64,

    /// Gain ratio below which an accepted step still doubles lambda
    pub poor_gain_ratio: f64,
}

impl Default for TrustRegion {
    fn default() -> Self {
        Self::from_config(&LmConfig::default())
    }
}

impl TrustRegion {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_config(config: &LmConfig) -> Self {
        Self {
            lambda: config.initial_lambda,
            lambda_min: config.min_lambda,
            lambda_max: config.max_lambda,
            lambda_increase_factor: config.lambda_up_factor,
            lambda_decrease_factor: config.lambda_down_factor,
            min_gain_ratio: 1e-3,
            good_gain_ratio: 0.75,
            poor_gain_ratio: 0.25,
        }
    }

    /// Updates the damping parameter based on the gain ratio.
    ///
    /// Returns whether the step is accepted.
    pub fn update_lambda(&mut self, gain_ratio: f64) -> bool {
        if gain_ratio > self.min_gain_ratio {
            if gain_ratio > self.good_gain_ratio {
                self.lambda = (self.lambda * self.lambda_decrease_factor).max(self.lambda_min);
            } else if gain_ratio < self.poor_gain_ratio {
                self.lambda = (self.lambda * 2.0).min(self.lambda_max);
            }
            true
        } else {
            self.increase();
            false
        }
    }

    /// Increase damping after a rejected or unsolvable step.
    pub fn increase(&mut self) {
        self.lambda = (self.lambda * self.lambda_increase_factor).min(self.lambda_max);
    }

    /// Whether damping has hit its ceiling, i.e. no acceptable step exists.
    pub fn is_saturated(&self) -> bool {
        self.lambda >= self.lambda_max
    }

    /// Calculates the gain ratio between actual and predicted reduction.
    ///
    /// A non-finite trial cost or a non-positive predicted reduction yields
    /// `-1`, which always rejects the step.
    pub fn gain_ratio(current_cost: f64, new_cost: f64, predicted_reduction: f64) -> f64 {
        if !new_cost.is_finite() || predicted_reduction <= 0.0 {
            return -1.0;
        }
        (current_cost - new_cost) / predicted_reduction
    }

    /// Resets the damping parameter to its initial value.
    pub fn reset(&mut self, config: &LmConfig) {
        *self = Self::from_config(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lambda_updates() {
        let mut tr = TrustRegion::new();

        assert!(tr.update_lambda(0.9));
        assert_relative_eq!(tr.lambda, 1e-4);

        assert!(tr.update_lambda(0.5));
        assert_relative_eq!(tr.lambda, 1e-4);

        assert!(tr.update_lambda(0.1));
        assert_relative_eq!(tr.lambda, 2e-4);

        assert!(!tr.update_lambda(1e-4));
        assert_relative_eq!(tr.lambda, 2e-3);
    }

    #[test]
    fn test_saturation() {
        let mut tr = TrustRegion::new();
        for _ in 0..20 {
            tr.increase();
        }
        assert!(tr.is_saturated());
        assert_eq!(tr.lambda, tr.lambda_max);

        tr.reset(&LmConfig::default());
        assert_relative_eq!(tr.lambda, 1e-3);
    }

    #[test]
    fn test_gain_ratio() {
        assert_relative_eq!(TrustRegion::gain_ratio(10.0, 8.0, 4.0), 0.5);
        assert_eq!(TrustRegion::gain_ratio(10.0, f64::INFINITY, 4.0), -1.0);
        assert_eq!(TrustRegion::gain_ratio(10.0, 8.0, 0.0), -1.0);
    }
}
