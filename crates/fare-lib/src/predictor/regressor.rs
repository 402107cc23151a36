//! Online linear regression
//!
//! A linear map from encoded features to fare, trained by one stochastic
//! gradient step per example on the squared-error loss.

use crate::error::{FareError, FareResult};
use crate::models::{EncodedFeatures, NUM_FEATURES};
use serde::{Deserialize, Serialize};

/// Default step size
pub const DEFAULT_LEARNING_RATE: f64 = 0.01;

/// Default bound on the error term of a single step (effectively unclipped)
pub const DEFAULT_CLIP_GRADIENT: f64 = 1e12;

/// Step size schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LearningRateSchedule {
    /// Same step size for every update
    Constant,
    /// `learning_rate / (t + 1)^power_t`, never larger than the base rate
    InverseScaling { power_t: f64 },
}

/// Regressor hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressorConfig {
    pub learning_rate: f64,
    pub schedule: LearningRateSchedule,
    /// L2 shrinkage applied to the feature weights (not the intercept)
    pub l2: f64,
    /// Maximum magnitude of the error term used in a step
    pub clip_gradient: f64,
}

impl Default for RegressorConfig {
    fn default() -> Self {
        Self {
            learning_rate: DEFAULT_LEARNING_RATE,
            schedule: LearningRateSchedule::Constant,
            l2: 0.0,
            clip_gradient: DEFAULT_CLIP_GRADIENT,
        }
    }
}

impl RegressorConfig {
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_schedule(mut self, schedule: LearningRateSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_l2(mut self, l2: f64) -> Self {
        self.l2 = l2;
        self
    }

    pub fn with_clip_gradient(mut self, clip_gradient: f64) -> Self {
        self.clip_gradient = clip_gradient;
        self
    }

    pub fn validate(&self) -> FareResult<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(FareError::InvalidConfig(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if let LearningRateSchedule::InverseScaling { power_t } = self.schedule {
            if !(0.0..=1.0).contains(&power_t) {
                return Err(FareError::InvalidConfig(format!(
                    "power_t must be in [0, 1], got {}",
                    power_t
                )));
            }
        }
        if !(self.l2.is_finite() && self.l2 >= 0.0) {
            return Err(FareError::InvalidConfig(format!("l2 must be >= 0, got {}", self.l2)));
        }
        if self.clip_gradient.is_nan() || self.clip_gradient <= 0.0 {
            return Err(FareError::InvalidConfig(format!(
                "clip_gradient must be > 0, got {}",
                self.clip_gradient
            )));
        }
        Ok(())
    }

    /// Step size for the update following `updates` previous steps
    pub fn learning_rate_at(&self, updates: u64) -> f64 {
        match self.schedule {
            LearningRateSchedule::Constant => self.learning_rate,
            LearningRateSchedule::InverseScaling { power_t } => {
                self.learning_rate / ((updates + 1) as f64).powf(power_t)
            }
        }
    }
}

/// Linear model parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    pub weights: [f64; NUM_FEATURES],
    pub intercept: f64,
    /// Gradient steps applied so far
    pub updates: u64,
}

impl ModelWeights {
    pub(crate) fn is_finite(&self) -> bool {
        self.intercept.is_finite() && self.weights.iter().all(|w| w.is_finite())
    }
}

/// Linear regressor trained one example at a time
#[derive(Debug, Clone, Default)]
pub struct OnlineRegressor {
    config: RegressorConfig,
    weights: ModelWeights,
}

impl OnlineRegressor {
    /// Fresh regressor with zeroed weights
    pub fn new(config: RegressorConfig) -> FareResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            weights: ModelWeights::default(),
        })
    }

    /// Restore a regressor from persisted weights
    pub fn from_weights(config: RegressorConfig, weights: ModelWeights) -> FareResult<Self> {
        config.validate()?;
        Ok(Self { config, weights })
    }

    pub fn config(&self) -> &RegressorConfig {
        &self.config
    }

    pub fn weights(&self) -> &ModelWeights {
        &self.weights
    }

    /// Dot product plus intercept. Zero before any training.
    pub fn predict(&self, encoded: &EncodedFeatures) -> f64 {
        self.weights
            .weights
            .iter()
            .zip(encoded.values())
            .fold(self.weights.intercept, |acc, (w, x)| acc + w * x)
    }

    /// Apply exactly one gradient step and return the pre-update error
    pub fn fit_one(&mut self, encoded: &EncodedFeatures, actual_fare: f64) -> f64 {
        let error = actual_fare - self.predict(encoded);
        let step_error = error.clamp(-self.config.clip_gradient, self.config.clip_gradient);
        let lr = self.config.learning_rate_at(self.weights.updates);

        for (w, x) in self.weights.weights.iter_mut().zip(encoded.values()) {
            *w += lr * (step_error * x - self.config.l2 * *w);
        }
        self.weights.intercept += lr * step_error;
        self.weights.updates += 1;

        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regressor(lr: f64) -> OnlineRegressor {
        OnlineRegressor::new(RegressorConfig::default().with_learning_rate(lr)).unwrap()
    }

    #[test]
    fn test_fresh_regressor_predicts_zero() {
        let model = regressor(0.01);
        let x = EncodedFeatures([1.5, -0.3, 2.0, 0.7]);
        assert_eq!(model.predict(&x), 0.0);
    }

    #[test]
    fn test_single_step_reduces_error() {
        let mut model = regressor(0.01);
        let x = EncodedFeatures([0.5, 1.0, -0.25, 0.1]);
        let before = (12.5 - model.predict(&x)).abs();
        model.fit_one(&x, 12.5);
        let after = (12.5 - model.predict(&x)).abs();
        assert!(after < before);
        assert_eq!(model.weights().updates, 1);
    }

    #[test]
    fn test_gradient_step_values() {
        let mut model = regressor(0.1);
        let x = EncodedFeatures([1.0, 2.0, 0.0, -1.0]);
        let error = model.fit_one(&x, 10.0);
        assert_eq!(error, 10.0);

        let w = model.weights();
        assert!((w.weights[0] - 1.0).abs() < 1e-12);
        assert!((w.weights[1] - 2.0).abs() < 1e-12);
        assert_eq!(w.weights[2], 0.0);
        assert!((w.weights[3] + 1.0).abs() < 1e-12);
        assert!((w.intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_updates_are_order_sensitive() {
        let a = (EncodedFeatures([1.0, 0.5, -1.0, 0.0]), 10.0);
        let b = (EncodedFeatures([-0.5, 2.0, 0.3, 1.0]), 25.0);

        let mut ab = regressor(0.05);
        ab.fit_one(&a.0, a.1);
        ab.fit_one(&b.0, b.1);

        let mut ba = regressor(0.05);
        ba.fit_one(&b.0, b.1);
        ba.fit_one(&a.0, a.1);

        assert_ne!(ab.weights(), ba.weights());
    }

    #[test]
    fn test_converges_on_linear_target() {
        // fare = 3 + 2*x0 - x1
        let mut model = regressor(0.05);
        let data = [
            EncodedFeatures([1.0, 0.0, 0.0, 0.0]),
            EncodedFeatures([0.0, 1.0, 0.0, 0.0]),
            EncodedFeatures([1.0, 1.0, 0.0, 0.0]),
            EncodedFeatures([-1.0, 0.5, 0.0, 0.0]),
        ];
        for _ in 0..500 {
            for x in &data {
                let y = 3.0 + 2.0 * x.0[0] - x.0[1];
                model.fit_one(x, y);
            }
        }
        let w = model.weights();
        assert!((w.intercept - 3.0).abs() < 0.05, "intercept {}", w.intercept);
        assert!((w.weights[0] - 2.0).abs() < 0.05, "w0 {}", w.weights[0]);
        assert!((w.weights[1] + 1.0).abs() < 0.05, "w1 {}", w.weights[1]);
    }

    #[test]
    fn test_outlier_does_not_diverge() {
        let mut model = regressor(0.01);
        let x = EncodedFeatures([0.8, -0.4, 1.2, 0.3]);
        model.fit_one(&x, 1.0e6);
        for i in 0..1000 {
            let x = EncodedFeatures([(i % 5) as f64 * 0.3 - 0.6, 0.2, -0.1, 0.5]);
            model.fit_one(&x, 15.0);
        }
        assert!(model.weights().is_finite());
    }

    #[test]
    fn test_clip_gradient_bounds_step() {
        let config = RegressorConfig::default()
            .with_learning_rate(0.1)
            .with_clip_gradient(5.0);
        let mut model = OnlineRegressor::new(config).unwrap();
        let x = EncodedFeatures([1.0, 0.0, 0.0, 0.0]);
        let error = model.fit_one(&x, 1000.0);
        assert_eq!(error, 1000.0);
        assert!((model.weights().intercept - 0.5).abs() < 1e-12);
        assert!((model.weights().weights[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_scaling_schedule() {
        let config = RegressorConfig::default()
            .with_learning_rate(0.1)
            .with_schedule(LearningRateSchedule::InverseScaling { power_t: 0.5 });
        assert!((config.learning_rate_at(0) - 0.1).abs() < 1e-12);
        assert!((config.learning_rate_at(3) - 0.05).abs() < 1e-12);
        assert!(config.learning_rate_at(1_000_000) < config.learning_rate_at(10));
    }

    #[test]
    fn test_l2_shrinks_weights() {
        let x = EncodedFeatures([1.0, 1.0, 1.0, 1.0]);
        let mut plain = regressor(0.1);
        let mut shrunk =
            OnlineRegressor::new(RegressorConfig::default().with_learning_rate(0.1).with_l2(0.5))
                .unwrap();
        for _ in 0..5 {
            plain.fit_one(&x, 10.0);
            shrunk.fit_one(&x, 10.0);
        }
        assert!(shrunk.weights().weights[0].abs() < plain.weights().weights[0].abs());
    }

    #[test]
    fn test_invalid_config_rejected() {
        for lr in [0.0, -0.1, 1.5, f64::NAN] {
            let config = RegressorConfig::default().with_learning_rate(lr);
            assert!(matches!(
                OnlineRegressor::new(config),
                Err(FareError::InvalidConfig(_))
            ));
        }
        let config = RegressorConfig::default()
            .with_schedule(LearningRateSchedule::InverseScaling { power_t: 2.0 });
        assert!(config.validate().is_err());
        assert!(RegressorConfig::default().with_l2(-1.0).validate().is_err());
        assert!(RegressorConfig::default().with_clip_gradient(0.0).validate().is_err());
    }
}
