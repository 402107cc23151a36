//! Encoder and regressor chained into a single fare model

use super::features::FeatureEncoder;
use super::regressor::{OnlineRegressor, RegressorConfig};
use super::Predictor;
use crate::error::{FareError, FareResult};
use crate::models::{EncodedFeatures, RawFeatures};
use serde::Serialize;

/// Result of a single training step
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrainOutcome {
    /// Prediction error before the step, `actual - predicted`
    pub error: f64,
    /// Training examples applied to the model, including this one
    pub examples_seen: u64,
}

/// Feature standardization followed by online linear regression
#[derive(Debug, Clone, Default)]
pub struct FarePipeline {
    encoder: FeatureEncoder,
    regressor: OnlineRegressor,
}

impl FarePipeline {
    /// Untrained pipeline
    pub fn new(config: RegressorConfig) -> FareResult<Self> {
        Ok(Self {
            encoder: FeatureEncoder::new(),
            regressor: OnlineRegressor::new(config)?,
        })
    }

    pub fn from_parts(encoder: FeatureEncoder, regressor: OnlineRegressor) -> Self {
        Self { encoder, regressor }
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn regressor(&self) -> &OnlineRegressor {
        &self.regressor
    }

    /// Standardized view of a trip under the current statistics
    pub fn encode(&self, raw: &RawFeatures) -> FareResult<EncodedFeatures> {
        raw.validate()?;
        Ok(self.encoder.transform(raw))
    }

    /// Fare estimate for a trip; no side effects
    pub fn predict_one(&self, raw: &RawFeatures) -> FareResult<f64> {
        let encoded = self.encode(raw)?;
        Ok(self.regressor.predict(&encoded))
    }

    /// Update statistics, then take one gradient step on the re-encoded trip
    pub fn learn_one(&mut self, raw: &RawFeatures, actual_fare: f64) -> FareResult<TrainOutcome> {
        raw.validate()?;
        if !actual_fare.is_finite() {
            return Err(FareError::malformed(
                "fare",
                format!("must be finite, got {}", actual_fare),
            ));
        }

        self.encoder.update(raw);
        let encoded = self.encoder.transform(raw);
        let error = self.regressor.fit_one(&encoded, actual_fare);

        Ok(TrainOutcome {
            error,
            examples_seen: self.regressor.weights().updates,
        })
    }
}

impl Predictor for FarePipeline {
    fn predict(&self, features: &RawFeatures) -> FareResult<f64> {
        self.predict_one(features)
    }

    fn train(&mut self, features: &RawFeatures, actual_fare: f64) -> FareResult<TrainOutcome> {
        self.learn_one(features, actual_fare)
    }

    fn examples_seen(&self) -> u64 {
        self.regressor.weights().updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip() -> RawFeatures {
        RawFeatures::new(5.0, 15.0, 14, 2)
    }

    fn pipeline() -> FarePipeline {
        FarePipeline::new(RegressorConfig::default()).unwrap()
    }

    #[test]
    fn test_fresh_model_predicts_zero() {
        assert_eq!(pipeline().predict_one(&trip()).unwrap(), 0.0);
    }

    #[test]
    fn test_single_training_step_scenario() {
        let mut model = pipeline();
        assert_eq!(model.predict_one(&trip()).unwrap(), 0.0);

        model.learn_one(&trip(), 12.50).unwrap();
        let estimate = model.predict_one(&trip()).unwrap();
        assert!(estimate > 0.0 && estimate < 12.50, "estimate {}", estimate);
    }

    #[test]
    fn test_training_moves_prediction_toward_fare() {
        let mut model = pipeline();
        let history = [
            (RawFeatures::new(2.0, 8.0, 9, 0), 7.25),
            (RawFeatures::new(11.0, 30.0, 18, 4), 28.0),
            (RawFeatures::new(6.5, 20.0, 23, 5), 16.5),
        ];
        for (raw, fare) in &history {
            model.learn_one(raw, *fare).unwrap();
        }

        // A zero-weight model isolates the effect of a single step
        let mut fresh = pipeline();
        for (raw, _) in &history {
            fresh.encoder.update(raw);
        }
        let target = RawFeatures::new(4.0, 12.0, 13, 3);
        let before = (21.0 - fresh.predict_one(&target).unwrap()).abs();
        fresh.learn_one(&target, 21.0).unwrap();
        let after = (21.0 - fresh.predict_one(&target).unwrap()).abs();
        assert!(after < before, "{} !< {}", after, before);
    }

    #[test]
    fn test_training_order_matters() {
        let a = (RawFeatures::new(3.0, 10.0, 8, 1), 9.5);
        let b = (RawFeatures::new(12.0, 35.0, 20, 5), 31.0);

        let mut ab = pipeline();
        ab.learn_one(&a.0, a.1).unwrap();
        ab.learn_one(&b.0, b.1).unwrap();

        let mut ba = pipeline();
        ba.learn_one(&b.0, b.1).unwrap();
        ba.learn_one(&a.0, a.1).unwrap();

        assert_ne!(ab.regressor().weights(), ba.regressor().weights());
    }

    #[test]
    fn test_predict_is_idempotent() {
        let mut model = pipeline();
        model.learn_one(&RawFeatures::new(3.0, 10.0, 8, 1), 9.5).unwrap();
        model.learn_one(&RawFeatures::new(12.0, 35.0, 20, 5), 31.0).unwrap();

        let first = model.predict_one(&trip()).unwrap();
        let second = model.predict_one(&trip()).unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn test_malformed_input_rejected_before_encoder() {
        let mut model = pipeline();
        let bad = RawFeatures::new(5.0, 15.0, 24, 2);
        assert!(matches!(
            model.predict_one(&bad),
            Err(FareError::MalformedInput { field: "hour", .. })
        ));
        assert!(model.learn_one(&bad, 10.0).is_err());
        assert_eq!(model.encoder().state().count(), 0);
        assert_eq!(model.examples_seen(), 0);
    }

    #[test]
    fn test_non_finite_fare_rejected() {
        let mut model = pipeline();
        let err = model.learn_one(&trip(), f64::NAN).unwrap_err();
        assert!(matches!(err, FareError::MalformedInput { field: "fare", .. }));
        assert_eq!(model.encoder().state().count(), 0);
    }

    #[test]
    fn test_predictions_stay_finite_over_stream() {
        let mut model = pipeline();
        for i in 0..2000 {
            let km = 1.0 + (i % 17) as f64 * 0.8;
            let min = 4.0 + (i % 23) as f64 * 1.5;
            let raw = RawFeatures::new(km, min, (i % 24) as i32, (i % 7) as i32);
            let fare = 3.25 + 1.8 * km + 0.2 * min;
            model.learn_one(&raw, fare).unwrap();
        }
        let estimate = model.predict_one(&trip()).unwrap();
        assert!(estimate.is_finite());
        // 3.25 + 9.0 + 3.0
        assert!((estimate - 15.25).abs() < 2.0, "estimate {}", estimate);
    }
}
