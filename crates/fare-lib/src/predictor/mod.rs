//! Online fare prediction engine

mod features;
mod handle;
mod pipeline;
mod regressor;

pub use features::{EncoderState, FeatureEncoder, RunningStats, STD_EPSILON};
pub use handle::{FieldSummary, ModelSummary, SharedModel};
pub use pipeline::{FarePipeline, TrainOutcome};
pub use regressor::{
    LearningRateSchedule, ModelWeights, OnlineRegressor, RegressorConfig, DEFAULT_CLIP_GRADIENT,
    DEFAULT_LEARNING_RATE,
};

use crate::error::FareResult;
use crate::models::RawFeatures;

/// Trait for fare prediction implementations
pub trait Predictor: Send + Sync {
    /// Estimate the fare for a trip
    fn predict(&self, features: &RawFeatures) -> FareResult<f64>;

    /// Apply one training example
    fn train(&mut self, features: &RawFeatures, actual_fare: f64) -> FareResult<TrainOutcome>;

    /// Number of training examples applied so far
    fn examples_seen(&self) -> u64;
}
