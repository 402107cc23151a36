//! Process-wide model handle
//!
//! Guards the encoder statistics and weights with a single lock: training
//! and reloads take it exclusively, predictions share it.

use super::pipeline::{FarePipeline, TrainOutcome};
use super::regressor::RegressorConfig;
use crate::artifact::{ModelArtifact, ARTIFACT_FORMAT_VERSION};
use crate::error::{FareError, FareResult};
use crate::models::{RawFeatures, FEATURE_NAMES};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Statistics and weight of one model input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSummary {
    pub name: String,
    pub count: u64,
    pub mean: f64,
    pub variance: f64,
    pub weight: f64,
}

/// Read-only snapshot of the serving model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub format_version: u32,
    pub examples_seen: u64,
    pub intercept: f64,
    pub config: RegressorConfig,
    pub fields: Vec<FieldSummary>,
}

/// Shared, lock-guarded fare model
#[derive(Debug, Clone)]
pub struct SharedModel {
    inner: Arc<RwLock<FarePipeline>>,
}

impl SharedModel {
    pub fn new(pipeline: FarePipeline) -> Self {
        Self {
            inner: Arc::new(RwLock::new(pipeline)),
        }
    }

    pub fn from_artifact(artifact: ModelArtifact) -> FareResult<Self> {
        Ok(Self::new(artifact.into_pipeline()?))
    }

    fn read(&self) -> FareResult<RwLockReadGuard<'_, FarePipeline>> {
        self.inner
            .read()
            .map_err(|e| FareError::UninitializedModel(format!("model lock poisoned: {}", e)))
    }

    fn write(&self) -> FareResult<RwLockWriteGuard<'_, FarePipeline>> {
        self.inner
            .write()
            .map_err(|e| FareError::UninitializedModel(format!("model lock poisoned: {}", e)))
    }

    pub fn predict(&self, features: &RawFeatures) -> FareResult<f64> {
        self.read()?.predict_one(features)
    }

    pub fn train(&self, features: &RawFeatures, actual_fare: f64) -> FareResult<TrainOutcome> {
        let outcome = self.write()?.learn_one(features, actual_fare)?;
        debug!(
            error = outcome.error,
            examples_seen = outcome.examples_seen,
            "Applied training example"
        );
        Ok(outcome)
    }

    /// Replace the model state in one step; concurrent readers see old or new
    pub fn reload(&self, artifact: ModelArtifact) -> FareResult<u64> {
        let pipeline = artifact.into_pipeline()?;
        let examples_seen = pipeline.regressor().weights().updates;
        *self.write()? = pipeline;
        Ok(examples_seen)
    }

    /// Consistent copy of the current state for persistence
    pub fn snapshot(&self) -> FareResult<ModelArtifact> {
        let pipeline = self.read()?;
        Ok(ModelArtifact::from_pipeline(&pipeline))
    }

    pub fn examples_seen(&self) -> FareResult<u64> {
        Ok(self.read()?.regressor().weights().updates)
    }

    pub fn summary(&self) -> FareResult<ModelSummary> {
        let pipeline = self.read()?;
        let weights = pipeline.regressor().weights();
        let fields = FEATURE_NAMES
            .iter()
            .zip(pipeline.encoder().state().fields.iter())
            .zip(weights.weights.iter())
            .map(|((name, stats), weight)| FieldSummary {
                name: name.to_string(),
                count: stats.count,
                mean: stats.mean,
                variance: stats.variance(),
                weight: *weight,
            })
            .collect();

        Ok(ModelSummary {
            format_version: ARTIFACT_FORMAT_VERSION,
            examples_seen: weights.updates,
            intercept: weights.intercept,
            config: *pipeline.regressor().config(),
            fields,
        })
    }
}
