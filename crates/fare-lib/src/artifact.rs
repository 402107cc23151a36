//! Model artifact persistence
//!
//! This module provides:
//! - A versioned, checksummed envelope around encoder statistics and weights
//! - Atomic writes (unique temp file, fsync, rename over the live file) with
//!   one previous copy kept
//! - Rejection of missing, corrupt or version-mismatched artifacts

use crate::error::{FareError, FareResult};
use crate::models::FEATURE_NAMES;
use crate::predictor::{
    EncoderState, FarePipeline, FeatureEncoder, ModelWeights, OnlineRegressor, RegressorConfig,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Artifact layout version; bumped whenever the encoder or weight shape changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Encoder statistics and regressor weights of one trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Field order the statistics and weights refer to
    pub feature_names: Vec<String>,
    pub encoder: EncoderState,
    pub weights: ModelWeights,
    pub config: RegressorConfig,
    pub saved_at: i64,
}

/// On-disk wrapper. `payload` is the artifact JSON, hashed byte for byte.
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactEnvelope {
    format_version: u32,
    checksum: String,
    payload: String,
}

impl ModelArtifact {
    /// Untrained artifact with zeroed weights and empty statistics
    pub fn fresh(config: RegressorConfig) -> FareResult<Self> {
        let pipeline = FarePipeline::new(config)?;
        Ok(Self::from_pipeline(&pipeline))
    }

    pub fn from_pipeline(pipeline: &FarePipeline) -> Self {
        Self {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            encoder: *pipeline.encoder().state(),
            weights: *pipeline.regressor().weights(),
            config: *pipeline.regressor().config(),
            saved_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Rebuild a pipeline, rejecting artifacts whose contents cannot be trusted
    pub fn into_pipeline(self) -> FareResult<FarePipeline> {
        self.check_shape()?;
        let regressor = OnlineRegressor::from_weights(self.config, self.weights)
            .map_err(|e| FareError::UninitializedModel(format!("artifact config rejected: {}", e)))?;
        Ok(FarePipeline::from_parts(
            FeatureEncoder::from_state(self.encoder),
            regressor,
        ))
    }

    fn check_shape(&self) -> FareResult<()> {
        if self.feature_names.iter().map(String::as_str).ne(FEATURE_NAMES.iter().copied()) {
            return Err(FareError::UninitializedModel(format!(
                "artifact features {:?} do not match {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        let count = self.encoder.count();
        if self
            .encoder
            .fields
            .iter()
            .any(|f| f.count != count || !f.is_consistent())
        {
            return Err(FareError::UninitializedModel(
                "artifact encoder statistics are inconsistent".to_string(),
            ));
        }
        if !self.weights.is_finite() {
            return Err(FareError::UninitializedModel(
                "artifact weights are not finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize into the versioned envelope
    pub fn to_bytes(&self) -> FareResult<Vec<u8>> {
        let payload = serde_json::to_string(self)?;
        let envelope = ArtifactEnvelope {
            format_version: ARTIFACT_FORMAT_VERSION,
            checksum: compute_checksum(payload.as_bytes()),
            payload,
        };
        Ok(serde_json::to_vec_pretty(&envelope)?)
    }

    /// Decode an envelope. Every failure maps to `UninitializedModel`.
    pub fn from_bytes(bytes: &[u8]) -> FareResult<Self> {
        let envelope: ArtifactEnvelope = serde_json::from_slice(bytes).map_err(|e| {
            FareError::UninitializedModel(format!("undecodable artifact envelope: {}", e))
        })?;

        if envelope.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(FareError::UninitializedModel(format!(
                "artifact format version {} is not supported (expected {})",
                envelope.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }

        let computed = compute_checksum(envelope.payload.as_bytes());
        if computed != envelope.checksum {
            return Err(FareError::UninitializedModel(format!(
                "checksum mismatch: expected {}, got {}",
                envelope.checksum, computed
            )));
        }

        let artifact: ModelArtifact = serde_json::from_str(&envelope.payload).map_err(|e| {
            FareError::UninitializedModel(format!("undecodable artifact payload: {}", e))
        })?;
        artifact.check_shape()?;
        Ok(artifact)
    }
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Filesystem location of the serving model
///
/// Clones share one save lock, so saves through them never interleave.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    path: PathBuf,
    save_lock: Arc<Mutex<()>>,
}

impl ArtifactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the copy replaced by the last save
    pub fn previous_path(&self) -> PathBuf {
        self.path.with_extension("prev.json")
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load and validate the artifact
    pub fn load(&self) -> FareResult<ModelArtifact> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FareError::UninitializedModel(format!(
                    "no model artifact at {}",
                    self.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let artifact = ModelArtifact::from_bytes(&bytes)?;
        info!(
            path = %self.path.display(),
            examples_seen = artifact.weights.updates,
            checksum = %compute_checksum(&bytes),
            "Model artifact loaded"
        );
        Ok(artifact)
    }

    /// Write the artifact atomically, keeping the replaced file as a backup.
    ///
    /// The live path always holds either the old or the new artifact.
    pub fn save(&self, artifact: &ModelArtifact) -> FareResult<()> {
        let bytes = artifact.to_bytes()?;

        let _guard = self
            .save_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                parent.to_path_buf()
            }
            None => PathBuf::from("."),
        };

        // Must share a filesystem with the target for the rename to be atomic
        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;

        if self.path.exists() {
            let previous = self.previous_path();
            if let Err(e) = fs::copy(&self.path, &previous) {
                warn!(
                    path = %previous.display(),
                    error = %e,
                    "Failed to keep previous model artifact"
                );
            }
        }

        temp.persist(&self.path).map_err(|e| FareError::Io(e.error))?;

        debug!(
            path = %self.path.display(),
            size = bytes.len(),
            examples_seen = artifact.weights.updates,
            "Model artifact saved"
        );
        Ok(())
    }
}
