//! Streaming feature standardization
//!
//! Each trip field is standardized against running statistics that are
//! updated one observation at a time, so the encoder needs no separate
//! fitting pass and is usable immediately after creation.

use crate::models::{EncodedFeatures, RawFeatures, NUM_FEATURES};
use serde::{Deserialize, Serialize};

/// Added to the variance before taking the square root
pub const STD_EPSILON: f64 = 1e-9;

/// Running mean and variance for a single field
///
/// Maintained with Welford's online algorithm, so no sum of raw values or
/// sum of squares is ever accumulated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    /// Number of observations seen
    pub count: u64,
    /// Current mean
    pub mean: f64,
    /// Sum of squared differences from the mean
    m2: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild statistics from persisted sufficient statistics
    pub fn from_parts(count: u64, mean: f64, m2: f64) -> Self {
        Self { count, mean, m2 }
    }

    /// Incorporate one observation
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Population variance (zero until at least one observation)
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.m2 / self.count as f64
    }

    /// Sample variance with Bessel's correction
    pub fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        self.m2 / (self.count - 1) as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn m2(&self) -> f64 {
        self.m2
    }

    /// Standardize a value against the current statistics.
    ///
    /// Before any observation the value is returned unchanged.
    pub fn standardize(&self, value: f64) -> f64 {
        if self.count == 0 {
            return value;
        }
        (value - self.mean) / (self.variance() + STD_EPSILON).sqrt()
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.mean.is_finite()
            && self.m2.is_finite()
            && self.m2 >= 0.0
            && (self.count > 0 || (self.mean == 0.0 && self.m2 == 0.0))
    }
}

/// Per-field running statistics, one entry per model input in encoding order
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EncoderState {
    pub fields: [RunningStats; NUM_FEATURES],
}

impl EncoderState {
    /// Observations seen so far (identical across fields)
    pub fn count(&self) -> u64 {
        self.fields[0].count
    }
}

/// Standardizes raw trip features with online statistics
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder {
    state: EncoderState,
}

impl FeatureEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: EncoderState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &EncoderState {
        &self.state
    }

    /// Standardize every field. Does not touch the statistics.
    pub fn transform(&self, raw: &RawFeatures) -> EncodedFeatures {
        let values = raw.values();
        let mut encoded = [0.0; NUM_FEATURES];
        for (i, stats) in self.state.fields.iter().enumerate() {
            encoded[i] = stats.standardize(values[i]);
        }
        EncodedFeatures(encoded)
    }

    /// Fold one observation into the statistics of every field
    pub fn update(&mut self, raw: &RawFeatures) {
        for (stats, value) in self.state.fields.iter_mut().zip(raw.values()) {
            stats.update(value);
        }
    }
}
