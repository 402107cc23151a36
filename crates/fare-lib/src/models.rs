//! Core data models for the fare estimator

use crate::error::{FareError, FareResult};
use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Number of trip fields fed to the model
pub const NUM_FEATURES: usize = 4;

/// Field names in encoding order
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = ["km", "min", "hour", "day"];

/// Raw trip attributes supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawFeatures {
    /// Trip distance in kilometres
    pub km: f64,
    /// Trip duration in minutes
    pub min: f64,
    /// Hour of day, 0-23
    pub hour: i32,
    /// Day of week, 0 (Monday) to 6 (Sunday)
    pub day: i32,
}

impl RawFeatures {
    pub fn new(km: f64, min: f64, hour: i32, day: i32) -> Self {
        Self { km, min, hour, day }
    }

    /// Check field invariants. Out-of-range values are rejected, never clamped.
    pub fn validate(&self) -> FareResult<()> {
        if !self.km.is_finite() {
            return Err(FareError::malformed("km", format!("must be finite, got {}", self.km)));
        }
        if !self.min.is_finite() {
            return Err(FareError::malformed("min", format!("must be finite, got {}", self.min)));
        }
        if !(0..=23).contains(&self.hour) {
            return Err(FareError::malformed(
                "hour",
                format!("must be in 0..=23, got {}", self.hour),
            ));
        }
        if !(0..=6).contains(&self.day) {
            return Err(FareError::malformed(
                "day",
                format!("must be in 0..=6, got {}", self.day),
            ));
        }
        Ok(())
    }

    /// Field values in encoding order
    pub fn values(&self) -> [f64; NUM_FEATURES] {
        [self.km, self.min, self.hour as f64, self.day as f64]
    }
}

/// Standardized feature vector, always derived from [`RawFeatures`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EncodedFeatures(pub [f64; NUM_FEATURES]);

impl EncodedFeatures {
    pub fn values(&self) -> &[f64; NUM_FEATURES] {
        &self.0
    }
}

/// Parse a day of week given as a name ("Monday", "tue") or a number (0-6).
///
/// Monday maps to 0, matching the encoding used for training.
pub fn parse_day_of_week(input: &str) -> FareResult<i32> {
    let trimmed = input.trim();
    if let Ok(n) = trimmed.parse::<i32>() {
        if (0..=6).contains(&n) {
            return Ok(n);
        }
        return Err(FareError::malformed("day", format!("must be in 0..=6, got {}", n)));
    }
    trimmed
        .parse::<Weekday>()
        .map(|d| d.num_days_from_monday() as i32)
        .map_err(|_| FareError::malformed("day", format!("unknown day of week '{}'", trimmed)))
}

/// Display name for a day index, Monday = 0
pub fn day_name(day: i32) -> Option<&'static str> {
    const NAMES: [&str; 7] = [
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
        "Sunday",
    ];
    usize::try_from(day).ok().and_then(|d| NAMES.get(d).copied())
}
