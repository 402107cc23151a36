//! Observability for the fare service
//!
//! Provides:
//! - Prometheus metrics (prediction/training latency, request counters, examples seen)
//! - Structured JSON logging with tracing

use crate::models::RawFeatures;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_gauge, GaugeVec,
    Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for in-memory model operations (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.000_001, 0.000_005, 0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<FareMetricsInner> = OnceLock::new();

struct FareMetricsInner {
    prediction_latency_seconds: Histogram,
    training_latency_seconds: Histogram,
    predictions_total: IntCounter,
    training_examples_total: IntCounter,
    malformed_inputs_total: IntCounter,
    comparisons_skipped_total: IntCounter,
    examples_seen: IntGauge,
    model_format_info: GaugeVec,
}

impl FareMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "fare_prediction_latency_seconds",
                "Time spent encoding features and computing a fare estimate",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            training_latency_seconds: register_histogram!(
                "fare_training_latency_seconds",
                "Time spent applying one training example, lock wait included",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register training_latency_seconds"),

            predictions_total: register_int_counter!(
                "fare_predictions_total",
                "Total number of fare estimates served"
            )
            .expect("Failed to register predictions_total"),

            training_examples_total: register_int_counter!(
                "fare_training_examples_total",
                "Total number of training examples applied by this process"
            )
            .expect("Failed to register training_examples_total"),

            malformed_inputs_total: register_int_counter!(
                "fare_malformed_inputs_total",
                "Total number of requests rejected for malformed trip fields"
            )
            .expect("Failed to register malformed_inputs_total"),

            comparisons_skipped_total: register_int_counter!(
                "fare_comparisons_skipped_total",
                "Estimates served without a historical comparison"
            )
            .expect("Failed to register comparisons_skipped_total"),

            examples_seen: register_int_gauge!(
                "fare_model_examples_seen",
                "Training examples reflected in the serving model"
            )
            .expect("Failed to register examples_seen"),

            model_format_info: register_gauge_vec!(
                "fare_model_format_info",
                "Artifact format version of the serving model",
                &["format_version"]
            )
            .expect("Failed to register model_format_info"),
        }
    }
}

/// Lightweight handle to the global fare metrics.
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct FareMetrics {
    _private: (),
}

impl Default for FareMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl FareMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(FareMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &FareMetricsInner {
        GLOBAL_METRICS.get_or_init(FareMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
        self.inner().predictions_total.inc();
    }

    pub fn observe_training_latency(&self, duration_secs: f64) {
        self.inner().training_latency_seconds.observe(duration_secs);
        self.inner().training_examples_total.inc();
    }

    pub fn inc_malformed_inputs(&self) {
        self.inner().malformed_inputs_total.inc();
    }

    pub fn inc_comparisons_skipped(&self) {
        self.inner().comparisons_skipped_total.inc();
    }

    pub fn set_examples_seen(&self, count: u64) {
        self.inner()
            .examples_seen
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    pub fn set_model_format(&self, format_version: u32) {
        let version = format_version.to_string();
        self.inner().model_format_info.reset();
        self.inner()
            .model_format_info
            .with_label_values(&[version.as_str()])
            .set(1.0);
    }
}

/// Structured logger for fare service events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_prediction(&self, trip: &RawFeatures, estimate: f64, historical_avg: Option<f64>) {
        info!(
            event = "fare_predicted",
            instance = %self.instance,
            km = trip.km,
            min = trip.min,
            hour = trip.hour,
            day = trip.day,
            estimate = estimate,
            historical_avg = ?historical_avg,
            "Estimated fare"
        );
    }

    pub fn log_training(&self, error: f64, examples_seen: u64) {
        info!(
            event = "model_trained",
            instance = %self.instance,
            error = error,
            examples_seen = examples_seen,
            "Applied training example"
        );
    }

    pub fn log_rejected_input(&self, operation: &str, reason: &str) {
        warn!(
            event = "input_rejected",
            instance = %self.instance,
            operation = %operation,
            reason = %reason,
            "Rejected malformed trip"
        );
    }

    pub fn log_model_loaded(&self, path: &str, examples_seen: u64, format_version: u32) {
        info!(
            event = "model_loaded",
            instance = %self.instance,
            path = %path,
            examples_seen = examples_seen,
            format_version = format_version,
            "Fare model loaded"
        );
    }

    pub fn log_model_reloaded(&self, path: &str, examples_seen: u64) {
        info!(
            event = "model_reloaded",
            instance = %self.instance,
            path = %path,
            examples_seen = examples_seen,
            "Fare model reloaded"
        );
    }

    pub fn log_model_reload_failed(&self, path: &str, error: &str) {
        warn!(
            event = "model_reload_failed",
            instance = %self.instance,
            path = %path,
            error = %error,
            "Fare model reload failed, keeping current state"
        );
    }

    pub fn log_model_saved(&self, path: &str, examples_seen: u64) {
        info!(
            event = "model_saved",
            instance = %self.instance,
            path = %path,
            examples_seen = examples_seen,
            "Fare model saved"
        );
    }

    pub fn log_statistics_unavailable(&self, reason: &str) {
        warn!(
            event = "statistics_unavailable",
            instance = %self.instance,
            reason = %reason,
            "Historical statistics unavailable, comparisons disabled"
        );
    }

    pub fn log_startup(&self, version: &str, examples_seen: u64) {
        info!(
            event = "server_started",
            instance = %self.instance,
            server_version = %version,
            examples_seen = examples_seen,
            "Fare server started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "server_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Fare server shutting down"
        );
    }
}
