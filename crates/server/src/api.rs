//! HTTP API for fare estimates, training, statistics, health and metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fare_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    predictor::ModelSummary,
    stats::{Dashboard, FareComparison},
    ArtifactStore, FareError, FareMetrics, HistoricalStats, RawFeatures, SharedModel,
    StructuredLogger,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub model: SharedModel,
    pub store: ArtifactStore,
    pub stats: Arc<HistoricalStats>,
    pub health_registry: HealthRegistry,
    pub metrics: FareMetrics,
    pub logger: StructuredLogger,
    pub training_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub estimate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<FareComparison>,
    /// Why the comparison is missing, when it is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub examples_seen: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainRequest {
    #[serde(flatten)]
    pub trip: RawFeatures,
    pub actual_fare: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResponse {
    pub error: f64,
    pub examples_seen: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStateResponse {
    pub path: String,
    pub examples_seen: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

/// Failure of an API request
#[derive(Debug)]
pub enum ApiError {
    Fare(FareError),
    TrainingDisabled,
}

impl From<FareError> for ApiError {
    fn from(err: FareError) -> Self {
        ApiError::Fare(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::TrainingDisabled => (
                StatusCode::FORBIDDEN,
                "training_disabled",
                "training is disabled on this server".to_string(),
            ),
            ApiError::Fare(err) => {
                let status = match &err {
                    FareError::MalformedInput { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    FareError::UninitializedModel(_) => StatusCode::SERVICE_UNAVAILABLE,
                    FareError::StatisticsUnavailable(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.kind(), err.to_string())
            }
        };

        let body = ErrorBody {
            error: message,
            kind: kind.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl AppState {
    fn reject(&self, operation: &str, err: FareError) -> ApiError {
        if matches!(err, FareError::MalformedInput { .. }) {
            self.metrics.inc_malformed_inputs();
            self.logger.log_rejected_input(operation, &err.to_string());
        }
        ApiError::Fare(err)
    }
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Json(trip): Json<RawFeatures>,
) -> Result<Json<PredictResponse>, ApiError> {
    let start = Instant::now();
    let estimate = state
        .model
        .predict(&trip)
        .map_err(|e| state.reject("predict", e))?;
    state
        .metrics
        .observe_prediction_latency(start.elapsed().as_secs_f64());

    let (comparison, warning) = match state.stats.compare(estimate, trip.hour) {
        Ok(comparison) => (Some(comparison), None),
        Err(e) => {
            state.metrics.inc_comparisons_skipped();
            (None, Some(e.to_string()))
        }
    };

    state
        .logger
        .log_prediction(&trip, estimate, comparison.map(|c| c.historical_avg));

    Ok(Json(PredictResponse {
        estimate,
        comparison,
        warning,
        examples_seen: state.model.examples_seen()?,
    }))
}

async fn train(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TrainRequest>,
) -> Result<Json<TrainResponse>, ApiError> {
    if !state.training_enabled {
        return Err(ApiError::TrainingDisabled);
    }

    let start = Instant::now();
    let outcome = state
        .model
        .train(&request.trip, request.actual_fare)
        .map_err(|e| state.reject("train", e))?;
    state
        .metrics
        .observe_training_latency(start.elapsed().as_secs_f64());
    state.metrics.set_examples_seen(outcome.examples_seen);
    state.logger.log_training(outcome.error, outcome.examples_seen);

    Ok(Json(TrainResponse {
        error: outcome.error,
        examples_seen: outcome.examples_seen,
    }))
}

async fn dashboard(State(state): State<Arc<AppState>>) -> Result<Json<Dashboard>, ApiError> {
    Ok(Json(state.stats.dashboard()?))
}

async fn model_summary(State(state): State<Arc<AppState>>) -> Result<Json<ModelSummary>, ApiError> {
    Ok(Json(state.model.summary()?))
}

async fn save_model(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ModelStateResponse>, ApiError> {
    let artifact = state.model.snapshot()?;
    let examples_seen = artifact.weights.updates;

    // fsync and rename stay off the async workers
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || store.save(&artifact))
        .await
        .map_err(|e| FareError::Io(std::io::Error::other(e)))??;

    let path = state.store.path().display().to_string();
    state.logger.log_model_saved(&path, examples_seen);
    Ok(Json(ModelStateResponse {
        path,
        examples_seen,
    }))
}

async fn reload_model(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ModelStateResponse>, ApiError> {
    let path = state.store.path().display().to_string();

    let store = state.store.clone();
    let result = tokio::task::spawn_blocking(move || store.load())
        .await
        .map_err(|e| FareError::Io(std::io::Error::other(e)))?
        .and_then(|artifact| state.model.reload(artifact));

    match result {
        Ok(examples_seen) => {
            state.metrics.set_examples_seen(examples_seen);
            state.health_registry.set_healthy(components::MODEL).await;
            state.logger.log_model_reloaded(&path, examples_seen);
            Ok(Json(ModelStateResponse {
                path,
                examples_seen,
            }))
        }
        Err(e) => {
            state.logger.log_model_reload_failed(&path, &e.to_string());
            Err(e.into())
        }
    }
}

/// Health check response - 200 while operational, 503 when unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/predict", post(predict))
        .route("/api/v1/train", post(train))
        .route("/api/v1/dashboard", get(dashboard))
        .route("/api/v1/model", get(model_summary))
        .route("/api/v1/model/save", post(save_model))
        .route("/api/v1/model/reload", post(reload_model))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting fare API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
