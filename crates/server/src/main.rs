//! Fare Server - taxi fare estimation service
//!
//! Loads the fare model once at startup, serves estimates next to the
//! historical averages, and applies training examples one at a time.

use anyhow::{Context, Result};
use fare_lib::{
    health::{components, HealthRegistry},
    ArtifactStore, FareMetrics, HistoricalStats, SharedModel, StructuredLogger,
    ARTIFACT_FORMAT_VERSION,
};
use fare_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting fare-server");

    let config = ServerConfig::load()?;
    info!(
        instance = %config.instance_name,
        artifact = %config.artifact_path.display(),
        training_enabled = config.training_enabled,
        "Server configured"
    );

    let health_registry = HealthRegistry::new();
    let metrics = FareMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);

    // Without a model there is nothing correct to serve
    let store = ArtifactStore::new(&config.artifact_path);
    let model = match store.load().and_then(SharedModel::from_artifact) {
        Ok(model) => model,
        Err(e) => {
            error!(
                path = %store.path().display(),
                error = %e,
                "Fare model unavailable, refusing to start"
            );
            return Err(e).context("Failed to load fare model");
        }
    };

    let examples_seen = model.examples_seen()?;
    metrics.set_examples_seen(examples_seen);
    metrics.set_model_format(ARTIFACT_FORMAT_VERSION);
    logger.log_model_loaded(
        &store.path().display().to_string(),
        examples_seen,
        ARTIFACT_FORMAT_VERSION,
    );
    health_registry.register(components::MODEL).await;

    let stats = HistoricalStats::load(&config.hourly_stats_path, &config.daily_stats_path);
    match stats.missing_reason() {
        Some(reason) => {
            logger.log_statistics_unavailable(&reason);
            health_registry
                .set_degraded(components::STATISTICS, reason)
                .await;
        }
        None => health_registry.register(components::STATISTICS).await,
    }

    let app_state = Arc::new(api::AppState {
        model,
        store,
        stats: Arc::new(stats),
        health_registry: health_registry.clone(),
        metrics,
        logger: logger.clone(),
        training_enabled: config.training_enabled,
    });

    health_registry.set_ready(true).await;
    logger.log_startup(SERVER_VERSION, examples_seen);

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            result.context("API server task failed")??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
