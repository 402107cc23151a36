//! Server configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Fare server configuration
///
/// Read from an optional file named by `FARE_CONFIG`, then from `FARE_*`
/// environment variables. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Instance name attached to structured log records
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Port for the fare API, health and metrics endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Model artifact loaded at startup and written by `model/save`
    #[serde(default = "default_artifact_path")]
    pub artifact_path: PathBuf,

    /// CSV with `Hour,Avg_Fare` columns
    #[serde(default = "default_hourly_stats_path")]
    pub hourly_stats_path: PathBuf,

    /// CSV with `Day,Total_Trips` columns
    #[serde(default = "default_daily_stats_path")]
    pub daily_stats_path: PathBuf,

    /// Accept training examples over the API
    #[serde(default = "default_training_enabled")]
    pub training_enabled: bool,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "fare-server".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_artifact_path() -> PathBuf {
    PathBuf::from("model/fare_model.json")
}

fn default_hourly_stats_path() -> PathBuf {
    PathBuf::from("gold/gold_stats_hour.csv")
}

fn default_daily_stats_path() -> PathBuf {
    PathBuf::from("gold/gold_stats_day.csv")
}

fn default_training_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            artifact_path: default_artifact_path(),
            hourly_stats_path: default_hourly_stats_path(),
            daily_stats_path: default_daily_stats_path(),
            training_enabled: default_training_enabled(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the optional config file and environment
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Ok(path) = std::env::var("FARE_CONFIG") {
            builder = builder.add_source(config::File::with_name(&path));
        }

        let config = builder
            .add_source(config::Environment::with_prefix("FARE").try_parsing(true))
            .build()
            .context("Failed to read fare server configuration")?;

        config
            .try_deserialize()
            .context("Invalid fare server configuration")
    }
}
