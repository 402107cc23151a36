//! Fare estimation library
//!
//! This crate provides the core functionality for:
//! - Streaming feature standardization and online linear regression
//! - Versioned model artifact persistence
//! - Historical fare and trip statistics for comparison
//! - Health checks and observability

pub mod artifact;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod stats;

pub use artifact::{ArtifactStore, ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use error::{FareError, FareResult};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{FareMetrics, StructuredLogger};
pub use predictor::{FarePipeline, Predictor, RegressorConfig, SharedModel};
pub use stats::{Dashboard, FareComparison, HistoricalStats, Kpis};
