//! Error taxonomy for the fare estimator core

use thiserror::Error;

/// Errors surfaced by the fare model and its collaborators
#[derive(Debug, Error)]
pub enum FareError {
    /// A trip field violates its range or finiteness invariant
    #[error("malformed input: {field} {reason}")]
    MalformedInput { field: &'static str, reason: String },

    /// The model artifact is absent, corrupt or of an unsupported format
    #[error("model not initialized: {0}")]
    UninitializedModel(String),

    /// Historical aggregate tables are missing or empty
    #[error("historical statistics unavailable: {0}")]
    StatisticsUnavailable(String),

    /// Rejected model hyperparameters
    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FareError {
    pub(crate) fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        FareError::MalformedInput {
            field,
            reason: reason.into(),
        }
    }

    /// Short machine-readable kind, used in API error bodies and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            FareError::MalformedInput { .. } => "malformed_input",
            FareError::UninitializedModel(_) => "uninitialized_model",
            FareError::StatisticsUnavailable(_) => "statistics_unavailable",
            FareError::InvalidConfig(_) => "invalid_config",
            FareError::Io(_) => "io",
            FareError::Serialization(_) => "serialization",
        }
    }

    /// Whether the caller may sensibly retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, FareError::Io(_))
    }
}

pub type FareResult<T> = std::result::Result<T, FareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_input_message() {
        let err = FareError::malformed("hour", "must be in 0..=23, got 24");
        assert_eq!(err.to_string(), "malformed input: hour must be in 0..=23, got 24");
        assert_eq!(err.kind(), "malformed_input");
    }

    #[test]
    fn test_uninitialized_model_not_retryable() {
        let err = FareError::UninitializedModel("artifact missing".to_string());
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), "uninitialized_model");
    }
}
