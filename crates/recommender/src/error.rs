//! Error types for the recommendation engine

use thiserror::Error;

/// Failures raised by an [`InteractionStore`](crate::store::InteractionStore)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store query failed: {0}")]
    Query(String),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse seed data: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Numerical failures inside the truncated SVD
#[derive(Debug, Error, PartialEq)]
pub enum FactorizationError {
    #[error("Interaction matrix contains non-finite values")]
    NonFiniteInput,

    #[error("Eigen decomposition did not converge after {sweeps} sweeps")]
    NoConvergence { sweeps: usize },

    #[error("Reconstruction produced non-finite values")]
    NonFiniteOutput,
}

/// Top-level error for configuration and service wiring
#[derive(Debug, Error)]
pub enum RecommenderError {
    #[error("Configuration error: {message}")]
    Configuration { message: String, key: Option<String> },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RecommenderError {
    pub fn configuration(message: impl Into<String>, key: &str) -> Self {
        Self::Configuration {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}
