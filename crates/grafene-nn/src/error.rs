//! Error types for grafene-nn.

use thiserror::Error;

/// Error type for models, training and the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Candle tensor error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Matrix or normalization error.
    #[error(transparent)]
    Core(#[from] grafene_core::Error),

    /// Dataset loading error.
    #[error(transparent)]
    Data(#[from] grafene_data::Error),

    /// Model identifier not in the registry.
    #[error("unknown model kind: {0}")]
    UnknownModelKind(String),

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Training error.
    #[error("training error: {0}")]
    Training(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
