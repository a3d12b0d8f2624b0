//! Error types for grafene-data.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for dataset loading.
#[derive(Error, Debug)]
pub enum Error {
    /// Matrix or index error from the preprocessing layer.
    #[error(transparent)]
    Core(#[from] grafene_core::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required artifact file does not exist.
    #[error("missing artifact: {}", .0.display())]
    MissingArtifact(PathBuf),

    /// A line of a plain-text index file is not a node id.
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// An artifact parsed but is structurally invalid.
    #[error("invalid artifact: {0}")]
    Format(String),

    /// Dataset identifier not recognized.
    #[error("unknown dataset: {0}")]
    UnknownDataset(String),

    /// Train/validation/test partitions cannot be built.
    #[error("invalid partition: {0}")]
    InvalidPartition(String),

    /// A node that must carry a label has none.
    #[error("node {0} has no label")]
    Unlabeled(usize),
}

/// Result type for grafene-data operations.
pub type Result<T> = std::result::Result<T, Error>;
