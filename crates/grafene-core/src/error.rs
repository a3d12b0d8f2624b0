//! Error types for grafene-core.

use thiserror::Error;

/// Error type for sparse matrix and normalization operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Operand dimensions disagree.
    #[error("shape mismatch in {op}: {left:?} vs {right:?}")]
    ShapeMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    /// A row, column or node index fell outside its dimension.
    #[error("index {index} out of bounds for dimension {bound}")]
    IndexOutOfBounds { index: usize, bound: usize },

    /// No normalizer is registered under this name.
    #[error("unknown normalization scheme: {0}")]
    UnknownNormalizationScheme(String),

    /// Structurally invalid input (ragged triplets, non-square adjacency, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for grafene-core operations.
pub type Result<T> = std::result::Result<T, Error>;
