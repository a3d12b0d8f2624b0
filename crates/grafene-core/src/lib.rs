// Allow minor clippy style warnings at crate level
// These are mostly style preferences, not bugs
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::uninlined_format_args)]

//! Graph preprocessing for node classification.
//!
//! This crate turns a raw adjacency matrix and feature matrix into the inputs
//! a graph convolutional model consumes:
//!
//! - [`CooMatrix`] / [`CsrMatrix`] - Owned sparse matrices
//! - [`graph`] - Adjacency construction and symmetrization rules
//! - [`normalize`] - Normalization schemes, [`PropagationOperator`], registry
//! - [`propagate`] - Repeated sparse propagation of features (SGC precompute)
//!
//! # Pipeline
//!
//! ```text
//! adjacency lists ──► symmetrize ──► A ──► normalize ──► S = D'^-1/2 (A+I) D'^-1/2
//!                                                          │
//! features ──► row_normalize ──► X ─────────────────────► S^K X
//! ```
//!
//! # Example
//!
//! ```rust
//! use grafene_core::{graph, normalize, propagate, AdjacencyNormalizer, CsrMatrix};
//! use ndarray::Array2;
//!
//! // Path graph 0 - 1 - 2, listed in one direction only.
//! let raw = CsrMatrix::from_triplets((3, 3), &[(0, 1, 1.0), (1, 2, 1.0)])?;
//! let adj = graph::symmetrize_max(&raw)?;
//! let op = normalize::AugNormAdj.normalize(&adj)?;
//!
//! let x = Array2::<f32>::ones((3, 4));
//! let (smoothed, _elapsed) = propagate::precompute(x, &op, 2)?;
//! assert_eq!(smoothed.dim(), (3, 4));
//! # Ok::<(), grafene_core::Error>(())
//! ```

pub mod error;
pub mod graph;
pub mod normalize;
pub mod propagate;
pub mod sparse;

pub use error::{Error, Result};
pub use normalize::{
    row_normalize, AdjacencyNormalizer, NormalizerRegistry, PropagationOperator, DEFAULT_SCHEME,
};
pub use propagate::precompute;
pub use sparse::{CooMatrix, CsrMatrix, DiagonalSide};
