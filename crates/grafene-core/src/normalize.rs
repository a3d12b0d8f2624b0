//! Adjacency normalization and the normalizer registry.
//!
//! A normalizer turns a (symmetric) adjacency matrix into the
//! [`PropagationOperator`] used for feature smoothing and graph convolution.
//!
//! | Scheme | Operator | Symmetric |
//! |--------|----------|-----------|
//! | `AugNormAdj` | D'^(-1/2) (A + I) D'^(-1/2), D' = deg(A + I) | yes |
//! | `NormAdj` | D^(-1/2) A D^(-1/2) | yes |
//! | `AugRWalk` | D'^(-1) (A + I) | no |
//!
//! Degrees of zero never produce `NaN` or `Inf`: the inverse is masked to
//! zero, which leaves the corresponding row and column empty.
//!
//! # Example
//!
//! ```rust
//! use grafene_core::{CsrMatrix, NormalizerRegistry};
//!
//! let adj = CsrMatrix::from_triplets((2, 2), &[(0, 1, 1.0), (1, 0, 1.0)])?;
//! let registry = NormalizerRegistry::with_defaults();
//! let op = registry.get("AugNormAdj")?.normalize(&adj)?;
//! assert!((op.matrix().get(0, 1) - 0.5).abs() < 1e-6);
//! # Ok::<(), grafene_core::Error>(())
//! ```

use crate::{CsrMatrix, DiagonalSide, Error, Result};
use ndarray::{Array2, ArrayView2};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name of the scheme used when none is configured.
pub const DEFAULT_SCHEME: &str = "AugNormAdj";

/// Normalized adjacency, fixed once built.
///
/// Shared read-only between propagation and every training epoch; wrap in
/// an `Arc` to hand it to several consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationOperator {
    matrix: CsrMatrix,
    scheme: String,
}

impl PropagationOperator {
    pub fn new(matrix: CsrMatrix, scheme: impl Into<String>) -> Self {
        Self {
            matrix,
            scheme: scheme.into(),
        }
    }

    pub fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    /// Registry name of the scheme that produced this operator.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Number of nodes the operator acts on.
    pub fn num_nodes(&self) -> usize {
        self.matrix.nrows()
    }

    /// One propagation step: `operator × features`.
    pub fn apply(&self, features: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        self.matrix.multiply_dense(features)
    }
}

/// Strategy that normalizes an adjacency matrix.
pub trait AdjacencyNormalizer: Send + Sync {
    /// Registry key.
    fn name(&self) -> &'static str;

    /// Normalized matrix for `adj`.
    fn normalize_matrix(&self, adj: &CsrMatrix) -> Result<CsrMatrix>;

    /// Normalize and wrap as an operator tagged with this scheme.
    fn normalize(&self, adj: &CsrMatrix) -> Result<PropagationOperator> {
        Ok(PropagationOperator::new(self.normalize_matrix(adj)?, self.name()))
    }
}

fn masked_inverse(x: f32, exponent: f32) -> f32 {
    if x > 0.0 {
        let inv = x.powf(exponent);
        if inv.is_finite() {
            return inv;
        }
    }
    0.0
}

fn require_square(adj: &CsrMatrix, op: &'static str) -> Result<()> {
    if adj.nrows() == adj.ncols() {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            op,
            left: adj.shape(),
            right: (adj.ncols(), adj.nrows()),
        })
    }
}

/// D^(-1/2) · A · D^(-1/2) with zero-guarded degrees.
fn symmetric_normalize(adj: &CsrMatrix) -> Result<CsrMatrix> {
    let d_inv_sqrt: Vec<f32> = adj
        .row_sums()
        .into_iter()
        .map(|d| masked_inverse(d, -0.5))
        .collect();
    adj.scale_by_diagonal(&d_inv_sqrt, DiagonalSide::Left)?
        .scale_by_diagonal(&d_inv_sqrt, DiagonalSide::Right)
}

/// `D'^(-1/2) (A + I) D'^(-1/2)`, the renormalization trick of GCN/SGC.
pub fn aug_normalized_adjacency(adj: &CsrMatrix) -> Result<CsrMatrix> {
    require_square(adj, "aug_normalized_adjacency")?;
    symmetric_normalize(&adj.add(&CsrMatrix::identity(adj.nrows()))?)
}

/// `D^(-1/2) A D^(-1/2)` without self-loops.
pub fn normalized_adjacency(adj: &CsrMatrix) -> Result<CsrMatrix> {
    require_square(adj, "normalized_adjacency")?;
    symmetric_normalize(adj)
}

/// `D'^(-1) (A + I)`, the random-walk transition matrix with self-loops.
pub fn aug_random_walk(adj: &CsrMatrix) -> Result<CsrMatrix> {
    require_square(adj, "aug_random_walk")?;
    let augmented = adj.add(&CsrMatrix::identity(adj.nrows()))?;
    row_normalize(&augmented)
}

/// Scale every row to sum to one. All-zero rows stay all-zero.
pub fn row_normalize(m: &CsrMatrix) -> Result<CsrMatrix> {
    let r_inv: Vec<f32> = m
        .row_sums()
        .into_iter()
        .map(|s| {
            let inv = 1.0 / s;
            if inv.is_finite() {
                inv
            } else {
                0.0
            }
        })
        .collect();
    m.scale_by_diagonal(&r_inv, DiagonalSide::Left)
}

/// `AugNormAdj` scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct AugNormAdj;

impl AdjacencyNormalizer for AugNormAdj {
    fn name(&self) -> &'static str {
        "AugNormAdj"
    }

    fn normalize_matrix(&self, adj: &CsrMatrix) -> Result<CsrMatrix> {
        aug_normalized_adjacency(adj)
    }
}

/// `NormAdj` scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormAdj;

impl AdjacencyNormalizer for NormAdj {
    fn name(&self) -> &'static str {
        "NormAdj"
    }

    fn normalize_matrix(&self, adj: &CsrMatrix) -> Result<CsrMatrix> {
        normalized_adjacency(adj)
    }
}

/// `AugRWalk` scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct AugRWalk;

impl AdjacencyNormalizer for AugRWalk {
    fn name(&self) -> &'static str {
        "AugRWalk"
    }

    fn normalize_matrix(&self, adj: &CsrMatrix) -> Result<CsrMatrix> {
        aug_random_walk(adj)
    }
}

/// Name → normalizer lookup.
///
/// Call sites resolve a scheme by name once, at construction time, and keep
/// the returned handle. New schemes are added with [`register`](Self::register).
#[derive(Clone)]
pub struct NormalizerRegistry {
    entries: BTreeMap<&'static str, Arc<dyn AdjacencyNormalizer>>,
}

impl std::fmt::Debug for NormalizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizerRegistry")
            .field("schemes", &self.names())
            .finish()
    }
}

impl Default for NormalizerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl NormalizerRegistry {
    /// Registry with no schemes.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registry holding every built-in scheme.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(AugNormAdj));
        registry.register(Arc::new(NormAdj));
        registry.register(Arc::new(AugRWalk));
        registry
    }

    /// Add or replace a scheme; returns the one it replaced.
    pub fn register(
        &mut self,
        normalizer: Arc<dyn AdjacencyNormalizer>,
    ) -> Option<Arc<dyn AdjacencyNormalizer>> {
        self.entries.insert(normalizer.name(), normalizer)
    }

    /// Look up a scheme by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn AdjacencyNormalizer>> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownNormalizationScheme(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path3() -> CsrMatrix {
        CsrMatrix::from_triplets(
            (3, 3),
            &[(0, 1, 1.0), (1, 0, 1.0), (1, 2, 1.0), (2, 1, 1.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_aug_norm_adj_values() {
        // Degrees with self-loops: [2, 3, 2].
        let op = aug_normalized_adjacency(&path3()).unwrap();
        assert!((op.get(0, 0) - 0.5).abs() < 1e-6);
        assert!((op.get(1, 1) - 1.0 / 3.0).abs() < 1e-6);
        assert!((op.get(0, 1) - 1.0 / 6.0f32.sqrt()).abs() < 1e-6);
        assert!(op.is_symmetric(1e-6));
    }

    #[test]
    fn test_aug_norm_adj_isolated_node_has_unit_diagonal() {
        let adj = CsrMatrix::zeros(3, 3);
        let op = aug_normalized_adjacency(&adj).unwrap();
        assert_eq!(op.diagonal(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_norm_adj_zero_degree_is_masked() {
        let adj = CsrMatrix::from_triplets((3, 3), &[(0, 1, 1.0), (1, 0, 1.0)]).unwrap();
        let op = normalized_adjacency(&adj).unwrap();
        assert!(!op.has_non_finite());
        assert_eq!(op.row(2).count(), 0);
        assert!((op.get(0, 1) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_aug_rwalk_rows_sum_to_one() {
        let op = aug_random_walk(&path3()).unwrap();
        for s in op.row_sums() {
            assert!((s - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_row_normalize_keeps_zero_rows() {
        let m = CsrMatrix::from_triplets((3, 2), &[(0, 0, 1.0), (0, 1, 3.0), (2, 1, 2.0)]).unwrap();
        let n = row_normalize(&m).unwrap();
        assert_eq!(n.get(0, 0), 0.25);
        assert_eq!(n.get(0, 1), 0.75);
        assert_eq!(n.row(1).count(), 0);
        assert_eq!(n.get(2, 1), 1.0);
        assert!(!n.has_non_finite());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = NormalizerRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["AugNormAdj", "AugRWalk", "NormAdj"]);
        assert_eq!(registry.get("AugNormAdj").unwrap().name(), "AugNormAdj");

        let err = registry.get("FirstOrderGCN").err().unwrap();
        assert_eq!(err, Error::UnknownNormalizationScheme("FirstOrderGCN".into()));
    }

    struct Identity;

    impl AdjacencyNormalizer for Identity {
        fn name(&self) -> &'static str {
            "Identity"
        }

        fn normalize_matrix(&self, adj: &CsrMatrix) -> Result<CsrMatrix> {
            Ok(CsrMatrix::identity(adj.nrows()))
        }
    }

    #[test]
    fn test_registry_accepts_custom_scheme() {
        let mut registry = NormalizerRegistry::with_defaults();
        assert!(registry.register(Arc::new(Identity)).is_none());

        let op = registry.get("Identity").unwrap().normalize(&path3()).unwrap();
        assert_eq!(op.scheme(), "Identity");
        assert_eq!(op.matrix(), &CsrMatrix::identity(3));
    }

    #[test]
    fn test_non_square_adjacency_rejected() {
        let adj = CsrMatrix::zeros(2, 3);
        assert!(matches!(
            AugNormAdj.normalize(&adj),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
