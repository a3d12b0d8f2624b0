//! Adjacency construction and repair.
//!
//! Raw graphs arrive either as adjacency lists (possibly listing an edge in
//! one direction only) or as a sparse matrix. Two symmetrization rules exist
//! because the two source formats differ:
//!
//! | Rule | Formula | Reciprocal pair (2, 5) becomes |
//! |------|---------|-------------------------------|
//! | [`symmetrize_max`] | `A + Aᵗ∘(Aᵗ>A) − A∘(Aᵗ>A)` | (5, 5) |
//! | [`symmetrize_sum_with_self_loops`] | `A + Aᵗ + I` | (7, 7) |
//!
//! The max rule never double counts an edge that is listed from both ends.

use crate::{CsrMatrix, Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Build an `n × n` adjacency from node → neighbor lists.
///
/// Every listed pair becomes a directed entry of weight 1; a neighbor listed
/// twice still yields weight 1. Nodes that appear nowhere keep empty rows.
pub fn adjacency_from_lists(lists: &BTreeMap<usize, Vec<usize>>, n: usize) -> Result<CsrMatrix> {
    let mut pairs = BTreeSet::new();
    for (&u, neighbors) in lists {
        if u >= n {
            return Err(Error::IndexOutOfBounds { index: u, bound: n });
        }
        for &v in neighbors {
            if v >= n {
                return Err(Error::IndexOutOfBounds { index: v, bound: n });
            }
            pairs.insert((u, v));
        }
    }
    let triplets: Vec<_> = pairs.into_iter().map(|(u, v)| (u, v, 1.0)).collect();
    debug!(nodes = n, entries = triplets.len(), "built adjacency from lists");
    CsrMatrix::from_triplets((n, n), &triplets)
}

fn require_square(a: &CsrMatrix, op: &'static str) -> Result<()> {
    if a.nrows() != a.ncols() {
        return Err(Error::ShapeMismatch {
            op,
            left: a.shape(),
            right: (a.ncols(), a.nrows()),
        });
    }
    Ok(())
}

/// Symmetrize keeping the larger weight of each directed pair.
pub fn symmetrize_max(a: &CsrMatrix) -> Result<CsrMatrix> {
    require_square(a, "symmetrize_max")?;
    let at = a.transpose();
    let mask = at.mask_greater(a)?;
    // Subtract first so masked entries cancel to an exact zero before the
    // transpose weight is added back.
    a.sub(&a.multiply_elementwise(&mask)?)?
        .add(&at.multiply_elementwise(&mask)?)
}

/// Symmetrize by summing with the transpose, then add self-loops.
///
/// Only valid for sources that never list an edge from both ends.
pub fn symmetrize_sum_with_self_loops(a: &CsrMatrix) -> Result<CsrMatrix> {
    require_square(a, "symmetrize_sum_with_self_loops")?;
    a.add(&a.transpose())?.add(&CsrMatrix::identity(a.nrows()))
}

/// Adjacency restricted to `nodes` on both axes, in the order given.
///
/// `out[i][j] == a[nodes[i]][nodes[j]]`. Used to build the training-only
/// graph so that propagation cannot reach held-out nodes.
pub fn induced_subgraph(a: &CsrMatrix, nodes: &[usize]) -> Result<CsrMatrix> {
    require_square(a, "induced_subgraph")?;
    a.select(nodes)
}

/// Number of undirected edges in a symmetric adjacency, self-loops excluded.
pub fn undirected_edge_count(a: &CsrMatrix) -> usize {
    a.iter().filter(|&(r, c, _)| r < c).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_dedupe_and_bounds() {
        let mut lists = BTreeMap::new();
        lists.insert(0, vec![1, 1, 2]);
        lists.insert(2, vec![0]);
        let a = adjacency_from_lists(&lists, 4).unwrap();
        assert_eq!(a.shape(), (4, 4));
        assert_eq!(a.get(0, 1), 1.0);
        assert_eq!(a.get(1, 0), 0.0);
        assert_eq!(a.nnz(), 3);

        lists.insert(3, vec![7]);
        assert_eq!(
            adjacency_from_lists(&lists, 4),
            Err(Error::IndexOutOfBounds { index: 7, bound: 4 })
        );
    }

    #[test]
    fn test_symmetrize_max_keeps_larger_weight() {
        let a = CsrMatrix::from_triplets((2, 2), &[(0, 1, 2.0), (1, 0, 5.0)]).unwrap();
        let s = symmetrize_max(&a).unwrap();
        assert_eq!(s.get(0, 1), 5.0);
        assert_eq!(s.get(1, 0), 5.0);
    }

    #[test]
    fn test_symmetrize_max_fills_missing_direction() {
        let a = CsrMatrix::from_triplets((3, 3), &[(0, 2, 3.0)]).unwrap();
        let s = symmetrize_max(&a).unwrap();
        assert_eq!(s.get(2, 0), 3.0);
        assert_eq!(s.get(0, 2), 3.0);
        assert!(s.is_symmetric(0.0));
        assert_eq!(s.diagonal(), vec![0.0; 3]);
    }

    #[test]
    fn test_symmetrize_sum_adds_self_loops() {
        let a = CsrMatrix::from_triplets((3, 3), &[(0, 1, 1.0)]).unwrap();
        let s = symmetrize_sum_with_self_loops(&a).unwrap();
        assert_eq!(s.get(0, 1), 1.0);
        assert_eq!(s.get(1, 0), 1.0);
        assert!(s.diagonal().iter().all(|&d| d >= 1.0));
    }

    #[test]
    fn test_non_square_rejected() {
        let a = CsrMatrix::zeros(2, 3);
        assert!(symmetrize_max(&a).is_err());
        assert!(symmetrize_sum_with_self_loops(&a).is_err());
        assert!(induced_subgraph(&a, &[0]).is_err());
    }

    #[test]
    fn test_edge_count() {
        let a = CsrMatrix::from_triplets((3, 3), &[(0, 1, 1.0), (1, 2, 1.0)]).unwrap();
        let s = symmetrize_sum_with_self_loops(&a).unwrap();
        assert_eq!(undirected_edge_count(&s), 2);
    }
}
