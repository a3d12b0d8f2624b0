//! Feature propagation (SGC precompute).
//!
//! Applies `X ← S · X` a fixed number of times. The operator is not
//! idempotent, so steps run strictly in sequence.

use crate::{PropagationOperator, Result};
use ndarray::Array2;
use std::time::{Duration, Instant};
use tracing::debug;

/// Smooth `features` with `degree` applications of `operator`.
///
/// Returns the propagated features and the wall-clock time spent.
/// `degree == 0` returns the input unchanged.
pub fn precompute(
    features: Array2<f32>,
    operator: &PropagationOperator,
    degree: usize,
) -> Result<(Array2<f32>, Duration)> {
    let start = Instant::now();
    let mut features = features;
    for step in 0..degree {
        features = operator.apply(features.view())?;
        debug!(step = step + 1, degree, "propagation step done");
    }
    let elapsed = start.elapsed();
    debug!(
        degree,
        nodes = operator.num_nodes(),
        elapsed_ms = elapsed.as_secs_f64() * 1e3,
        "precompute finished"
    );
    Ok((features, elapsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CsrMatrix, Error};
    use ndarray::array;

    fn swap_operator() -> PropagationOperator {
        let m = CsrMatrix::from_triplets((2, 2), &[(0, 1, 1.0), (1, 0, 1.0)]).unwrap();
        PropagationOperator::new(m, "swap")
    }

    #[test]
    fn test_degree_zero_is_identity() {
        let x = array![[1.0f32, 2.0], [3.0, 4.0]];
        let (out, _) = precompute(x.clone(), &swap_operator(), 0).unwrap();
        assert_eq!(out, x);
    }

    #[test]
    fn test_steps_apply_in_sequence() {
        let x = array![[1.0f32, 2.0], [3.0, 4.0]];
        let (one, _) = precompute(x.clone(), &swap_operator(), 1).unwrap();
        assert_eq!(one, array![[3.0f32, 4.0], [1.0, 2.0]]);
        let (two, _) = precompute(x.clone(), &swap_operator(), 2).unwrap();
        assert_eq!(two, x);
    }

    #[test]
    fn test_shape_mismatch_surfaces() {
        let x = array![[1.0f32], [2.0], [3.0]];
        let err = precompute(x, &swap_operator(), 1).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }
}
