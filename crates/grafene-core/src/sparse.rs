//! Owned sparse matrices in coordinate (COO) and compressed-row (CSR) form.
//!
//! COO is the construction format: triplets can be pushed in any order and
//! duplicates are allowed. CSR is the compute format: every arithmetic
//! operation, normalization and propagation step works on [`CsrMatrix`].
//!
//! ```text
//! COO: (row, col, value) triplets          CSR: indptr  [0, 2, 3, 5]
//!      (0,1,1.0) (0,2,2.0) (1,0,3.0)            indices [1, 2, 0, 1, 2]
//!      (2,1,4.0) (2,2,5.0)                      data    [1, 2, 3, 4, 5]
//! ```
//!
//! # CSR invariants
//!
//! - `indptr.len() == nrows + 1`, `indptr[0] == 0`, non-decreasing
//! - column indices are strictly increasing within a row
//!
//! Index arithmetic is `usize` throughout (64-bit on every supported target),
//! values are `f32`. Row sums accumulate in `f64` before narrowing.

use crate::{Error, Result};
use ndarray::{Array2, ArrayView2, ArrayViewMut1, Zip};

/// Which side a diagonal matrix multiplies from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagonalSide {
    /// `diag(v) · M`: scales row `i` by `v[i]`.
    Left,
    /// `M · diag(v)`: scales column `j` by `v[j]`.
    Right,
}

/// Sparse matrix as unordered `(row, col, value)` triplets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CooMatrix {
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f32>,
}

impl CooMatrix {
    /// Empty matrix of the given shape.
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            ..Self::default()
        }
    }

    /// Build from parallel triplet arrays.
    ///
    /// Fails with [`Error::InvalidInput`] on ragged arrays and with
    /// [`Error::IndexOutOfBounds`] on indices outside the shape.
    pub fn from_triplets(
        shape: (usize, usize),
        rows: Vec<usize>,
        cols: Vec<usize>,
        values: Vec<f32>,
    ) -> Result<Self> {
        if rows.len() != cols.len() || rows.len() != values.len() {
            return Err(Error::InvalidInput(format!(
                "triplet arrays differ in length: rows={}, cols={}, values={}",
                rows.len(),
                cols.len(),
                values.len()
            )));
        }
        let (nrows, ncols) = shape;
        if let Some(&r) = rows.iter().find(|&&r| r >= nrows) {
            return Err(Error::IndexOutOfBounds { index: r, bound: nrows });
        }
        if let Some(&c) = cols.iter().find(|&&c| c >= ncols) {
            return Err(Error::IndexOutOfBounds { index: c, bound: ncols });
        }
        Ok(Self {
            nrows,
            ncols,
            rows,
            cols,
            values,
        })
    }

    /// Append one entry. Duplicates are summed on conversion to CSR.
    pub fn push(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        if row >= self.nrows {
            return Err(Error::IndexOutOfBounds {
                index: row,
                bound: self.nrows,
            });
        }
        if col >= self.ncols {
            return Err(Error::IndexOutOfBounds {
                index: col,
                bound: self.ncols,
            });
        }
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(value);
        Ok(())
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Number of stored triplets (duplicates counted separately).
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.rows
            .iter()
            .zip(&self.cols)
            .zip(&self.values)
            .map(|((&r, &c), &v)| (r, c, v))
    }

    /// Convert to CSR, summing duplicate coordinates and dropping exact zeros.
    pub fn to_csr(&self) -> CsrMatrix {
        let mut starts = vec![0usize; self.nrows + 1];
        for &r in &self.rows {
            starts[r + 1] += 1;
        }
        for i in 0..self.nrows {
            starts[i + 1] += starts[i];
        }

        // Bucket entries by row (counting sort).
        let mut next = starts.clone();
        let mut slots = vec![(0usize, 0.0f32); self.nnz()];
        for (r, c, v) in self.iter() {
            slots[next[r]] = (c, v);
            next[r] += 1;
        }

        let mut indptr = Vec::with_capacity(self.nrows + 1);
        let mut indices = Vec::with_capacity(self.nnz());
        let mut data = Vec::with_capacity(self.nnz());
        indptr.push(0);

        for r in 0..self.nrows {
            let row = &mut slots[starts[r]..starts[r + 1]];
            row.sort_by_key(|&(c, _)| c);
            let mut i = 0;
            while i < row.len() {
                let (c, mut v) = row[i];
                let mut j = i + 1;
                while j < row.len() && row[j].0 == c {
                    v += row[j].1;
                    j += 1;
                }
                if v != 0.0 {
                    indices.push(c);
                    data.push(v);
                }
                i = j;
            }
            indptr.push(indices.len());
        }

        CsrMatrix {
            nrows: self.nrows,
            ncols: self.ncols,
            indptr,
            indices,
            data,
        }
    }
}

impl From<CooMatrix> for CsrMatrix {
    fn from(coo: CooMatrix) -> Self {
        coo.to_csr()
    }
}

/// Sparse matrix in compressed sparse row form.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f32>,
}

impl CsrMatrix {
    /// All-zero matrix.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            indptr: vec![0; nrows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// `n × n` identity.
    pub fn identity(n: usize) -> Self {
        Self::from_diagonal(&vec![1.0; n])
    }

    /// Square diagonal matrix with `values` on the diagonal. Zeros are not stored.
    pub fn from_diagonal(values: &[f32]) -> Self {
        let n = values.len();
        let mut indptr = Vec::with_capacity(n + 1);
        let mut indices = Vec::with_capacity(n);
        let mut data = Vec::with_capacity(n);
        indptr.push(0);
        for (i, &v) in values.iter().enumerate() {
            if v != 0.0 {
                indices.push(i);
                data.push(v);
            }
            indptr.push(indices.len());
        }
        Self {
            nrows: n,
            ncols: n,
            indptr,
            indices,
            data,
        }
    }

    /// Build from `(row, col, value)` triplets; duplicates are summed.
    pub fn from_triplets(shape: (usize, usize), triplets: &[(usize, usize, f32)]) -> Result<Self> {
        let mut coo = CooMatrix::new(shape.0, shape.1);
        for &(r, c, v) in triplets {
            coo.push(r, c, v)?;
        }
        Ok(coo.to_csr())
    }

    /// Sparse copy of a dense matrix (zeros dropped).
    pub fn from_dense(dense: ArrayView2<'_, f32>) -> Self {
        let (nrows, ncols) = dense.dim();
        let mut indptr = Vec::with_capacity(nrows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for row in dense.rows() {
            for (c, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    indices.push(c);
                    data.push(v);
                }
            }
            indptr.push(indices.len());
        }
        Self {
            nrows,
            ncols,
            indptr,
            indices,
            data,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    fn row_slices(&self, r: usize) -> (&[usize], &[f32]) {
        let span = self.indptr[r]..self.indptr[r + 1];
        (&self.indices[span.clone()], &self.data[span])
    }

    /// Stored `(col, value)` pairs of row `r`, in column order.
    ///
    /// # Panics
    /// Panics if `r >= nrows`.
    pub fn row(&self, r: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let (cols, vals) = self.row_slices(r);
        cols.iter().copied().zip(vals.iter().copied())
    }

    /// Value at `(r, c)`; zero when not stored or out of range.
    pub fn get(&self, r: usize, c: usize) -> f32 {
        if r >= self.nrows || c >= self.ncols {
            return 0.0;
        }
        let (cols, vals) = self.row_slices(r);
        cols.binary_search(&c).map_or(0.0, |at| vals[at])
    }

    /// All stored entries as `(row, col, value)`, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        (0..self.nrows).flat_map(move |r| self.row(r).map(move |(c, v)| (r, c, v)))
    }

    pub fn to_coo(&self) -> CooMatrix {
        let mut rows = Vec::with_capacity(self.nnz());
        for r in 0..self.nrows {
            rows.extend(std::iter::repeat(r).take(self.indptr[r + 1] - self.indptr[r]));
        }
        CooMatrix {
            nrows: self.nrows,
            ncols: self.ncols,
            rows,
            cols: self.indices.clone(),
            values: self.data.clone(),
        }
    }

    pub fn to_dense(&self) -> Array2<f32> {
        let mut out = Array2::zeros((self.nrows, self.ncols));
        for (r, c, v) in self.iter() {
            out[[r, c]] = v;
        }
        out
    }

    /// Transpose via a counting sort over columns.
    pub fn transpose(&self) -> CsrMatrix {
        let mut indptr = vec![0usize; self.ncols + 1];
        for &c in &self.indices {
            indptr[c + 1] += 1;
        }
        for i in 0..self.ncols {
            indptr[i + 1] += indptr[i];
        }
        let mut next = indptr.clone();
        let mut indices = vec![0usize; self.nnz()];
        let mut data = vec![0.0f32; self.nnz()];
        for (r, c, v) in self.iter() {
            let at = next[c];
            indices[at] = r;
            data[at] = v;
            next[c] += 1;
        }
        CsrMatrix {
            nrows: self.ncols,
            ncols: self.nrows,
            indptr,
            indices,
            data,
        }
    }

    fn check_same_shape(&self, other: &CsrMatrix, op: &'static str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::ShapeMismatch {
                op,
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(())
    }

    /// Elementwise combination over the union of both sparsity patterns.
    /// Implicit entries are passed as `0.0`; zero results are not stored.
    fn zip_with(
        &self,
        other: &CsrMatrix,
        op: &'static str,
        f: impl Fn(f32, f32) -> f32,
    ) -> Result<CsrMatrix> {
        self.check_same_shape(other, op)?;
        let mut indptr = Vec::with_capacity(self.nrows + 1);
        let mut indices = Vec::with_capacity(self.nnz().max(other.nnz()));
        let mut data = Vec::with_capacity(self.nnz().max(other.nnz()));
        indptr.push(0);

        for r in 0..self.nrows {
            let (ac, av) = self.row_slices(r);
            let (bc, bv) = other.row_slices(r);
            let (mut i, mut j) = (0, 0);
            loop {
                let (c, v) = match (ac.get(i), bc.get(j)) {
                    (None, None) => break,
                    (Some(&ca), Some(&cb)) if ca == cb => {
                        let v = f(av[i], bv[j]);
                        i += 1;
                        j += 1;
                        (ca, v)
                    }
                    (Some(&ca), Some(&cb)) if ca < cb => {
                        let v = f(av[i], 0.0);
                        i += 1;
                        (ca, v)
                    }
                    (Some(&ca), None) => {
                        let v = f(av[i], 0.0);
                        i += 1;
                        (ca, v)
                    }
                    (_, Some(&cb)) => {
                        let v = f(0.0, bv[j]);
                        j += 1;
                        (cb, v)
                    }
                };
                if v != 0.0 {
                    indices.push(c);
                    data.push(v);
                }
            }
            indptr.push(indices.len());
        }

        Ok(CsrMatrix {
            nrows: self.nrows,
            ncols: self.ncols,
            indptr,
            indices,
            data,
        })
    }

    /// `self + other`.
    pub fn add(&self, other: &CsrMatrix) -> Result<CsrMatrix> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    /// `self - other`.
    pub fn sub(&self, other: &CsrMatrix) -> Result<CsrMatrix> {
        self.zip_with(other, "sub", |a, b| a - b)
    }

    /// Hadamard product `self ∘ other`.
    pub fn multiply_elementwise(&self, other: &CsrMatrix) -> Result<CsrMatrix> {
        self.zip_with(other, "multiply_elementwise", |a, b| a * b)
    }

    /// Indicator matrix of `self > other`: `1.0` where the comparison holds.
    ///
    /// Implicit zeros take part in the comparison, so a negative stored entry
    /// in `other` against an implicit zero in `self` yields `1.0`.
    pub fn mask_greater(&self, other: &CsrMatrix) -> Result<CsrMatrix> {
        self.zip_with(other, "mask_greater", |a, b| if a > b { 1.0 } else { 0.0 })
    }

    /// `diag(factors) · self`.
    pub fn scale_rows(&self, factors: &[f32]) -> Result<CsrMatrix> {
        if factors.len() != self.nrows {
            return Err(Error::ShapeMismatch {
                op: "scale_rows",
                left: self.shape(),
                right: (factors.len(), factors.len()),
            });
        }
        let mut out = self.clone();
        for r in 0..self.nrows {
            for v in &mut out.data[self.indptr[r]..self.indptr[r + 1]] {
                *v *= factors[r];
            }
        }
        Ok(out)
    }

    /// `self · diag(factors)`.
    pub fn scale_cols(&self, factors: &[f32]) -> Result<CsrMatrix> {
        if factors.len() != self.ncols {
            return Err(Error::ShapeMismatch {
                op: "scale_cols",
                left: self.shape(),
                right: (factors.len(), factors.len()),
            });
        }
        let mut out = self.clone();
        for (c, v) in out.indices.iter().zip(out.data.iter_mut()) {
            *v *= factors[*c];
        }
        Ok(out)
    }

    /// Multiply by the diagonal matrix built from `factors`, from either side.
    pub fn scale_by_diagonal(&self, factors: &[f32], side: DiagonalSide) -> Result<CsrMatrix> {
        match side {
            DiagonalSide::Left => self.scale_rows(factors),
            DiagonalSide::Right => self.scale_cols(factors),
        }
    }

    /// Per-row sums (degrees, for an adjacency matrix).
    pub fn row_sums(&self) -> Vec<f32> {
        (0..self.nrows)
            .map(|r| self.row(r).map(|(_, v)| f64::from(v)).sum::<f64>() as f32)
            .collect()
    }

    /// Main diagonal (length `min(nrows, ncols)`).
    pub fn diagonal(&self) -> Vec<f32> {
        (0..self.nrows.min(self.ncols)).map(|i| self.get(i, i)).collect()
    }

    /// Sparse × dense product.
    ///
    /// With the `parallel` feature, output rows are computed on the rayon pool.
    pub fn multiply_dense(&self, dense: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        if self.ncols != dense.nrows() {
            return Err(Error::ShapeMismatch {
                op: "multiply_dense",
                left: self.shape(),
                right: dense.dim(),
            });
        }
        let mut out = Array2::<f32>::zeros((self.nrows, dense.ncols()));
        let kernel = |r: usize, mut row: ArrayViewMut1<'_, f32>| {
            for (c, v) in self.row(r) {
                row.scaled_add(v, &dense.row(c));
            }
        };

        #[cfg(feature = "parallel")]
        Zip::indexed(out.rows_mut()).par_for_each(kernel);
        #[cfg(not(feature = "parallel"))]
        Zip::indexed(out.rows_mut()).for_each(kernel);

        Ok(out)
    }

    /// Sparse × sparse product (Gustavson's row-by-row algorithm).
    pub fn multiply_sparse(&self, other: &CsrMatrix) -> Result<CsrMatrix> {
        if self.ncols != other.nrows {
            return Err(Error::ShapeMismatch {
                op: "multiply_sparse",
                left: self.shape(),
                right: other.shape(),
            });
        }
        let mut acc = vec![0.0f32; other.ncols];
        let mut seen = vec![usize::MAX; other.ncols];
        let mut touched: Vec<usize> = Vec::new();

        let mut indptr = Vec::with_capacity(self.nrows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);

        for r in 0..self.nrows {
            touched.clear();
            for (k, a) in self.row(r) {
                for (c, b) in other.row(k) {
                    if seen[c] != r {
                        seen[c] = r;
                        acc[c] = 0.0;
                        touched.push(c);
                    }
                    acc[c] += a * b;
                }
            }
            touched.sort_unstable();
            for &c in &touched {
                if acc[c] != 0.0 {
                    indices.push(c);
                    data.push(acc[c]);
                }
            }
            indptr.push(indices.len());
        }

        Ok(CsrMatrix {
            nrows: self.nrows,
            ncols: other.ncols,
            indptr,
            indices,
            data,
        })
    }

    /// Rows `indices` of `self`, in the given order (repeats allowed).
    pub fn select_rows(&self, indices: &[usize]) -> Result<CsrMatrix> {
        let mut indptr = Vec::with_capacity(indices.len() + 1);
        let mut cols = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for &r in indices {
            if r >= self.nrows {
                return Err(Error::IndexOutOfBounds {
                    index: r,
                    bound: self.nrows,
                });
            }
            let (rc, rv) = self.row_slices(r);
            cols.extend_from_slice(rc);
            data.extend_from_slice(rv);
            indptr.push(cols.len());
        }
        Ok(CsrMatrix {
            nrows: indices.len(),
            ncols: self.ncols,
            indptr,
            indices: cols,
            data,
        })
    }

    /// Submatrix restricted to `indices` on both axes: `out[i][j] = self[idx[i]][idx[j]]`.
    pub fn select(&self, indices: &[usize]) -> Result<CsrMatrix> {
        if let Some(&c) = indices.iter().find(|&&c| c >= self.ncols) {
            return Err(Error::IndexOutOfBounds {
                index: c,
                bound: self.ncols,
            });
        }
        let rows = self.select_rows(indices)?;
        Ok(rows.transpose().select_rows(indices)?.transpose())
    }

    /// Place row `k` of `self` at row `targets[k]` of a `nrows`-row matrix;
    /// every row not targeted is all-zero.
    pub fn scatter_rows(&self, targets: &[usize], nrows: usize) -> Result<CsrMatrix> {
        if targets.len() != self.nrows {
            return Err(Error::ShapeMismatch {
                op: "scatter_rows",
                left: self.shape(),
                right: (targets.len(), self.ncols),
            });
        }
        let mut source = vec![None; nrows];
        for (k, &t) in targets.iter().enumerate() {
            let slot = source
                .get_mut(t)
                .ok_or(Error::IndexOutOfBounds { index: t, bound: nrows })?;
            if slot.is_some() {
                return Err(Error::InvalidInput(format!("row {t} targeted twice")));
            }
            *slot = Some(k);
        }

        let mut indptr = Vec::with_capacity(nrows + 1);
        let mut cols = Vec::with_capacity(self.nnz());
        let mut data = Vec::with_capacity(self.nnz());
        indptr.push(0);
        for k in source {
            if let Some(k) = k {
                let (rc, rv) = self.row_slices(k);
                cols.extend_from_slice(rc);
                data.extend_from_slice(rv);
            }
            indptr.push(cols.len());
        }
        Ok(CsrMatrix {
            nrows,
            ncols: self.ncols,
            indptr,
            indices: cols,
            data,
        })
    }

    /// Stack blocks vertically. All blocks must share a column count.
    pub fn vstack(blocks: &[&CsrMatrix]) -> Result<CsrMatrix> {
        let Some(first) = blocks.first() else {
            return Err(Error::InvalidInput("vstack of zero blocks".into()));
        };
        let ncols = first.ncols;
        let mut out = CsrMatrix::zeros(0, ncols);
        for block in blocks {
            if block.ncols != ncols {
                return Err(Error::ShapeMismatch {
                    op: "vstack",
                    left: first.shape(),
                    right: block.shape(),
                });
            }
            let base = out.indices.len();
            out.indptr
                .extend(block.indptr[1..].iter().map(|&p| p + base));
            out.indices.extend_from_slice(&block.indices);
            out.data.extend_from_slice(&block.data);
            out.nrows += block.nrows;
        }
        Ok(out)
    }

    /// Square and `|self[i][j] - self[j][i]| <= tol` for every stored entry.
    pub fn is_symmetric(&self, tol: f32) -> bool {
        self.nrows == self.ncols && self.iter().all(|(r, c, v)| (v - self.get(c, r)).abs() <= tol)
    }

    /// True if any stored value is NaN or infinite.
    pub fn has_non_finite(&self) -> bool {
        self.data.iter().any(|v| !v.is_finite())
    }
}
