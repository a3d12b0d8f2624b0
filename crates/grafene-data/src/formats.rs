//! On-disk artifact encodings.
//!
//! | Object | Encoding |
//! |--------|----------|
//! | Sparse matrix | `{"shape": [r, c], "row": [..], "col": [..], "data": [..]}` |
//! | Dense matrix | JSON array of equal-length row arrays |
//! | Adjacency lists | JSON object: node id string → neighbor id array |
//! | Index file | plain text, one node id per line |

use crate::{Error, Result};
use grafene_core::{CooMatrix, CsrMatrix};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Serialized COO form of a sparse matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrixRecord {
    pub shape: [usize; 2],
    pub row: Vec<usize>,
    pub col: Vec<usize>,
    pub data: Vec<f32>,
}

impl SparseMatrixRecord {
    pub fn into_csr(self) -> Result<CsrMatrix> {
        let coo = CooMatrix::from_triplets(
            (self.shape[0], self.shape[1]),
            self.row,
            self.col,
            self.data,
        )?;
        Ok(coo.to_csr())
    }

    pub fn from_csr(m: &CsrMatrix) -> Self {
        let (mut row, mut col, mut data) = (Vec::new(), Vec::new(), Vec::new());
        for (r, c, v) in m.iter() {
            row.push(r);
            col.push(c);
            data.push(v);
        }
        Self {
            shape: [m.nrows(), m.ncols()],
            row,
            col,
            data,
        }
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    if !path.exists() {
        return Err(Error::MissingArtifact(path.to_path_buf()));
    }
    Ok(BufReader::new(File::open(path)?))
}

/// Read a JSON-encoded value from `path`.
pub fn read_json<T: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    Ok(serde_json::from_reader(open(path.as_ref())?)?)
}

/// Write `value` as JSON to `path`.
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

pub fn read_sparse_matrix(path: impl AsRef<Path>) -> Result<CsrMatrix> {
    read_json::<SparseMatrixRecord>(path)?.into_csr()
}

pub fn write_sparse_matrix(path: impl AsRef<Path>, m: &CsrMatrix) -> Result<()> {
    write_json(path, &SparseMatrixRecord::from_csr(m))
}

/// Pack row vectors into a dense matrix; rows must share a length.
///
/// An empty row list yields a `0 × 0` matrix.
pub fn dense_from_rows(rows: Vec<Vec<f32>>) -> Result<Array2<f32>> {
    let nrows = rows.len();
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some((i, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
        return Err(Error::Format(format!(
            "ragged matrix: row {i} has {} columns, expected {ncols}",
            r.len()
        )));
    }
    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((nrows, ncols), flat).map_err(|e| Error::Format(e.to_string()))
}

pub fn read_dense_matrix(path: impl AsRef<Path>) -> Result<Array2<f32>> {
    dense_from_rows(read_json(path)?)
}

pub fn write_dense_matrix(path: impl AsRef<Path>, m: ArrayView2<'_, f32>) -> Result<()> {
    let rows: Vec<Vec<f32>> = m.rows().into_iter().map(|r| r.to_vec()).collect();
    write_json(path, &rows)
}

/// Read a dict-of-lists graph. Keys are decimal node ids.
pub fn read_adjacency_lists(path: impl AsRef<Path>) -> Result<BTreeMap<usize, Vec<usize>>> {
    let raw: HashMap<String, Vec<usize>> = read_json(path)?;
    raw.into_iter()
        .map(|(key, neighbors)| {
            key.trim()
                .parse::<usize>()
                .map(|node| (node, neighbors))
                .map_err(|e| Error::Format(format!("graph key {key:?}: {e}")))
        })
        .collect()
}

pub fn write_adjacency_lists(
    path: impl AsRef<Path>,
    lists: &BTreeMap<usize, Vec<usize>>,
) -> Result<()> {
    let keyed: BTreeMap<String, &Vec<usize>> =
        lists.iter().map(|(k, v)| (k.to_string(), v)).collect();
    write_json(path, &keyed)
}

/// Parse an index file: one node id per line, blank lines ignored.
///
/// Order is preserved; the file is not assumed to be sorted.
pub fn read_index_file(path: impl AsRef<Path>) -> Result<Vec<usize>> {
    let path = path.as_ref();
    let mut index = Vec::new();
    for (i, line) in open(path)?.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let id = line.parse::<usize>().map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            line: i + 1,
            message: e.to_string(),
        })?;
        index.push(id);
    }
    Ok(index)
}

pub fn write_index_file(path: impl AsRef<Path>, index: &[usize]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for id in index {
        writeln!(writer, "{id}")?;
    }
    writer.flush()?;
    Ok(())
}
