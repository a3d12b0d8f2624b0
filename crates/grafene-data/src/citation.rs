//! Planetoid-style citation datasets (Cora, Citeseer, Pubmed).
//!
//! Each dataset ships as seven artifacts named `ind.{name}.{suffix}`:
//!
//! | Suffix | Content |
//! |--------|---------|
//! | `x`, `y` | features / one-hot labels of the labeled training nodes |
//! | `allx`, `ally` | features / labels of every non-test node |
//! | `tx`, `ty` | features / labels of the test nodes, in index-file order |
//! | `graph` | adjacency lists |
//!
//! plus `ind.{name}.test.index`, the test node ids in their original
//! (unsorted) order.
//!
//! # Loading stages
//!
//! ```text
//! RawLoad → IsolatedNodeRepair (citeseer) → FeatureStack → AdjacencyBuild
//!         → SymmetrizeAndDedupe → LabelStack → PartitionIndices → Normalize
//! ```
//!
//! Row `k` of `tx` describes node `unsorted[k]`, but stacking `allx` over
//! `tx` parks it at slot `sorted[k]`. The re-seat step moves every parked row
//! to its node, so that row `i` of the features describes node `i` of the
//! graph.

use crate::{Dataset, Error, LabelVector, Result, Split};
use grafene_core::graph::{adjacency_from_lists, symmetrize_max, undirected_edge_count};
use grafene_core::{row_normalize, AdjacencyNormalizer, CsrMatrix, Error as CoreError};
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Identifiers of the citation family.
pub const CITATION_DATASETS: &[&str] = &["cora", "citeseer", "pubmed"];

/// Datasets whose test split silently omits isolated nodes.
pub const ISOLATED_TEST_NODE_DATASETS: &[&str] = &["citeseer"];

/// Location and options of one citation dataset.
#[derive(Debug, Clone)]
pub struct CitationConfig {
    /// Lower-cased dataset identifier.
    pub name: String,
    pub data_dir: PathBuf,
    pub val_size: usize,
}

impl CitationConfig {
    pub fn new(name: &str, data_dir: impl AsRef<Path>) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            data_dir: data_dir.as_ref().to_path_buf(),
            val_size: crate::split::DEFAULT_VAL_SIZE,
        }
    }

    pub fn with_val_size(mut self, val_size: usize) -> Self {
        self.val_size = val_size;
        self
    }

    /// `{data_dir}/ind.{name}.{suffix}`
    pub fn artifact_path(&self, suffix: &str) -> PathBuf {
        self.data_dir.join(format!("ind.{}.{}", self.name, suffix))
    }

    pub fn repairs_isolated_test_nodes(&self) -> bool {
        ISOLATED_TEST_NODE_DATASETS.contains(&self.name.as_str())
    }
}

/// The raw artifacts, as read from disk.
#[derive(Debug, Clone)]
pub struct RawCitation {
    pub x: CsrMatrix,
    pub y: Array2<f32>,
    pub tx: CsrMatrix,
    pub ty: Array2<f32>,
    pub allx: CsrMatrix,
    pub ally: Array2<f32>,
    pub graph: BTreeMap<usize, Vec<usize>>,
    /// Test ids in file order (not sorted).
    pub test_index: Vec<usize>,
}

impl RawCitation {
    #[instrument(skip_all, fields(dataset = %config.name))]
    pub fn read(config: &CitationConfig) -> Result<Self> {
        use crate::formats::{read_adjacency_lists, read_dense_matrix, read_index_file, read_sparse_matrix};

        let raw = Self {
            x: read_sparse_matrix(config.artifact_path("x"))?,
            y: read_dense_matrix(config.artifact_path("y"))?,
            tx: read_sparse_matrix(config.artifact_path("tx"))?,
            ty: read_dense_matrix(config.artifact_path("ty"))?,
            allx: read_sparse_matrix(config.artifact_path("allx"))?,
            ally: read_dense_matrix(config.artifact_path("ally"))?,
            graph: read_adjacency_lists(config.artifact_path("graph"))?,
            test_index: read_index_file(config.artifact_path("test.index"))?,
        };
        debug!(
            allx = ?raw.allx.shape(),
            tx = ?raw.tx.shape(),
            graph_nodes = raw.graph.len(),
            test_ids = raw.test_index.len(),
            "read citation artifacts"
        );
        Ok(raw)
    }
}

/// Spread the test block over the full id range `[min, max]` of the test ids.
///
/// Row `k` of `tx`/`ty` is parked at offset `sorted_test[k] - min`, the slot
/// [`reseat_permutation`] later reads it from. Ids inside the range but absent
/// from the test list get all-zero feature and label rows.
pub fn extend_test_block(
    tx: &CsrMatrix,
    ty: ArrayView2<'_, f32>,
    sorted_test: &[usize],
) -> Result<(CsrMatrix, Array2<f32>)> {
    let (Some(&min), Some(&max)) = (sorted_test.first(), sorted_test.last()) else {
        return Err(Error::InvalidPartition("empty test index".into()));
    };
    if tx.nrows() != sorted_test.len() || ty.nrows() != sorted_test.len() {
        return Err(Error::Format(format!(
            "{} test ids but tx has {} rows and ty has {}",
            sorted_test.len(),
            tx.nrows(),
            ty.nrows()
        )));
    }

    let span = max - min + 1;
    let offsets: Vec<usize> = sorted_test.iter().map(|&id| id - min).collect();
    let features = tx.scatter_rows(&offsets, span)?;
    let mut labels = Array2::zeros((span, ty.ncols()));
    for (k, &offset) in offsets.iter().enumerate() {
        labels.row_mut(offset).assign(&ty.row(k));
    }
    debug!(
        min,
        max,
        supplied = sorted_test.len(),
        zero_rows = span - sorted_test.len(),
        "extended test block"
    );
    Ok((features, labels))
}

/// Source row for every output row after re-seating test rows.
///
/// Output row `unsorted[k]` takes input row `sorted[k]`; every other row
/// stays in place. Equivalent to `rows[unsorted] = rows[sorted]` with the
/// right-hand side read before any write.
pub fn reseat_permutation(n: usize, unsorted: &[usize], sorted: &[usize]) -> Result<Vec<usize>> {
    let mut source: Vec<usize> = (0..n).collect();
    for (&dst, &src) in unsorted.iter().zip(sorted) {
        for id in [dst, src] {
            if id >= n {
                return Err(CoreError::IndexOutOfBounds { index: id, bound: n }.into());
            }
        }
        source[dst] = src;
    }
    Ok(source)
}

/// Turn raw artifacts into a normalized [`Dataset`].
#[instrument(skip_all, fields(dataset = %config.name))]
pub fn assemble_citation(
    raw: RawCitation,
    config: &CitationConfig,
    normalizer: &dyn AdjacencyNormalizer,
) -> Result<Dataset> {
    let RawCitation {
        x,
        y,
        tx,
        ty,
        allx,
        ally,
        graph,
        test_index,
    } = raw;

    for block in [&x, &tx] {
        if block.ncols() != allx.ncols() {
            return Err(CoreError::ShapeMismatch {
                op: "citation feature blocks",
                left: allx.shape(),
                right: block.shape(),
            }
            .into());
        }
    }
    if x.nrows() != y.nrows() {
        return Err(Error::Format(format!(
            "x has {} rows but y has {}",
            x.nrows(),
            y.nrows()
        )));
    }

    let mut sorted_test = test_index.clone();
    sorted_test.sort_unstable();

    let (tx, ty) = if config.repairs_isolated_test_nodes() {
        extend_test_block(&tx, ty.view(), &sorted_test)?
    } else {
        (tx, ty)
    };

    let features = CsrMatrix::vstack(&[&allx, &tx])?;
    let one_hot = concatenate(Axis(0), &[ally.view(), ty.view()])
        .map_err(|e| Error::Format(format!("cannot stack ally and ty: {e}")))?;
    let n = features.nrows();
    if one_hot.nrows() != n {
        return Err(Error::Format(format!(
            "{n} feature rows but {} label rows",
            one_hot.nrows()
        )));
    }

    let source = reseat_permutation(n, &test_index, &sorted_test)?;
    let features = features.select_rows(&source)?;
    let labels = LabelVector::from_one_hot(one_hot.view()).permute(&source)?;

    let adj = symmetrize_max(&adjacency_from_lists(&graph, n)?)?;
    let num_edges = undirected_edge_count(&adj);

    let n_train = y.nrows();
    let split = Split::from_ranges(0..n_train, n_train..n_train + config.val_size, sorted_test);
    split.validate(n)?;
    let overlap = split.overlap();
    if overlap > 0 {
        warn!(overlap, "partitions share nodes");
    }

    let adjacency = normalizer.normalize(&adj)?;
    let features = row_normalize(&features)?.to_dense();

    info!(
        nodes = n,
        edges = num_edges,
        features = features.ncols(),
        classes = labels.num_classes(),
        train = split.train.len(),
        val = split.val.len(),
        test = split.test.len(),
        scheme = adjacency.scheme(),
        "loaded citation dataset"
    );

    Ok(Dataset {
        name: config.name.clone(),
        adjacency: Arc::new(adjacency),
        train_adjacency: None,
        features,
        labels,
        split,
        num_edges,
    })
}

/// Read and assemble a citation dataset.
pub fn load_citation(config: &CitationConfig, normalizer: &dyn AdjacencyNormalizer) -> Result<Dataset> {
    let raw = RawCitation::read(config)?;
    assemble_citation(raw, config, normalizer)
}
