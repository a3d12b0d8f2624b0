//! Large social graphs shipped pre-symmetrized (Reddit).
//!
//! Artifacts under `data_dir`:
//!
//! - `{name}_adj.json` - sparse adjacency
//! - `{name}.json` - bundle with keys `feats`, `y_train`, `y_val`, `y_test`,
//!   `train_index`, `val_index`, `test_index`
//!
//! # Loading stages
//!
//! ```text
//! RawLoad → AdjacencyRepair (A + Aᵗ + I) → LabelScatter
//!         → TrainSubgraphExtract → FeatureStandardize → Normalize
//! ```
//!
//! Nodes outside every labeled group stay unlabeled (`None`), never class 0.
//!
//! Feature standardization uses statistics of *all* nodes, validation and
//! test included. This matches the reference numerics and leaks population
//! statistics into the training features.

use crate::formats::{dense_from_rows, read_json, read_sparse_matrix};
use crate::{Dataset, LabelVector, Result, Split};
use grafene_core::graph::{induced_subgraph, symmetrize_sum_with_self_loops, undirected_edge_count};
use grafene_core::{AdjacencyNormalizer, CsrMatrix, Error as CoreError};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Identifiers of the social-graph family.
pub const SOCIAL_DATASETS: &[&str] = &["reddit"];

#[derive(Debug, Clone)]
pub struct SocialConfig {
    pub name: String,
    pub data_dir: PathBuf,
}

impl SocialConfig {
    pub fn new(name: &str, data_dir: impl AsRef<Path>) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn adjacency_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}_adj.json", self.name))
    }

    pub fn bundle_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.name))
    }
}

/// Feature/label archive, keyed by fixed field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialBundle {
    pub feats: Vec<Vec<f32>>,
    pub y_train: Vec<u32>,
    pub y_val: Vec<u32>,
    pub y_test: Vec<u32>,
    pub train_index: Vec<usize>,
    pub val_index: Vec<usize>,
    pub test_index: Vec<usize>,
}

/// Node ids of one partition with their class ids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabeledIndex {
    pub nodes: Vec<usize>,
    pub classes: Vec<u32>,
}

impl LabeledIndex {
    pub fn new(nodes: Vec<usize>, classes: Vec<u32>) -> Self {
        Self { nodes, classes }
    }
}

#[derive(Debug, Clone)]
pub struct RawSocial {
    pub adjacency: CsrMatrix,
    pub features: Array2<f32>,
    pub train: LabeledIndex,
    pub val: LabeledIndex,
    pub test: LabeledIndex,
}

impl RawSocial {
    #[instrument(skip_all, fields(dataset = %config.name))]
    pub fn read(config: &SocialConfig) -> Result<Self> {
        let adjacency = read_sparse_matrix(config.adjacency_path())?;
        let bundle: SocialBundle = read_json(config.bundle_path())?;
        let raw = Self {
            adjacency,
            features: dense_from_rows(bundle.feats)?,
            train: LabeledIndex::new(bundle.train_index, bundle.y_train),
            val: LabeledIndex::new(bundle.val_index, bundle.y_val),
            test: LabeledIndex::new(bundle.test_index, bundle.y_test),
        };
        debug!(
            adjacency = ?raw.adjacency.shape(),
            nnz = raw.adjacency.nnz(),
            features = ?raw.features.dim(),
            "read social artifacts"
        );
        Ok(raw)
    }
}

/// Per-column zero mean and unit (sample) standard deviation, in place.
///
/// Constant columns are centered but not scaled.
pub fn standardize_columns(features: &mut Array2<f32>) {
    let n = features.nrows();
    if n == 0 {
        return;
    }
    for mut column in features.columns_mut() {
        let mean = column.iter().map(|&v| f64::from(v)).sum::<f64>() / n as f64;
        let var = if n > 1 {
            column
                .iter()
                .map(|&v| (f64::from(v) - mean).powi(2))
                .sum::<f64>()
                / (n - 1) as f64
        } else {
            0.0
        };
        let std = var.sqrt();
        column.mapv_inplace(|v| {
            let centered = f64::from(v) - mean;
            if std > 0.0 {
                (centered / std) as f32
            } else {
                centered as f32
            }
        });
    }
}

/// Turn raw artifacts into a normalized [`Dataset`] with a training subgraph.
#[instrument(skip_all, fields(dataset = name))]
pub fn assemble_social(
    raw: RawSocial,
    name: &str,
    normalizer: &dyn AdjacencyNormalizer,
) -> Result<Dataset> {
    let RawSocial {
        adjacency,
        mut features,
        train,
        val,
        test,
    } = raw;

    let n = adjacency.nrows();
    if features.nrows() != n {
        return Err(CoreError::ShapeMismatch {
            op: "social features",
            left: adjacency.shape(),
            right: features.dim(),
        }
        .into());
    }

    let mut labels = LabelVector::unlabeled(n);
    for group in [&train, &val, &test] {
        labels.assign(&group.nodes, &group.classes)?;
    }

    let adj = symmetrize_sum_with_self_loops(&adjacency)?;
    let train_adj = induced_subgraph(&adj, &train.nodes)?;
    debug!(train_nodes = train.nodes.len(), train_nnz = train_adj.nnz(), "extracted training subgraph");

    standardize_columns(&mut features);

    let split = Split::new(train.nodes, val.nodes, test.nodes);
    split.validate(n)?;
    let overlap = split.overlap();
    if overlap > 0 {
        warn!(overlap, "partitions share nodes");
    }

    let adjacency = normalizer.normalize(&adj)?;
    let train_adjacency = normalizer.normalize(&train_adj)?;
    let num_edges = undirected_edge_count(&adj);

    info!(
        nodes = n,
        edges = num_edges,
        features = features.ncols(),
        labeled = labels.num_labeled(),
        train = split.train.len(),
        val = split.val.len(),
        test = split.test.len(),
        scheme = adjacency.scheme(),
        "loaded social dataset"
    );

    Ok(Dataset {
        name: name.to_string(),
        adjacency: Arc::new(adjacency),
        train_adjacency: Some(Arc::new(train_adjacency)),
        features,
        labels,
        split,
        num_edges,
    })
}

/// Read and assemble a social-graph dataset.
pub fn load_social(config: &SocialConfig, normalizer: &dyn AdjacencyNormalizer) -> Result<Dataset> {
    let raw = RawSocial::read(config)?;
    assemble_social(raw, &config.name, normalizer)
}
