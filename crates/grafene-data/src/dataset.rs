//! Loaded dataset and dataset-family dispatch.

use crate::citation::{self, CitationConfig};
use crate::social::{self, SocialConfig};
use crate::{Error, LabelVector, Result, Split};
use grafene_core::{AdjacencyNormalizer, PropagationOperator};
use ndarray::Array2;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fully preprocessed dataset, ready for propagation and training.
///
/// Row `i` of `features`, entry `i` of `labels` and node `i` of the
/// operators all refer to the same node.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    /// Normalized full-graph operator.
    pub adjacency: Arc<PropagationOperator>,
    /// Normalized operator over the training nodes only (social family).
    pub train_adjacency: Option<Arc<PropagationOperator>>,
    pub features: Array2<f32>,
    pub labels: LabelVector,
    pub split: Split,
    /// Undirected edges of the symmetrized graph, self-loops excluded.
    pub num_edges: usize,
}

impl Dataset {
    pub fn num_nodes(&self) -> usize {
        self.features.nrows()
    }

    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn num_classes(&self) -> usize {
        self.labels.num_classes()
    }
}

/// Raw format family of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    /// `ind.{name}.*` planetoid-style citation graphs.
    Citation,
    /// Pre-symmetrized adjacency plus a feature/label bundle.
    Social,
}

impl DatasetKind {
    /// Family for a dataset identifier (case-insensitive).
    pub fn from_name(name: &str) -> Result<Self> {
        let lower = name.to_ascii_lowercase();
        if citation::CITATION_DATASETS.contains(&lower.as_str()) {
            Ok(Self::Citation)
        } else if social::SOCIAL_DATASETS.contains(&lower.as_str()) {
            Ok(Self::Social)
        } else {
            Err(Error::UnknownDataset(name.to_string()))
        }
    }
}

/// Where and how to load a dataset.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub name: String,
    pub data_dir: PathBuf,
    /// Validation window size (citation family only).
    pub val_size: usize,
}

impl LoadOptions {
    pub fn new(name: impl Into<String>, data_dir: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            data_dir: data_dir.as_ref().to_path_buf(),
            val_size: crate::split::DEFAULT_VAL_SIZE,
        }
    }

    pub fn with_val_size(mut self, val_size: usize) -> Self {
        self.val_size = val_size;
        self
    }
}

/// Load any supported dataset, dispatching on its family.
pub fn load_dataset(options: &LoadOptions, normalizer: &dyn AdjacencyNormalizer) -> Result<Dataset> {
    match DatasetKind::from_name(&options.name)? {
        DatasetKind::Citation => {
            let config = CitationConfig::new(&options.name, &options.data_dir)
                .with_val_size(options.val_size);
            citation::load_citation(&config, normalizer)
        }
        DatasetKind::Social => {
            let config = SocialConfig::new(&options.name, &options.data_dir);
            social::load_social(&config, normalizer)
        }
    }
}
