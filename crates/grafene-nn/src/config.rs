//! Pipeline configuration.
//!
//! Every field has a default, so a JSON config only needs the keys it
//! changes:
//!
//! ```json
//! { "dataset": "citeseer", "model": "GCN", "lr": 0.01, "dropout": 0.5 }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_SEED: u64 = 42;

/// Everything needed to go from raw artifacts to a trained classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Dataset identifier (`cora`, `citeseer`, `pubmed`, `reddit`).
    pub dataset: String,
    /// Directory holding the dataset artifacts.
    pub data_dir: PathBuf,
    /// Normalization scheme registry key.
    pub normalization: String,
    /// Model registry key (`GCN` or `SGC`).
    pub model: String,
    /// Propagation steps for SGC precompute.
    pub degree: usize,
    pub seed: u64,
    /// Place tensors on the first CUDA device when available.
    pub cuda: bool,
    /// Validation window size (citation family).
    pub val_size: usize,
    pub epochs: usize,
    pub lr: f64,
    pub weight_decay: f64,
    /// Hidden width (GCN).
    pub hidden: usize,
    pub dropout: f32,
    /// ReLU on the SGC output.
    pub use_relu: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset: "cora".to_string(),
            data_dir: PathBuf::from("data"),
            normalization: grafene_core::DEFAULT_SCHEME.to_string(),
            model: "SGC".to_string(),
            degree: 2,
            seed: DEFAULT_SEED,
            cuda: false,
            val_size: grafene_data::DEFAULT_VAL_SIZE,
            epochs: 100,
            lr: 0.2,
            weight_decay: 5e-6,
            hidden: 16,
            dropout: 0.0,
            use_relu: false,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Reject values no run could use.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(Error::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if !self.lr.is_finite() || self.lr <= 0.0 {
            return Err(Error::InvalidConfig(format!("lr must be positive, got {}", self.lr)));
        }
        if !self.weight_decay.is_finite() || self.weight_decay < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "weight_decay must be non-negative, got {}",
                self.weight_decay
            )));
        }
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be positive".into()));
        }
        Ok(())
    }
}
