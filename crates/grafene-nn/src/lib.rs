// Allow minor clippy style warnings at crate level
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]

//! Node classifiers and the training pipeline.
//!
//! `grafene-nn` sits on top of the preprocessing layer (`grafene-core`) and
//! the dataset loaders (`grafene-data`): it turns a normalized graph into
//! candle tensors, builds a GCN or SGC model and trains it.
//!
//! # Modules
//!
//! - [`random`]: [`RandomContext`], the only source of randomness
//! - [`conv`]: dense and graph-convolution layers, dropout
//! - [`models`]: GCN, SGC and the [`ModelKind`] registry
//! - [`train`]: full-batch AdamW trainer
//! - [`config`]: [`PipelineConfig`]
//! - [`pipeline`]: [`Pipeline`], load → propagate → train
//!
//! # Example
//!
//! ```rust,no_run
//! use grafene_nn::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::default()
//!     .with_dataset("cora")
//!     .with_data_dir("data/")
//!     .with_degree(2);
//! let mut pipeline = Pipeline::new(config)?;
//! pipeline.set_seed(7);
//! let report = pipeline.run(|_, _| {})?;
//! println!("test accuracy: {:?}", report.training.test_accuracy);
//! # Ok::<(), grafene_nn::Error>(())
//! ```

pub mod config;
pub mod conv;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod random;
pub mod train;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use models::{build_model, ModelKind, ModelSpec, NodeClassifier};
pub use pipeline::{GraphTensors, Pipeline, PreparedGraph, RunReport};
pub use random::RandomContext;
pub use train::{TrainConfig, Trainer, TrainingResult};
