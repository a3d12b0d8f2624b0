// Allow minor clippy style warnings at crate level
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]

//! Dataset loaders for node classification benchmarks.
//!
//! Two raw-format families are supported:
//!
//! | Family | Datasets | Loader | Symmetrization |
//! |--------|----------|--------|----------------|
//! | Citation | cora, citeseer, pubmed | [`citation`] | keep max of each directed pair |
//! | Social | reddit | [`social`] | `A + Aᵗ + I` |
//!
//! Both produce a [`Dataset`]: a normalized propagation operator, dense
//! row-aligned features, a [`LabelVector`] and a [`Split`].
//!
//! # Example
//!
//! ```rust,no_run
//! use grafene_core::normalize::AugNormAdj;
//! use grafene_data::{load_dataset, LoadOptions};
//!
//! let options = LoadOptions::new("cora", "data/");
//! let dataset = load_dataset(&options, &AugNormAdj)?;
//! println!("{} nodes, {} classes", dataset.num_nodes(), dataset.num_classes());
//! # Ok::<(), grafene_data::Error>(())
//! ```

pub mod citation;
pub mod dataset;
pub mod error;
pub mod formats;
pub mod labels;
pub mod social;
pub mod split;

pub use dataset::{load_dataset, Dataset, DatasetKind, LoadOptions};
pub use error::{Error, Result};
pub use labels::LabelVector;
pub use split::{Split, DEFAULT_VAL_SIZE};
