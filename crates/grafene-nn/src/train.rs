//! Full-batch training and evaluation.
//!
//! ```text
//! for epoch in 0..epochs:
//!     logits = model(train_features, train_adjacency, train = true)
//!     loss   = cross_entropy(logits[train.rows], train.labels)
//!     AdamW step
//! logits = model(eval_features, eval_adjacency, train = false)
//! accuracy on val.rows and test.rows
//! ```
//!
//! Training and evaluation inputs are separate so that a model can be
//! trained on features propagated over the training subgraph only and then
//! evaluated on features propagated over the full graph.

use std::time::{Duration, Instant};

use candle_core::{DType, Device, Tensor, D};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use tracing::{debug, info};

use crate::models::NodeClassifier;
use crate::{Error, PipelineConfig, RandomContext, Result};

/// Optimizer settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainConfig {
    pub epochs: usize,
    pub lr: f64,
    pub weight_decay: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for TrainConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            epochs: config.epochs,
            lr: config.lr,
            weight_decay: config.weight_decay,
        }
    }
}

/// Rows of a logits matrix and their class ids.
#[derive(Debug, Clone)]
pub struct Targets {
    rows: Tensor,
    labels: Tensor,
    len: usize,
}

impl Targets {
    pub fn new(rows: &[usize], labels: &[u32], device: &Device) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(Error::Training(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        let row_ids = rows
            .iter()
            .map(|&r| u32::try_from(r).map_err(|_| Error::Training(format!("row {r} exceeds u32"))))
            .collect::<Result<Vec<u32>>>()?;
        Ok(Self {
            rows: Tensor::from_vec(row_ids, rows.len(), device)?,
            labels: Tensor::from_vec(labels.to_vec(), labels.len(), device)?,
            len: rows.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fraction of rows whose arg-max logit is the label; `None` when empty.
    pub fn accuracy(&self, logits: &Tensor) -> Result<Option<f32>> {
        if self.is_empty() {
            return Ok(None);
        }
        let predicted = logits.index_select(&self.rows, 0)?.argmax(D::Minus1)?;
        let correct = predicted
            .eq(&self.labels)?
            .to_dtype(DType::F32)?
            .mean_all()?
            .to_scalar::<f32>()?;
        Ok(Some(correct))
    }

    fn loss(&self, logits: &Tensor) -> Result<Tensor> {
        let selected = logits.index_select(&self.rows, 0)?;
        Ok(candle_nn::loss::cross_entropy(&selected, &self.labels)?)
    }
}

/// Tensors consumed by [`Trainer::fit`].
#[derive(Debug, Clone)]
pub struct TrainingInputs {
    pub train_features: Tensor,
    pub train_adjacency: Option<Tensor>,
    /// Rows of `train_features` with their labels.
    pub train: Targets,
    pub eval_features: Tensor,
    pub eval_adjacency: Option<Tensor>,
    /// Rows of `eval_features`.
    pub val: Targets,
    pub test: Targets,
}

/// Outcome of a training run.
#[derive(Debug, Clone)]
pub struct TrainingResult {
    /// Training loss per epoch.
    pub loss_history: Vec<f32>,
    pub val_accuracy: Option<f32>,
    pub test_accuracy: Option<f32>,
    /// Wall-clock time of the optimization loop.
    pub train_time: Duration,
}

impl TrainingResult {
    pub fn final_loss(&self) -> Option<f32> {
        self.loss_history.last().copied()
    }
}

/// Full-batch AdamW trainer with cross-entropy loss.
pub struct Trainer {
    config: TrainConfig,
}

impl Trainer {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Train `model` and evaluate it on the validation and test rows.
    ///
    /// `on_epoch` is called after every optimizer step with the epoch number
    /// (from 1) and its loss.
    pub fn fit(
        &self,
        model: &dyn NodeClassifier,
        inputs: &TrainingInputs,
        rng: &mut RandomContext,
        mut on_epoch: impl FnMut(usize, f32),
    ) -> Result<TrainingResult> {
        if inputs.train.is_empty() {
            return Err(Error::Training("no training rows".into()));
        }
        let params = ParamsAdamW {
            lr: self.config.lr,
            weight_decay: self.config.weight_decay,
            ..Default::default()
        };
        let mut optimizer = AdamW::new(model.vars(), params)?;

        let start = Instant::now();
        let mut loss_history = Vec::with_capacity(self.config.epochs);
        for epoch in 1..=self.config.epochs {
            let logits = model.forward(
                &inputs.train_features,
                inputs.train_adjacency.as_ref(),
                true,
                rng,
            )?;
            let loss = inputs.train.loss(&logits)?;
            optimizer.backward_step(&loss)?;

            let loss = loss.to_scalar::<f32>()?;
            if !loss.is_finite() {
                return Err(Error::Training(format!("loss diverged at epoch {epoch}: {loss}")));
            }
            debug!(epoch, loss, "epoch done");
            loss_history.push(loss);
            on_epoch(epoch, loss);
        }
        let train_time = start.elapsed();

        let logits = model.forward(
            &inputs.eval_features,
            inputs.eval_adjacency.as_ref(),
            false,
            rng,
        )?;
        let val_accuracy = inputs.val.accuracy(&logits)?;
        let test_accuracy = inputs.test.accuracy(&logits)?;

        info!(
            model = %model.kind(),
            epochs = self.config.epochs,
            final_loss = loss_history.last().copied(),
            val_accuracy,
            test_accuracy,
            train_secs = train_time.as_secs_f64(),
            "training finished"
        );

        Ok(TrainingResult {
            loss_history,
            val_accuracy,
            test_accuracy,
            train_time,
        })
    }
}
