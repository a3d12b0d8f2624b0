//! From raw artifacts to a trained classifier.
//!
//! ```text
//! Pipeline::new ── validate config, resolve scheme + model kind (fail fast)
//!      │
//!      ├── prepare ──── load dataset ── SGC: precompute SᴷX
//!      │                                 (social family: train rows over
//!      │                                  the training subgraph as well)
//!      ├── to_tensors ─ features, dense operator (GCN) and targets on the device
//!      │                (social family: GCN trains on the training subgraph)
//!      │
//!      └── run ──────── build model from the RandomContext ── fit ── report
//! ```
//!
//! The pipeline owns the [`RandomContext`]; [`Pipeline::set_seed`] resets it,
//! and every model built afterwards draws from the reset stream.

use std::sync::Arc;
use std::time::{Duration, Instant};

use candle_core::{Device, Tensor};
use grafene_core::{precompute, AdjacencyNormalizer, NormalizerRegistry, PropagationOperator};
use grafene_data::{load_dataset, Dataset, LabelVector, LoadOptions, Split};
use ndarray::{Array2, ArrayView2, Axis};
use tracing::{debug, info, instrument};

use crate::models::{build_model, ModelKind, ModelSpec};
use crate::train::{Targets, TrainConfig, Trainer, TrainingInputs, TrainingResult};
use crate::{Error, PipelineConfig, RandomContext, Result};

/// Features after SGC propagation.
#[derive(Debug, Clone)]
pub struct Propagated {
    /// `SᴷX` over the full graph.
    pub features: Array2<f32>,
    /// `S_Tᴷ X_T` over the training subgraph, when the dataset has one.
    pub train_features: Option<Array2<f32>>,
    pub elapsed: Duration,
}

/// A loaded dataset plus optional precomputed features.
#[derive(Debug, Clone)]
pub struct PreparedGraph {
    pub dataset: Dataset,
    pub propagated: Option<Propagated>,
}

impl PreparedGraph {
    pub fn adjacency(&self) -> &Arc<PropagationOperator> {
        &self.dataset.adjacency
    }

    pub fn train_adjacency(&self) -> Option<&Arc<PropagationOperator>> {
        self.dataset.train_adjacency.as_ref()
    }

    /// Features handed to the model: propagated when available, raw otherwise.
    pub fn features(&self) -> &Array2<f32> {
        self.propagated
            .as_ref()
            .map_or(&self.dataset.features, |p| &p.features)
    }

    pub fn labels(&self) -> &LabelVector {
        &self.dataset.labels
    }

    pub fn split(&self) -> &Split {
        &self.dataset.split
    }

    pub fn precompute_time(&self) -> Duration {
        self.propagated.as_ref().map_or(Duration::ZERO, |p| p.elapsed)
    }
}

/// Model inputs on the selected device.
#[derive(Debug, Clone)]
pub struct GraphTensors {
    /// Node features (N x F).
    pub features: Tensor,
    /// Training-subgraph features (|train| x F), social family only.
    pub train_features: Option<Tensor>,
    /// Dense operator (N x N), for models that aggregate at run time.
    pub adjacency: Option<Tensor>,
    /// Dense training-subgraph operator (|train| x |train|), GCN on the social family.
    pub train_adjacency: Option<Tensor>,
    pub train: Targets,
    pub val: Targets,
    pub test: Targets,
}

impl GraphTensors {
    pub fn into_training_inputs(self) -> TrainingInputs {
        TrainingInputs {
            train_features: self.train_features.unwrap_or_else(|| self.features.clone()),
            train_adjacency: self.train_adjacency.or_else(|| self.adjacency.clone()),
            train: self.train,
            eval_features: self.features,
            eval_adjacency: self.adjacency,
            val: self.val,
            test: self.test,
        }
    }
}

/// Summary of [`Pipeline::run`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub dataset: String,
    pub model: ModelKind,
    pub num_nodes: usize,
    pub num_classes: usize,
    pub precompute_time: Duration,
    pub training: TrainingResult,
}

/// Seeded preprocessing and training orchestrator.
pub struct Pipeline {
    config: PipelineConfig,
    normalizer: Arc<dyn AdjacencyNormalizer>,
    model_kind: ModelKind,
    rng: RandomContext,
    device: Device,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("normalizer", &self.normalizer.name())
            .field("model_kind", &self.model_kind)
            .field("rng", &self.rng)
            .finish()
    }
}

impl Pipeline {
    /// Build with the default normalizer registry.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_registry(config, &NormalizerRegistry::with_defaults())
    }

    /// Build with a custom normalizer registry.
    ///
    /// Unknown schemes and model kinds fail here, before any data is read.
    pub fn with_registry(config: PipelineConfig, registry: &NormalizerRegistry) -> Result<Self> {
        config.validate()?;
        let normalizer = registry.get(&config.normalization)?;
        let model_kind: ModelKind = config.model.parse()?;
        let device = select_device(config.cuda)?;
        let rng = RandomContext::new(config.seed);
        debug!(
            scheme = normalizer.name(),
            model = %model_kind,
            device = ?device,
            "pipeline configured"
        );
        Ok(Self {
            config,
            normalizer,
            model_kind,
            rng,
            device,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn model_kind(&self) -> ModelKind {
        self.model_kind
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn rng_mut(&mut self) -> &mut RandomContext {
        &mut self.rng
    }

    /// Reset all randomness to `seed`.
    pub fn set_seed(&mut self, seed: u64) {
        self.config.seed = seed;
        self.rng.reseed(seed);
        debug!(seed, "random context reseeded");
    }

    /// Load and normalize the configured dataset.
    pub fn load(&self) -> Result<Dataset> {
        let options = LoadOptions::new(&self.config.dataset, &self.config.data_dir)
            .with_val_size(self.config.val_size);
        Ok(load_dataset(&options, self.normalizer.as_ref())?)
    }

    /// Load the dataset and, for models that need it, precompute propagated features.
    #[instrument(skip_all, fields(dataset = %self.config.dataset))]
    pub fn prepare(&self) -> Result<PreparedGraph> {
        let dataset = self.load()?;
        self.prepare_dataset(dataset)
    }

    /// Precompute for an already loaded dataset.
    pub fn prepare_dataset(&self, dataset: Dataset) -> Result<PreparedGraph> {
        if !self.model_kind.uses_precomputed_features() {
            return Ok(PreparedGraph {
                dataset,
                propagated: None,
            });
        }

        let degree = self.config.degree;
        let (features, mut elapsed) =
            precompute(dataset.features.clone(), &dataset.adjacency, degree)?;
        let train_features = match &dataset.train_adjacency {
            Some(train_adj) => {
                let rows = dataset.features.select(Axis(0), &dataset.split.train);
                let (train_features, train_elapsed) = precompute(rows, train_adj, degree)?;
                elapsed += train_elapsed;
                Some(train_features)
            }
            None => None,
        };
        info!(
            degree,
            precompute_secs = elapsed.as_secs_f64(),
            train_subgraph = train_features.is_some(),
            "features propagated"
        );
        Ok(PreparedGraph {
            dataset,
            propagated: Some(Propagated {
                features,
                train_features,
                elapsed,
            }),
        })
    }

    /// Move model inputs to the configured device.
    pub fn to_tensors(&self, prepared: &PreparedGraph) -> Result<GraphTensors> {
        let start = Instant::now();
        let split = prepared.split();
        let features = array_to_tensor(prepared.features().view(), &self.device)?;
        let (train_features, adjacency, train_adjacency) =
            if self.model_kind.uses_precomputed_features() {
                let train_features = prepared
                    .propagated
                    .as_ref()
                    .and_then(|p| p.train_features.as_ref())
                    .map(|t| array_to_tensor(t.view(), &self.device))
                    .transpose()?;
                (train_features, None, None)
            } else {
                let dense = prepared.adjacency().matrix().to_dense();
                let adjacency = array_to_tensor(dense.view(), &self.device)?;
                match prepared.train_adjacency() {
                    // Training never aggregates over validation or test nodes.
                    Some(train_adj) => {
                        let rows = prepared.features().select(Axis(0), &split.train);
                        let train_dense = train_adj.matrix().to_dense();
                        (
                            Some(array_to_tensor(rows.view(), &self.device)?),
                            Some(adjacency),
                            Some(array_to_tensor(train_dense.view(), &self.device)?),
                        )
                    }
                    None => (None, Some(adjacency), None),
                }
            };

        let labels = prepared.labels();
        let train_labels = gather_labels(labels, &split.train, "train")?;
        let train = if train_features.is_some() {
            let rows: Vec<usize> = (0..split.train.len()).collect();
            Targets::new(&rows, &train_labels, &self.device)?
        } else {
            Targets::new(&split.train, &train_labels, &self.device)?
        };
        let val = Targets::new(&split.val, &gather_labels(labels, &split.val, "val")?, &self.device)?;
        let test = Targets::new(&split.test, &gather_labels(labels, &split.test, "test")?, &self.device)?;

        debug!(
            elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
            dense_adjacency = adjacency.is_some(),
            "tensors ready"
        );
        Ok(GraphTensors {
            features,
            train_features,
            adjacency,
            train_adjacency,
            train,
            val,
            test,
        })
    }

    /// Prepare, build the model and train it, reporting progress per epoch.
    #[instrument(skip_all, fields(dataset = %self.config.dataset, model = %self.model_kind))]
    pub fn run(&mut self, on_epoch: impl FnMut(usize, f32)) -> Result<RunReport> {
        let prepared = self.prepare()?;
        let inputs = self.to_tensors(&prepared)?.into_training_inputs();

        let dataset = &prepared.dataset;
        let spec = ModelSpec {
            num_features: dataset.num_features(),
            num_classes: dataset.num_classes(),
            hidden: self.config.hidden,
            dropout: self.config.dropout,
            use_relu: self.config.use_relu,
        };
        let model = build_model(self.model_kind, &spec, &mut self.rng, &self.device)?;
        let trainer = Trainer::new(TrainConfig::from(&self.config));
        let training = trainer.fit(model.as_ref(), &inputs, &mut self.rng, on_epoch)?;

        Ok(RunReport {
            dataset: dataset.name.clone(),
            model: self.model_kind,
            num_nodes: dataset.num_nodes(),
            num_classes: spec.num_classes,
            precompute_time: prepared.precompute_time(),
            training,
        })
    }
}

/// `Device::Cpu`, or the first CUDA device when requested and available.
pub fn select_device(cuda: bool) -> Result<Device> {
    if cuda {
        Ok(Device::cuda_if_available(0)?)
    } else {
        Ok(Device::Cpu)
    }
}

fn array_to_tensor(array: ArrayView2<'_, f32>, device: &Device) -> Result<Tensor> {
    let values: Vec<f32> = array.iter().copied().collect();
    Ok(Tensor::from_vec(values, array.dim(), device)?)
}

fn gather_labels(labels: &LabelVector, nodes: &[usize], partition: &str) -> Result<Vec<u32>> {
    labels.gather(nodes).map_err(|e| match e {
        grafene_data::Error::Unlabeled(node) => {
            Error::Training(format!("node {node} in the {partition} partition has no label"))
        }
        other => other.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use grafene_core::CsrMatrix;
    use ndarray::array;

    fn toy_dataset(train_adjacency: bool) -> Dataset {
        let adj = CsrMatrix::from_triplets(
            (4, 4),
            &[(0, 1, 1.0), (1, 0, 1.0), (1, 2, 1.0), (2, 1, 1.0), (2, 3, 1.0), (3, 2, 1.0)],
        )
        .unwrap();
        let normalizer = grafene_core::normalize::AugNormAdj;
        let train_adj = grafene_core::graph::induced_subgraph(&adj, &[0, 1]).unwrap();
        Dataset {
            name: "toy".into(),
            adjacency: Arc::new(normalizer.normalize(&adj).unwrap()),
            train_adjacency: train_adjacency.then(|| Arc::new(normalizer.normalize(&train_adj).unwrap())),
            features: array![[1.0f32, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 1.0]],
            labels: LabelVector::from_options(vec![Some(0), Some(0), Some(1), Some(1)]),
            split: Split::new(vec![0, 1], vec![2], vec![3]),
            num_edges: 3,
        }
    }

    #[test]
    fn test_fails_fast_on_unknown_names() {
        let config = PipelineConfig::default().with_model("GAT");
        assert!(matches!(Pipeline::new(config), Err(Error::UnknownModelKind(_))));

        let config = PipelineConfig {
            normalization: "Laplacian".into(),
            ..Default::default()
        };
        assert!(matches!(
            Pipeline::new(config),
            Err(Error::Core(grafene_core::Error::UnknownNormalizationScheme(_)))
        ));
    }

    #[test]
    fn test_set_seed_resets_stream() {
        let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let first = pipeline.rng_mut().uniform_vec(4, 1.0);
        pipeline.set_seed(42);
        assert_eq!(pipeline.rng_mut().uniform_vec(4, 1.0), first);
        pipeline.set_seed(43);
        assert_eq!(pipeline.config().seed, 43);
        assert_ne!(pipeline.rng_mut().uniform_vec(4, 1.0), first);
    }

    #[test]
    fn test_sgc_prepare_propagates() {
        let pipeline = Pipeline::new(PipelineConfig::default().with_degree(0)).unwrap();
        let prepared = pipeline.prepare_dataset(toy_dataset(false)).unwrap();
        assert_eq!(prepared.features(), &prepared.dataset.features);

        let pipeline = Pipeline::new(PipelineConfig::default().with_degree(2)).unwrap();
        let prepared = pipeline.prepare_dataset(toy_dataset(false)).unwrap();
        assert_ne!(prepared.features(), &prepared.dataset.features);
        assert!(prepared.propagated.as_ref().unwrap().train_features.is_none());
    }

    #[test]
    fn test_social_sgc_uses_training_subgraph() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let prepared = pipeline.prepare_dataset(toy_dataset(true)).unwrap();
        let train_features = prepared.propagated.as_ref().unwrap().train_features.as_ref().unwrap();
        // Nodes 0 and 1 see only each other: identical rows stay [1, 0].
        assert_eq!(train_features.dim(), (2, 2));
        for row in train_features.rows() {
            assert!((row[0] - 1.0).abs() < 1e-6);
            assert!(row[1].abs() < 1e-6);
        }

        let tensors = pipeline.to_tensors(&prepared).unwrap();
        assert!(tensors.adjacency.is_none());
        assert_eq!(tensors.train_features.as_ref().unwrap().dims(), &[2, 2]);
        assert_eq!(tensors.features.dims(), &[4, 2]);
    }

    #[test]
    fn test_gcn_tensors_carry_dense_operator() {
        let pipeline = Pipeline::new(PipelineConfig::default().with_model("GCN")).unwrap();
        let prepared = pipeline.prepare_dataset(toy_dataset(false)).unwrap();
        assert!(prepared.propagated.is_none());

        let tensors = pipeline.to_tensors(&prepared).unwrap();
        assert!(tensors.train_features.is_none());
        assert!(tensors.train_adjacency.is_none());
        let adj = tensors.adjacency.unwrap().to_vec2::<f32>().unwrap();
        let expected = prepared.adjacency().matrix().to_dense();
        for (i, row) in adj.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                assert_eq!(v, expected[[i, j]]);
            }
        }
    }

    #[test]
    fn test_social_gcn_trains_on_training_subgraph() {
        let pipeline = Pipeline::new(PipelineConfig::default().with_model("GCN")).unwrap();
        let prepared = pipeline.prepare_dataset(toy_dataset(true)).unwrap();
        let inputs = pipeline.to_tensors(&prepared).unwrap().into_training_inputs();

        assert_eq!(inputs.train_features.dims(), &[2, 2]);
        let train_adj = inputs.train_adjacency.as_ref().unwrap();
        assert_eq!(train_adj.dims(), &[2, 2]);
        let expected = prepared.train_adjacency().unwrap().matrix().to_dense();
        for (i, row) in train_adj.to_vec2::<f32>().unwrap().iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                assert_eq!(v, expected[[i, j]]);
            }
        }
        assert_eq!(inputs.eval_features.dims(), &[4, 2]);
        assert_eq!(inputs.eval_adjacency.as_ref().unwrap().dims(), &[4, 4]);
    }

    #[test]
    fn test_unlabeled_partition_node_is_training_error() {
        let mut dataset = toy_dataset(false);
        dataset.labels = LabelVector::from_options(vec![Some(0), Some(0), None, Some(1)]);
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let prepared = pipeline.prepare_dataset(dataset).unwrap();
        assert!(matches!(pipeline.to_tensors(&prepared), Err(Error::Training(_))));
    }
}
