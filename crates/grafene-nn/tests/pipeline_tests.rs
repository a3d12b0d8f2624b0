//! Pipeline runs over small on-disk datasets.
//!
//! Both fixtures have two classes (node parity) with class-revealing
//! features and edges mostly inside each class.

use grafene_core::CsrMatrix;
use grafene_data::formats::{
    write_adjacency_lists, write_dense_matrix, write_index_file, write_json, write_sparse_matrix,
};
use grafene_data::social::SocialBundle;
use grafene_nn::{Error, ModelKind, Pipeline, PipelineConfig};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::TempDir;

const N: usize = 10;

fn features(ids: &[usize]) -> CsrMatrix {
    let mut triplets = Vec::new();
    for (k, &id) in ids.iter().enumerate() {
        triplets.push((k, id % 2, 1.0));
        triplets.push((k, 2, 1.0));
    }
    CsrMatrix::from_triplets((ids.len(), 3), &triplets).unwrap()
}

fn one_hot(ids: &[usize]) -> Array2<f32> {
    let mut y = Array2::zeros((ids.len(), 2));
    for (k, &id) in ids.iter().enumerate() {
        y[[k, id % 2]] = 1.0;
    }
    y
}

fn write_cora(dir: &Path) {
    let path = |suffix: &str| dir.join(format!("ind.cora.{suffix}"));
    let train: Vec<usize> = (0..4).collect();
    let allx: Vec<usize> = (0..8).collect();
    let test = [9, 8];

    write_sparse_matrix(path("x"), &features(&train)).unwrap();
    write_dense_matrix(path("y"), one_hot(&train).view()).unwrap();
    write_sparse_matrix(path("allx"), &features(&allx)).unwrap();
    write_dense_matrix(path("ally"), one_hot(&allx).view()).unwrap();
    write_sparse_matrix(path("tx"), &features(&test)).unwrap();
    write_dense_matrix(path("ty"), one_hot(&test).view()).unwrap();
    write_index_file(path("test.index"), &test).unwrap();

    // Chains over the even and the odd nodes, bridged at 0-1.
    let mut graph: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for node in 0..N - 2 {
        graph.entry(node).or_default().push(node + 2);
    }
    graph.entry(0).or_default().push(1);
    write_adjacency_lists(path("graph"), &graph).unwrap();
}

fn write_reddit(dir: &Path) {
    let mut triplets = Vec::new();
    for node in 0..N - 2 {
        triplets.push((node, node + 2, 1.0));
    }
    let adj = CsrMatrix::from_triplets((N, N), &triplets).unwrap();
    write_sparse_matrix(dir.join("reddit_adj.json"), &adj).unwrap();

    let class = |ids: &[usize]| ids.iter().map(|&i| (i % 2) as u32).collect::<Vec<_>>();
    let (train, val, test) = (vec![0, 1, 2, 3, 4, 5], vec![6, 7], vec![8, 9]);
    let bundle = SocialBundle {
        feats: (0..N).map(|i| vec![(i % 2) as f32, i as f32 * 0.01]).collect(),
        y_train: class(&train),
        y_val: class(&val),
        y_test: class(&test),
        train_index: train,
        val_index: val,
        test_index: test,
    };
    write_json(dir.join("reddit.json"), &bundle).unwrap();
}

fn config(dataset: &str, dir: &Path, model: &str) -> PipelineConfig {
    PipelineConfig {
        val_size: 2,
        epochs: 60,
        ..Default::default()
    }
    .with_dataset(dataset)
    .with_data_dir(dir)
    .with_model(model)
}

#[test]
fn sgc_on_citation_dataset() {
    let dir = TempDir::new().unwrap();
    write_cora(dir.path());

    let mut pipeline = Pipeline::new(config("cora", dir.path(), "SGC")).unwrap();
    let mut epochs = 0;
    let report = pipeline.run(|_, _| epochs += 1).unwrap();

    assert_eq!(epochs, 60);
    assert_eq!(report.model, ModelKind::Sgc);
    assert_eq!(report.num_nodes, N);
    assert_eq!(report.num_classes, 2);
    let history = &report.training.loss_history;
    assert!(history.last().unwrap() < &history[0]);
    assert!(report.training.val_accuracy.is_some());
    assert!(report.training.test_accuracy.is_some());
}

#[test]
fn gcn_on_citation_dataset() {
    let dir = TempDir::new().unwrap();
    write_cora(dir.path());

    let mut config = config("cora", dir.path(), "GCN");
    config.lr = 0.01;
    config.dropout = 0.5;
    let mut pipeline = Pipeline::new(config).unwrap();
    let report = pipeline.run(|_, _| {}).unwrap();

    assert_eq!(report.model, ModelKind::Gcn);
    assert_eq!(report.precompute_time, std::time::Duration::ZERO);
    assert!(report.training.loss_history.iter().all(|l| l.is_finite()));
}

#[test]
fn same_seed_same_run() {
    let dir = TempDir::new().unwrap();
    write_cora(dir.path());

    let run = |seed| {
        let mut config = config("cora", dir.path(), "GCN");
        config.dropout = 0.5;
        let mut pipeline = Pipeline::new(config).unwrap();
        pipeline.set_seed(seed);
        pipeline.run(|_, _| {}).unwrap().training.loss_history
    };
    assert_eq!(run(3), run(3));
    assert_ne!(run(3), run(4));

    // A seed set in the config matches one set on the pipeline.
    let mut configured = config("cora", dir.path(), "GCN").with_seed(3);
    configured.dropout = 0.5;
    let mut pipeline = Pipeline::new(configured).unwrap();
    assert_eq!(pipeline.run(|_, _| {}).unwrap().training.loss_history, run(3));
}

#[test]
fn sgc_on_social_dataset_uses_training_subgraph() {
    let dir = TempDir::new().unwrap();
    write_reddit(dir.path());

    let pipeline = Pipeline::new(config("reddit", dir.path(), "SGC")).unwrap();
    let prepared = pipeline.prepare().unwrap();
    let propagated = prepared.propagated.as_ref().unwrap();
    assert_eq!(propagated.features.dim(), (N, 2));
    assert_eq!(propagated.train_features.as_ref().unwrap().dim(), (6, 2));
    assert_eq!(prepared.train_adjacency().unwrap().num_nodes(), 6);

    let mut pipeline = pipeline;
    let report = pipeline.run(|_, _| {}).unwrap();
    assert_eq!(report.num_nodes, N);
    assert!(report.training.test_accuracy.is_some());
}

#[test]
fn gcn_on_social_dataset_trains_on_training_subgraph() {
    let dir = TempDir::new().unwrap();
    write_reddit(dir.path());

    let mut pipeline = Pipeline::new(config("reddit", dir.path(), "GCN")).unwrap();
    let prepared = pipeline.prepare().unwrap();
    let inputs = pipeline.to_tensors(&prepared).unwrap().into_training_inputs();
    assert_eq!(inputs.train_features.dims(), &[6, 2]);
    assert_eq!(inputs.train_adjacency.as_ref().unwrap().dims(), &[6, 6]);
    assert_eq!(inputs.eval_adjacency.as_ref().unwrap().dims(), &[N, N]);

    let report = pipeline.run(|_, _| {}).unwrap();
    assert_eq!(report.model, ModelKind::Gcn);
    assert!(report.training.loss_history.iter().all(|l| l.is_finite()));
    assert!(report.training.test_accuracy.is_some());
}

#[test]
fn unknown_names_fail_before_loading() {
    // The data directory does not exist: only name validation can fail first.
    let missing = Path::new("/nonexistent/grafene");
    assert!(matches!(
        Pipeline::new(config("cora", missing, "MLP")),
        Err(Error::UnknownModelKind(_))
    ));

    let mut bad_scheme = config("cora", missing, "SGC");
    bad_scheme.normalization = "FirstOrderGCN".into();
    assert!(matches!(
        Pipeline::new(bad_scheme),
        Err(Error::Core(grafene_core::Error::UnknownNormalizationScheme(_)))
    ));
}

#[test]
fn missing_artifacts_surface_as_data_errors() {
    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::new(config("cora", dir.path(), "SGC")).unwrap();
    assert!(matches!(
        pipeline.prepare(),
        Err(Error::Data(grafene_data::Error::MissingArtifact(_)))
    ));
}
