//! Grafene CLI - graph preprocessing and GCN/SGC training from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Load a dataset and show its statistics
//! grafene stats --dataset cora --data-dir data/
//!
//! # Propagate features (SGC precompute) and save them
//! grafene precompute --dataset cora --degree 2 -o cora_s2x.json
//!
//! # Train and evaluate
//! grafene train --dataset citeseer --model GCN --lr 0.01 --dropout 0.5
//!
//! # Start from a JSON config; flags override its fields
//! grafene train --config runs/reddit.json --epochs 2
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` or pass `--verbose` for more detail.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use grafene_data::formats::write_dense_matrix;
use grafene_nn::{Pipeline, PipelineConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "grafene")]
#[command(about = "Graph preprocessing and GCN/SGC node classification", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a dataset and show statistics
    Stats {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Propagate features over the normalized graph
    Precompute {
        #[command(flatten)]
        run: RunArgs,

        /// Write the propagated features as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Train and evaluate a model
    Train {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        train: TrainArgs,
    },
}

/// Dataset and preprocessing options shared by every subcommand.
#[derive(Args)]
struct RunArgs {
    /// JSON config used as the base; flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset (cora, citeseer, pubmed, reddit)
    #[arg(short, long)]
    dataset: Option<String>,

    /// Directory holding the dataset artifacts
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Normalization scheme (AugNormAdj, NormAdj, AugRWalk)
    #[arg(long)]
    normalization: Option<String>,

    /// Propagation degree
    #[arg(long)]
    degree: Option<usize>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Validation window size (citation datasets)
    #[arg(long)]
    val_size: Option<usize>,

    /// Place tensors on the first CUDA device when available (`--cuda=false` to disable)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    cuda: Option<bool>,
}

#[derive(Args)]
struct TrainArgs {
    /// Model (GCN or SGC)
    #[arg(short, long)]
    model: Option<String>,

    #[arg(long)]
    epochs: Option<usize>,

    /// Learning rate
    #[arg(long)]
    lr: Option<f64>,

    #[arg(long)]
    weight_decay: Option<f64>,

    /// Hidden width (GCN)
    #[arg(long)]
    hidden: Option<usize>,

    #[arg(long)]
    dropout: Option<f32>,

    /// ReLU on the SGC output (`--use-relu=false` to disable)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    use_relu: Option<bool>,
}

impl RunArgs {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if let Some(dataset) = self.dataset {
            config.dataset = dataset;
        }
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(normalization) = self.normalization {
            config.normalization = normalization;
        }
        if let Some(degree) = self.degree {
            config.degree = degree;
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(val_size) = self.val_size {
            config.val_size = val_size;
        }
        if let Some(cuda) = self.cuda {
            config.cuda = cuda;
        }
        Ok(config)
    }
}

impl TrainArgs {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(epochs) = self.epochs {
            config.epochs = epochs;
        }
        if let Some(lr) = self.lr {
            config.lr = lr;
        }
        if let Some(weight_decay) = self.weight_decay {
            config.weight_decay = weight_decay;
        }
        if let Some(hidden) = self.hidden {
            config.hidden = hidden;
        }
        if let Some(dropout) = self.dropout {
            config.dropout = dropout;
        }
        if let Some(use_relu) = self.use_relu {
            config.use_relu = use_relu;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Stats { run } => cmd_stats(run.into_config()?),
        Commands::Precompute { run, output } => cmd_precompute(run.into_config()?, output),
        Commands::Train { run, train } => {
            let mut config = run.into_config()?;
            train.apply(&mut config);
            cmd_train(config)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_pipeline(config: PipelineConfig) -> Result<Pipeline> {
    let dataset = config.dataset.clone();
    Pipeline::new(config).with_context(|| format!("Invalid configuration for {dataset}"))
}

fn cmd_stats(config: PipelineConfig) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Loading {}...", pipeline.config().dataset));
    let dataset = pipeline
        .load()
        .with_context(|| format!("Failed to load {}", pipeline.config().dataset))?;
    pb.finish_with_message(format!("Loaded in {:.2?}", start.elapsed()));

    let op = dataset.adjacency.matrix();
    println!("Dataset Statistics");
    println!("==================");
    println!("Dataset:        {}", dataset.name);
    println!("Nodes:          {}", dataset.num_nodes());
    println!("Edges:          {}", dataset.num_edges);
    println!("Features:       {}", dataset.num_features());
    println!("Classes:        {}", dataset.num_classes());
    println!("Labeled:        {}", dataset.labels.num_labeled());
    println!(
        "Train/Val/Test: {}/{}/{}",
        dataset.split.train.len(),
        dataset.split.val.len(),
        dataset.split.test.len()
    );
    println!("Scheme:         {}", dataset.adjacency.scheme());
    println!("Operator nnz:   {}", op.nnz());
    println!(
        "Symmetric:      {}",
        if op.is_symmetric(1e-6) { "yes" } else { "no" }
    );
    if let Some(train_adj) = &dataset.train_adjacency {
        println!("Train subgraph: {} nodes", train_adj.num_nodes());
    }
    Ok(())
}

fn cmd_precompute(mut config: PipelineConfig, output: Option<PathBuf>) -> Result<()> {
    // Propagation is what SGC consumes; force it regardless of the config's model.
    config.model = "SGC".to_string();
    let pipeline = build_pipeline(config)?;
    let prepared = pipeline
        .prepare()
        .with_context(|| format!("Failed to prepare {}", pipeline.config().dataset))?;

    let (rows, cols) = prepared.features().dim();
    println!(
        "Precomputed degree {} on {} ({rows} x {cols}) in {:.4}s",
        pipeline.config().degree,
        prepared.dataset.name,
        prepared.precompute_time().as_secs_f64()
    );

    if let Some(path) = output {
        write_dense_matrix(&path, prepared.features().view())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn cmd_train(config: PipelineConfig) -> Result<()> {
    let epochs = config.epochs as u64;
    let mut pipeline = build_pipeline(config)?;

    let pb = ProgressBar::new(epochs);
    pb.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} epochs {msg}")
            .context("Invalid progress template")?
            .progress_chars("=> "),
    );
    let report = pipeline
        .run(|_, loss| {
            pb.set_message(format!("loss {loss:.4}"));
            pb.inc(1);
        })
        .with_context(|| format!("Training failed on {}", pipeline.config().dataset))?;
    pb.finish_and_clear();

    let fmt_acc = |acc: Option<f32>| acc.map_or_else(|| "n/a".to_string(), |a| format!("{a:.4}"));
    println!("Model:            {}", report.model);
    println!("Dataset:          {} ({} nodes)", report.dataset, report.num_nodes);
    println!("Validation acc:   {}", fmt_acc(report.training.val_accuracy));
    println!("Test acc:         {}", fmt_acc(report.training.test_accuracy));
    println!("Precompute time:  {:.4}s", report.precompute_time.as_secs_f64());
    println!("Training time:    {:.4}s", report.training.train_time.as_secs_f64());
    Ok(())
}
