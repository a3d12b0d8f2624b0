//! Node classifiers and the model registry.
//!
//! | Kind | Input | Architecture |
//! |------|-------|--------------|
//! | `GCN` | raw features + operator | GraphConv → ReLU → dropout → GraphConv |
//! | `SGC` | precomputed `SᴷX` | Dense → (ReLU) → dropout |
//!
//! SGC moves all graph work into preprocessing, so its forward pass never
//! touches the operator.

use std::fmt;
use std::str::FromStr;

use candle_core::{Device, Tensor, Var};

use crate::conv::{dropout, Dense, GraphConv};
use crate::{Error, RandomContext, Result};

/// Registered model architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Gcn,
    Sgc,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Gcn, ModelKind::Sgc];

    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Gcn => "GCN",
            ModelKind::Sgc => "SGC",
        }
    }

    /// Whether the model consumes features already propagated by the pipeline.
    pub fn uses_precomputed_features(self) -> bool {
        matches!(self, ModelKind::Sgc)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::UnknownModelKind(s.to_string()))
    }
}

/// Hyper-parameters shared by every architecture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSpec {
    pub num_features: usize,
    pub num_classes: usize,
    /// Hidden width (GCN only).
    pub hidden: usize,
    pub dropout: f32,
    /// ReLU on the output logits (SGC only).
    pub use_relu: bool,
}

/// A model mapping node features to class logits.
pub trait NodeClassifier {
    fn kind(&self) -> ModelKind;

    /// Logits of shape (N x num_classes).
    ///
    /// `adj` is required by models that aggregate over the graph and
    /// ignored by the others. Dropout is applied only when `train` is set.
    fn forward(
        &self,
        x: &Tensor,
        adj: Option<&Tensor>,
        train: bool,
        rng: &mut RandomContext,
    ) -> Result<Tensor>;

    /// Trainable parameters.
    fn vars(&self) -> Vec<Var>;
}

/// Two-layer graph convolutional network.
pub struct Gcn {
    gc1: GraphConv,
    gc2: GraphConv,
    dropout: f32,
}

impl Gcn {
    pub fn new(spec: &ModelSpec, rng: &mut RandomContext, device: &Device) -> Result<Self> {
        Ok(Self {
            gc1: GraphConv::new(spec.num_features, spec.hidden, rng, device)?,
            gc2: GraphConv::new(spec.hidden, spec.num_classes, rng, device)?,
            dropout: spec.dropout,
        })
    }
}

impl NodeClassifier for Gcn {
    fn kind(&self) -> ModelKind {
        ModelKind::Gcn
    }

    fn forward(
        &self,
        x: &Tensor,
        adj: Option<&Tensor>,
        train: bool,
        rng: &mut RandomContext,
    ) -> Result<Tensor> {
        let adj = adj.ok_or_else(|| Error::Training("GCN forward needs the propagation operator".into()))?;
        let h = self.gc1.forward(x, adj)?.relu()?;
        let h = dropout(&h, self.dropout, train, rng)?;
        self.gc2.forward(&h, adj)
    }

    fn vars(&self) -> Vec<Var> {
        let mut vars = self.gc1.vars();
        vars.extend(self.gc2.vars());
        vars
    }
}

/// Simplified graph convolution: logistic regression over `SᴷX`.
pub struct Sgc {
    linear: Dense,
    dropout: f32,
    use_relu: bool,
}

impl Sgc {
    pub fn new(spec: &ModelSpec, rng: &mut RandomContext, device: &Device) -> Result<Self> {
        Ok(Self {
            linear: Dense::new(spec.num_features, spec.num_classes, rng, device)?,
            dropout: spec.dropout,
            use_relu: spec.use_relu,
        })
    }
}

impl NodeClassifier for Sgc {
    fn kind(&self) -> ModelKind {
        ModelKind::Sgc
    }

    fn forward(
        &self,
        x: &Tensor,
        _adj: Option<&Tensor>,
        train: bool,
        rng: &mut RandomContext,
    ) -> Result<Tensor> {
        let mut h = self.linear.forward(x)?;
        if self.use_relu {
            h = h.relu()?;
        }
        dropout(&h, self.dropout, train, rng)
    }

    fn vars(&self) -> Vec<Var> {
        self.linear.vars()
    }
}

/// Instantiate `kind` with parameters drawn from `rng`.
pub fn build_model(
    kind: ModelKind,
    spec: &ModelSpec,
    rng: &mut RandomContext,
    device: &Device,
) -> Result<Box<dyn NodeClassifier>> {
    if spec.num_features == 0 || spec.num_classes == 0 {
        return Err(Error::InvalidConfig(format!(
            "model needs at least one feature and one class, got {} and {}",
            spec.num_features, spec.num_classes
        )));
    }
    if kind == ModelKind::Gcn && spec.hidden == 0 {
        return Err(Error::InvalidConfig("GCN hidden width must be positive".into()));
    }
    Ok(match kind {
        ModelKind::Gcn => Box::new(Gcn::new(spec, rng, device)?),
        ModelKind::Sgc => Box::new(Sgc::new(spec, rng, device)?),
    })
}
