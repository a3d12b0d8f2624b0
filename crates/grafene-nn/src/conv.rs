//! Layers for node classification.
//!
//! - [`Dense`]: fully connected layer, `X Wᵀ + b`
//! - [`GraphConv`]: graph convolution (Kipf & Welling, 2017), `S (X Wᵀ + b)`
//! - [`dropout`]: inverted dropout driven by a [`RandomContext`]
//!
//! Parameters are `candle_core::Var`s initialized uniformly in
//! `[-1/√in, 1/√in]` from the caller's [`RandomContext`], so a model built
//! twice from the same seed is bit-identical.

use candle_core::{Device, Module, Tensor, Var};
use candle_nn::Linear;

use crate::{RandomContext, Result};

/// Fully connected layer.
pub struct Dense {
    linear: Linear,
    weight: Var,
    bias: Var,
    in_features: usize,
    out_features: usize,
}

impl Dense {
    /// Create a new dense layer.
    ///
    /// # Arguments
    /// - `in_features`: Input feature dimension
    /// - `out_features`: Output feature dimension
    /// - `rng`: Source of the initial weights and biases
    /// - `device`: Device the parameters live on
    pub fn new(
        in_features: usize,
        out_features: usize,
        rng: &mut RandomContext,
        device: &Device,
    ) -> Result<Self> {
        let bound = 1.0 / (in_features.max(1) as f32).sqrt();
        let weight = Var::from_vec(
            rng.uniform_vec(out_features * in_features, bound),
            (out_features, in_features),
            device,
        )?;
        let bias = Var::from_vec(rng.uniform_vec(out_features, bound), out_features, device)?;
        let linear = Linear::new(weight.as_tensor().clone(), Some(bias.as_tensor().clone()));
        Ok(Self {
            linear,
            weight,
            bias,
            in_features,
            out_features,
        })
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// Trainable parameters: weight, then bias.
    pub fn vars(&self) -> Vec<Var> {
        vec![self.weight.clone(), self.bias.clone()]
    }

    /// `x Wᵀ + b` for `x` of shape (N x in_features).
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        Ok(self.linear.forward(x)?)
    }
}

/// Graph convolution layer.
///
/// Implements: H' = S (H Wᵀ + b)
///
/// Where:
/// - S is the normalized propagation operator (self-loops included)
/// - H is the node feature matrix
/// - W, b are the layer parameters
///
/// The bias is added before aggregation, so each node receives its
/// neighbors' biased messages.
///
/// # Reference
///
/// Kipf & Welling, "Semi-Supervised Classification with Graph Convolutional
/// Networks", ICLR 2017.
pub struct GraphConv {
    dense: Dense,
}

impl GraphConv {
    /// Create a new graph convolution layer.
    ///
    /// # Arguments
    /// - `in_features`: Input feature dimension
    /// - `out_features`: Output feature dimension
    /// - `rng`: Source of the initial parameters
    /// - `device`: Device the parameters live on
    pub fn new(
        in_features: usize,
        out_features: usize,
        rng: &mut RandomContext,
        device: &Device,
    ) -> Result<Self> {
        Ok(Self {
            dense: Dense::new(in_features, out_features, rng, device)?,
        })
    }

    pub fn vars(&self) -> Vec<Var> {
        self.dense.vars()
    }

    /// Forward pass.
    ///
    /// # Arguments
    /// - `x`: Node features (N x in_features)
    /// - `adj`: Normalized propagation operator (N x N)
    ///
    /// # Returns
    /// - Node representations (N x out_features)
    pub fn forward(&self, x: &Tensor, adj: &Tensor) -> Result<Tensor> {
        // Linear transform, then neighborhood aggregation.
        let h = self.dense.forward(x)?;
        Ok(adj.matmul(&h)?)
    }
}

/// Inverted dropout.
///
/// Identity when `train` is false or `p == 0`.
pub fn dropout(x: &Tensor, p: f32, train: bool, rng: &mut RandomContext) -> Result<Tensor> {
    if !train || p == 0.0 {
        return Ok(x.clone());
    }
    let (rows, cols) = x.dims2()?;
    let mask = rng.dropout_mask((rows, cols), p, x.device())?;
    Ok(x.mul(&mask)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;

    #[test]
    fn test_dense_forward_shape() {
        let device = Device::Cpu;
        let mut rng = RandomContext::new(0);
        let dense = Dense::new(64, 7, &mut rng, &device).unwrap();

        let x = Tensor::ones((10, 64), DType::F32, &device).unwrap();
        let out = dense.forward(&x).unwrap();
        assert_eq!(out.dims(), &[10, 7]);
        assert_eq!(dense.vars().len(), 2);
    }

    #[test]
    fn test_dense_init_bounds() {
        let mut rng = RandomContext::new(1);
        let dense = Dense::new(16, 4, &mut rng, &Device::Cpu).unwrap();
        for var in dense.vars() {
            let values: Vec<f32> = var.as_tensor().flatten_all().unwrap().to_vec1().unwrap();
            assert!(values.iter().all(|v| v.abs() <= 0.25));
        }
    }

    #[test]
    fn test_gcn_forward_identity_adjacency() {
        let device = Device::Cpu;
        let mut rng = RandomContext::new(2);
        let gcn = GraphConv::new(8, 3, &mut rng, &device).unwrap();

        let x = Tensor::ones((5, 8), DType::F32, &device).unwrap();
        let adj = Tensor::eye(5, DType::F32, &device).unwrap();

        let out = gcn.forward(&x, &adj).unwrap();
        let plain = gcn.dense.forward(&x).unwrap();
        assert_eq!(out.dims(), &[5, 3]);
        assert_eq!(
            out.to_vec2::<f32>().unwrap(),
            plain.to_vec2::<f32>().unwrap()
        );
    }

    #[test]
    fn test_gcn_aggregates_neighbors() {
        let device = Device::Cpu;
        let mut rng = RandomContext::new(3);
        let gcn = GraphConv::new(2, 2, &mut rng, &device).unwrap();

        let x = Tensor::new(&[[1.0f32, 0.0], [0.0, 1.0]], &device).unwrap();
        // Swap operator: each node sees only the other.
        let adj = Tensor::new(&[[0.0f32, 1.0], [1.0, 0.0]], &device).unwrap();

        let out = gcn.forward(&x, &adj).unwrap().to_vec2::<f32>().unwrap();
        let plain = gcn.dense.forward(&x).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(out[0], plain[1]);
        assert_eq!(out[1], plain[0]);
    }

    #[test]
    fn test_dropout_eval_is_identity() {
        let mut rng = RandomContext::new(4);
        let x = Tensor::ones((4, 4), DType::F32, &Device::Cpu).unwrap();
        let out = dropout(&x, 0.5, false, &mut rng).unwrap();
        assert_eq!(out.to_vec2::<f32>().unwrap(), x.to_vec2::<f32>().unwrap());
    }
}
