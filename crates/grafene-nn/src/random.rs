//! Explicit, seedable randomness.
//!
//! Every stage that needs random numbers (parameter initialization and
//! dropout masks) takes a `&mut RandomContext` instead of
//! reaching for a process-wide generator. Two contexts built from the same
//! seed produce the same stream, so tests can run in parallel and still be
//! reproducible.
//!
//! ```rust
//! use grafene_nn::RandomContext;
//!
//! let mut a = RandomContext::new(7);
//! let mut b = RandomContext::new(7);
//! assert_eq!(a.uniform_vec(4, 1.0), b.uniform_vec(4, 1.0));
//! ```

use candle_core::{Device, Tensor};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use crate::{Error, Result};

/// Seeded generator threaded through initialization and training.
#[derive(Clone)]
pub struct RandomContext {
    seed: u64,
    rng: XorShiftRng,
}

impl std::fmt::Debug for RandomContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomContext").field("seed", &self.seed).finish()
    }
}

impl RandomContext {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: XorShiftRng::seed_from_u64(seed),
        }
    }

    /// Seed this context was last (re)seeded with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Restart the stream from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        *self = Self::new(seed);
    }

    /// `len` samples drawn uniformly from `[-bound, bound]`.
    pub fn uniform_vec(&mut self, len: usize, bound: f32) -> Vec<f32> {
        let bound = bound.abs();
        (0..len).map(|_| self.rng.gen_range(-bound..=bound)).collect()
    }

    /// Inverted-dropout mask: each entry is `0` with probability `p`,
    /// otherwise `1 / (1 - p)`.
    pub fn dropout_mask(&mut self, shape: (usize, usize), p: f32, device: &Device) -> Result<Tensor> {
        if !(0.0..1.0).contains(&p) {
            return Err(Error::InvalidConfig(format!("dropout probability {p} outside [0, 1)")));
        }
        let scale = 1.0 / (1.0 - p);
        let values: Vec<f32> = (0..shape.0 * shape.1)
            .map(|_| if self.rng.gen::<f32>() < p { 0.0 } else { scale })
            .collect();
        Ok(Tensor::from_vec(values, shape, device)?)
    }
}

impl Default for RandomContext {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SEED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = RandomContext::new(42);
        let mut b = RandomContext::new(42);
        assert_eq!(a.uniform_vec(16, 0.5), b.uniform_vec(16, 0.5));
        assert_ne!(
            RandomContext::new(1).uniform_vec(16, 0.5),
            RandomContext::new(2).uniform_vec(16, 0.5)
        );
    }

    #[test]
    fn test_reseed_restarts() {
        let mut ctx = RandomContext::new(3);
        let first = ctx.uniform_vec(8, 1.0);
        ctx.reseed(3);
        assert_eq!(ctx.uniform_vec(8, 1.0), first);
    }

    #[test]
    fn test_uniform_bounds() {
        let mut ctx = RandomContext::new(0);
        assert!(ctx.uniform_vec(1000, 0.25).iter().all(|v| v.abs() <= 0.25));
    }

    #[test]
    fn test_dropout_mask() {
        let mut ctx = RandomContext::new(5);
        let mask = ctx.dropout_mask((20, 10), 0.5, &Device::Cpu).unwrap();
        let values: Vec<f32> = mask.flatten_all().unwrap().to_vec1().unwrap();
        assert!(values.iter().all(|&v| v == 0.0 || v == 2.0));
        assert!(values.iter().any(|&v| v == 0.0));
        assert!(values.iter().any(|&v| v == 2.0));

        let keep_all = ctx.dropout_mask((3, 3), 0.0, &Device::Cpu).unwrap();
        let values: Vec<f32> = keep_all.flatten_all().unwrap().to_vec1().unwrap();
        assert!(values.iter().all(|&v| v == 1.0));

        assert!(ctx.dropout_mask((1, 1), 1.0, &Device::Cpu).is_err());
    }
}
