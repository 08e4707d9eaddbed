use ndarray::{Array2, ArrayView2};

use super::{Dense, Dropout};
use crate::{Result, arch::activations::ActFn};

#[derive(Debug, Clone)]
pub enum Layer {
    Dense(Dense),
    Dropout(Dropout),
}
use Layer::*;

impl Layer {
    pub fn dense(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self::Dense(super::Dense::new(dim, act_fn))
    }

    pub fn dropout(rate: f32, seed: u64) -> Self {
        Self::Dropout(super::Dropout::new(rate, seed))
    }

    /// Returns the amount of parameters this layer owns in the flat parameter slice.
    pub fn size(&self) -> usize {
        match self {
            Dense(l) => l.size(),
            Dropout(_) => 0,
        }
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        match self {
            Dense(l) => l.forward(params, x),
            Dropout(l) => Ok(l.forward(x)),
        }
    }

    pub fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>) -> Result<Array2<f32>> {
        match self {
            Dense(l) => l.backward(params, grad, d),
            Dropout(l) => Ok(l.backward(d)),
        }
    }

    pub fn infer(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        match self {
            Dense(l) => l.infer(params, x),
            Dropout(l) => Ok(l.infer(x)),
        }
    }
}
