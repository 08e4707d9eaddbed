use super::Optimizer;
use crate::{MlErr, Result};

/// Hyperparameters of `Adam`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdamConfig {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
}

impl AdamConfig {
    pub const BETA1: f32 = 0.9;
    pub const BETA2: f32 = 0.999;
    pub const EPSILON: f32 = 1e-8;

    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: Self::BETA1,
            beta2: Self::BETA2,
            epsilon: Self::EPSILON,
        }
    }
}

/// Adam with bias corrected moment estimates, one pair of moments per parameter.
#[derive(Debug)]
pub struct Adam {
    config: AdamConfig,
    steps: i32,
    mean: Vec<f32>,
    variance: Vec<f32>,
}

impl Adam {
    /// Creates an optimizer for `len` parameters.
    pub fn new(len: usize, config: AdamConfig) -> Self {
        Self {
            config,
            steps: 0,
            mean: vec![0.; len],
            variance: vec![0.; len],
        }
    }

    /// Creates an optimizer with the usual betas and epsilon.
    pub fn with_defaults(len: usize, learning_rate: f32) -> Self {
        Self::new(len, AdamConfig::new(learning_rate))
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        let len = self.mean.len();
        if grad.len() != len {
            return Err(MlErr::SizeMismatch {
                what: "gradient",
                got: grad.len(),
                expected: len,
            });
        }
        if params.len() != len {
            return Err(MlErr::SizeMismatch {
                what: "parameters",
                got: params.len(),
                expected: len,
            });
        }

        let AdamConfig {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        } = self.config;

        self.steps = self.steps.saturating_add(1);
        let mean_correction = 1. - beta1.powi(self.steps);
        let variance_correction = 1. - beta2.powi(self.steps);

        for (i, (param, &g)) in params.iter_mut().zip(grad).enumerate() {
            let m = beta1 * self.mean[i] + (1. - beta1) * g;
            let v = beta2 * self.variance[i] + (1. - beta2) * g * g;
            self.mean[i] = m;
            self.variance[i] = v;

            let m_hat = m / mean_correction;
            let v_hat = v / variance_correction;
            *param -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
        }

        Ok(())
    }
}
