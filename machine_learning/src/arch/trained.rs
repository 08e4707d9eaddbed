use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{Model, ModelSpec};
use crate::{MlErr, Result};

/// A trained, immutable model: its architecture plus the learned parameters.
///
/// This is the artifact that gets persisted and served. It is cheap to share across threads since
/// inference never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrainedModelParts")]
pub struct TrainedModel {
    spec: ModelSpec,
    params: Vec<f32>,
}

// Decoding goes through `TrainedModel::new` so a stored model always fits its architecture.
#[derive(Deserialize)]
struct TrainedModelParts {
    spec: ModelSpec,
    params: Vec<f32>,
}

impl TryFrom<TrainedModelParts> for TrainedModel {
    type Error = MlErr;

    fn try_from(parts: TrainedModelParts) -> Result<Self> {
        Self::new(parts.spec, parts.params)
    }
}

impl TrainedModel {
    /// Creates a new `TrainedModel`.
    ///
    /// # Returns
    /// A `SizeMismatch` error if `params` doesn't fit the architecture.
    pub fn new(spec: ModelSpec, params: Vec<f32>) -> Result<Self> {
        let expected = spec.build(0).size();

        if params.len() != expected {
            return Err(MlErr::SizeMismatch {
                what: "trained model params",
                got: params.len(),
                expected,
            });
        }

        Ok(Self { spec, params })
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn input_size(&self) -> usize {
        self.spec.input_size()
    }

    /// Predicts one output per row of `x`.
    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.spec.build(0).predict(&self.params, x)
    }

    /// Predicts the output for a single sequence.
    pub fn predict_one(&self, sequence: &[f32]) -> Result<f32> {
        let x = ArrayView2::from_shape((1, sequence.len()), sequence).map_err(|_| {
            MlErr::SizeMismatch {
                what: "sequence",
                got: sequence.len(),
                expected: self.input_size(),
            }
        })?;

        let y = self.predict(x)?;
        y.iter().next().copied().ok_or(MlErr::SizeMismatch {
            what: "model output",
            got: 0,
            expected: 1,
        })
    }
}
