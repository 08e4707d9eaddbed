use serde::{Deserialize, Serialize};

use super::{Sequential, activations::ActFn, layers::Layer};
use crate::{MlErr, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActFnSpec {
    Tanh,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerSpec {
    Dense {
        dim: (usize, usize),
        act_fn: Option<ActFnSpec>,
    },
    Dropout {
        rate: f32,
    },
}

/// A serializable description of a model's architecture. Together with a flat parameter vector
/// it fully determines a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Sequential { layers: Vec<LayerSpec> },
}

impl ModelSpec {
    /// Describes a regressor mapping a sequence of `input_size` values to a single output:
    /// `num_layers` tanh dense layers of `hidden_size` units, each followed by dropout, and a
    /// final linear layer.
    ///
    /// # Arguments
    /// * `input_size` - The length of the input sequence.
    /// * `hidden_size` - The width of every hidden layer.
    /// * `num_layers` - The amount of hidden layers.
    /// * `dropout` - The dropout rate applied after every hidden layer, in `[0, 1]`.
    ///
    /// # Returns
    /// The spec or an `InvalidHyperparameter` error.
    pub fn sequence_regressor(
        input_size: usize,
        hidden_size: usize,
        num_layers: usize,
        dropout: f32,
    ) -> Result<Self> {
        let positive = |name, value: usize| {
            if value == 0 {
                return Err(MlErr::InvalidHyperparameter {
                    name,
                    reason: "must be positive",
                });
            }
            Ok(())
        };

        positive("input_size", input_size)?;
        positive("hidden_size", hidden_size)?;
        positive("num_layers", num_layers)?;

        if !(0. ..=1.).contains(&dropout) {
            return Err(MlErr::InvalidHyperparameter {
                name: "dropout",
                reason: "must be within [0, 1]",
            });
        }

        let mut layers = Vec::with_capacity(num_layers * 2 + 1);
        let mut fan_in = input_size;

        for _ in 0..num_layers {
            layers.push(LayerSpec::Dense {
                dim: (fan_in, hidden_size),
                act_fn: Some(ActFnSpec::Tanh),
            });

            if dropout > 0. {
                layers.push(LayerSpec::Dropout { rate: dropout });
            }

            fan_in = hidden_size;
        }

        layers.push(LayerSpec::Dense {
            dim: (fan_in, 1),
            act_fn: None,
        });

        Ok(Self::Sequential { layers })
    }

    /// Returns the amount of inputs the first layer expects.
    pub fn input_size(&self) -> usize {
        let Self::Sequential { layers } = self;

        layers
            .iter()
            .find_map(|layer| match layer {
                LayerSpec::Dense { dim, .. } => Some(dim.0),
                LayerSpec::Dropout { .. } => None,
            })
            .unwrap_or_default()
    }

    /// Builds the model this spec describes.
    ///
    /// # Arguments
    /// * `seed` - Seeds the stochastic layers (dropout masks).
    pub fn build(&self, seed: u64) -> Sequential {
        let Self::Sequential { layers } = self;

        let layers = layers.iter().enumerate().map(|(i, spec)| match *spec {
            LayerSpec::Dense { dim, act_fn } => Layer::dense(dim, act_fn.map(resolve_act_fn)),
            LayerSpec::Dropout { rate } => Layer::dropout(rate, seed.wrapping_add(i as u64)),
        });

        Sequential::new(layers)
    }
}

fn resolve_act_fn(spec: ActFnSpec) -> ActFn {
    match spec {
        ActFnSpec::Tanh => ActFn::tanh(),
    }
}
