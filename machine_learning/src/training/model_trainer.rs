use std::num::NonZeroUsize;

use log::debug;
use rand::Rng;

use crate::{
    MlErr, Result,
    arch::{Model, loss::LossFn},
    dataset::Dataset,
    optimization::Optimizer,
};

/// A model trainer. Contains the relevant components needed for training a model, including the
/// model itself.
pub struct ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    model: M,
    optimizer: O,
    loss_fn: L,

    epochs: usize,
    batch_size: NonZeroUsize,
    rng: R,
}

impl<M, O, L, R> ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    /// Returns a new `ModelTrainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `optimizer` - The optimizer applied after every batch.
    /// * `loss_fn` - The loss function used to measure the difference between a model's output and the expected one.
    /// * `epochs` - The amount of passes over the dataset per `train` call.
    /// * `batch_size` - The maximum amount of rows per batch.
    /// * `rng` - A random number generator, used for shuffling the dataset every epoch.
    pub fn new(
        model: M,
        optimizer: O,
        loss_fn: L,
        epochs: usize,
        batch_size: NonZeroUsize,
        rng: R,
    ) -> Self {
        Self {
            model,
            optimizer,
            loss_fn,
            epochs,
            batch_size,
            rng,
        }
    }

    /// Trains `params` over `dataset` for the configured amount of epochs, shuffling the dataset
    /// before every epoch.
    ///
    /// # Arguments
    /// * `params` - The model's parameters, updated in place.
    /// * `dataset` - The training dataset.
    ///
    /// # Returns
    /// The loss of every epoch, or an error if the loss stopped being finite.
    pub fn train(&mut self, params: &mut [f32], dataset: &mut Dataset) -> Result<Vec<f32>> {
        if dataset.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        let mut grad = vec![0.; params.len()];
        let mut losses = Vec::with_capacity(self.epochs);

        for epoch in 0..self.epochs {
            dataset.shuffle(&mut self.rng);
            let batches = dataset.batches(self.batch_size);

            let loss = self.model.backprop(
                params,
                &mut grad,
                &self.loss_fn,
                &mut self.optimizer,
                batches,
            )?;

            if !loss.is_finite() {
                return Err(MlErr::NonFiniteLoss { epoch, loss });
            }

            debug!("epoch {}/{}: loss {loss:.6}", epoch + 1, self.epochs);
            losses.push(loss);
        }

        Ok(losses)
    }

    /// Consumes the trainer, returning the trained model.
    pub fn into_model(self) -> M {
        self.model
    }
}
