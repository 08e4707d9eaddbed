use std::{num::NonZeroUsize, sync::Arc};

use log::{debug, info};
use machine_learning::{
    MlErr,
    arch::{
        ModelSpec, TrainedModel,
        loss::{LossFn, Mse},
    },
    metrics::RegressionMetrics,
    optimization::Adam,
    scaler::MinMaxScaler,
    training::ModelTrainer,
};
use rand::{SeedableRng, rngs::StdRng};
use tokio::task;

use super::{TrainingError, TrainingMetrics, TrainingOutcome};
use crate::{
    artifacts::{ArtifactPaths, ArtifactRepository, ArtifactSet},
    features::{self, Window},
    request::TrainingRequest,
    source::PriceSource,
};

/// Runs training pipelines: fetch the history, fit, evaluate on the held-out windows and persist
/// the artifacts.
#[derive(Clone)]
pub struct TrainingExecutor {
    source: Arc<dyn PriceSource>,
    repository: Arc<ArtifactRepository>,
    window: NonZeroUsize,
    train_split: f64,
}

impl TrainingExecutor {
    /// Creates a new `TrainingExecutor`.
    ///
    /// # Arguments
    /// * `source` - Where the price history comes from.
    /// * `repository` - Where the artifacts of every run get persisted.
    /// * `window` - The amount of observations the model takes per prediction.
    /// * `train_split` - The fraction of windows used for training, in `(0, 1)`.
    pub fn new(
        source: Arc<dyn PriceSource>,
        repository: Arc<ArtifactRepository>,
        window: NonZeroUsize,
        train_split: f64,
    ) -> Self {
        Self {
            source,
            repository,
            window,
            train_split,
        }
    }

    pub fn repository(&self) -> &Arc<ArtifactRepository> {
        &self.repository
    }

    pub fn window(&self) -> NonZeroUsize {
        self.window
    }

    /// Runs one training pipeline to completion. Never fails: every error is reported as a
    /// `TrainingOutcome::Failure`.
    pub async fn run(&self, request: &TrainingRequest) -> TrainingOutcome {
        match self.try_run(request).await {
            Ok((metrics, artifact_paths)) => TrainingOutcome::Success {
                metrics,
                artifact_paths,
            },
            Err(e) => TrainingOutcome::Failure(e),
        }
    }

    async fn try_run(
        &self,
        request: &TrainingRequest,
    ) -> Result<(TrainingMetrics, ArtifactPaths), TrainingError> {
        let points = self
            .source
            .history(&request.symbol, request.start_date, request.end_date)
            .await?;
        let closes: Vec<f64> = points.into_iter().map(|p| p.close).collect();

        let required = self.window.get() + 2;
        if closes.len() < required {
            return Err(TrainingError::InsufficientData {
                symbol: request.symbol.clone(),
                got: closes.len(),
                required,
            });
        }

        let pipeline = Pipeline {
            request: request.clone(),
            window: self.window.get(),
            train_split: self.train_split,
        };
        let repository = Arc::clone(&self.repository);

        let (metrics, set) = task::spawn_blocking(move || pipeline.fit(&closes))
            .await
            .map_err(|e| TrainingError::Aborted(e.to_string()))??;

        let persisted = task::spawn_blocking(move || {
            let test_loss = metrics.test_loss;
            repository
                .persist(&set, test_loss)
                .map(|outcome| (metrics, outcome))
        })
        .await
        .map_err(|e| TrainingError::Aborted(e.to_string()))?;

        let (mut metrics, outcome) = persisted?;
        metrics.is_best_model = outcome.is_best;

        Ok((metrics, outcome.paths))
    }
}

/// The CPU bound part of a run, executed on the blocking pool.
struct Pipeline {
    request: TrainingRequest,
    window: usize,
    train_split: f64,
}

impl Pipeline {
    fn fit(self, closes: &[f64]) -> Result<(TrainingMetrics, ArtifactSet), TrainingError> {
        let Self {
            request,
            window,
            train_split,
        } = self;

        let n_windows = closes.len() - window;
        let split = features::split_point(n_windows, train_split);

        // the training windows cover the first `split + window` observations
        let scaler = MinMaxScaler::fit(&closes[..split + window])?;
        let normalized = scaler.transform_all(closes)?;

        let windows = features::sliding_windows(&normalized, window);
        let (train, test) = windows.split_at(split);
        debug!(
            "{}: {} training windows, {} held-out windows",
            request.symbol,
            train.len(),
            test.len()
        );

        let spec = ModelSpec::sequence_regressor(
            window,
            request.hidden_layer_size,
            request.num_layers,
            request.dropout,
        )?;

        let seed = request.seed();
        let model = spec.build(seed);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut params = model.init_params(&mut rng)?;

        let batch_size =
            NonZeroUsize::new(request.batch_size).ok_or(MlErr::InvalidHyperparameter {
                name: "batch_size",
                reason: "must be positive",
            })?;
        let optimizer = Adam::with_defaults(params.len(), request.learning_rate);

        let mut dataset = features::to_dataset(train)?;
        let mut trainer = ModelTrainer::new(model, optimizer, Mse, request.epochs, batch_size, rng);
        let loss_history = trainer.train(&mut params, &mut dataset)?;

        let model = TrainedModel::new(spec, params)?;
        let (test_loss, metrics) = evaluate(&model, &scaler, test)?;

        info!(
            "trained {} for {} epochs: test loss {test_loss:.6}, mae {:.4}, rmse {:.4}, mape {:.2}%",
            request.symbol, request.epochs, metrics.mae, metrics.rmse, metrics.mape
        );

        let metrics = TrainingMetrics {
            symbol: request.symbol,
            mae: metrics.mae,
            rmse: metrics.rmse,
            mape: metrics.mape,
            test_loss,
            is_best_model: false,
            loss_history,
        };

        Ok((metrics, ArtifactSet::new(model, scaler)))
    }
}

/// Evaluates `model` over the held-out windows.
///
/// # Returns
/// The normalized MSE and the metrics over the original scale.
fn evaluate(
    model: &TrainedModel,
    scaler: &MinMaxScaler,
    test: &[Window],
) -> Result<(f64, RegressionMetrics), TrainingError> {
    let dataset = features::to_dataset(test)?;
    let predictions = model.predict(dataset.x())?;

    let test_loss = f64::from(Mse.loss(predictions.view(), dataset.y()));
    if !test_loss.is_finite() {
        return Err(TrainingError::Numerical(format!(
            "held-out loss is {test_loss}"
        )));
    }

    let predicted: Vec<f64> = predictions
        .iter()
        .map(|&p| scaler.inverse_transform(f64::from(p)))
        .collect();
    let actual: Vec<f64> = test
        .iter()
        .map(|w| scaler.inverse_transform(w.label))
        .collect();

    let metrics = RegressionMetrics::compute(&predicted, &actual)?;
    Ok((test_loss, metrics))
}
