use serde::{Deserialize, Serialize};

use super::TrainingError;
use crate::artifacts::ArtifactPaths;

/// The result of a completed training run. Errors are over the original price scale,
/// `test_loss` is the held-out MSE over the normalized scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub symbol: String,
    pub mae: f64,
    pub rmse: f64,
    pub mape: f64,
    pub test_loss: f64,
    pub is_best_model: bool,
    /// The mean training loss of every epoch.
    pub loss_history: Vec<f32>,
}

#[derive(Debug)]
pub enum TrainingOutcome {
    Success {
        metrics: TrainingMetrics,
        artifact_paths: ArtifactPaths,
    },
    Failure(TrainingError),
}
