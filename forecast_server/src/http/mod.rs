mod error;
mod routes;
mod schemas;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

pub use error::ApiError;
pub use schemas::{
    ErrorBody, HealthResponse, PredictRequest, PredictResponse, PredictTarget, TrainResponse,
};

use crate::{artifacts::ArtifactRepository, inference::InferenceService, jobs::JobOrchestrator};

/// What every handler shares.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: JobOrchestrator,
    pub inference: InferenceService,
    pub repository: Arc<ArtifactRepository>,
}

impl AppState {
    pub fn new(
        orchestrator: JobOrchestrator,
        inference: InferenceService,
        repository: Arc<ArtifactRepository>,
    ) -> Self {
        Self {
            orchestrator,
            inference,
            repository,
        }
    }
}

/// Builds the service's router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/train", post(routes::train))
        .route("/train/status/{job_id}", get(routes::train_status))
        .route("/predict", post(routes::predict))
        .route("/model/best", get(routes::best_model))
        .with_state(state)
}
