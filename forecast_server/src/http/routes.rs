use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;

use super::{
    ApiError, AppState,
    schemas::{
        HealthResponse, PredictRequest, PredictResponse, PredictTarget, ServiceInfo, TrainResponse,
    },
};
use crate::{
    artifacts::BestModelInfo,
    jobs::{JobRecord, JobStatus},
    request::TrainingRequest,
};

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            "GET /health",
            "POST /train",
            "GET /train/status/{job_id}",
            "POST /predict",
            "GET /model/best",
        ],
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model_loaded: state.inference.is_ready(),
    })
}

pub async fn train(
    State(state): State<AppState>,
    payload: Result<Json<TrainingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TrainResponse>), ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let job_id = state.orchestrator.submit(request)?;
    let response = TrainResponse {
        message: "training started in the background".to_string(),
        job_id,
        status: JobStatus::Pending,
    };

    Ok((StatusCode::ACCEPTED, Json(response)))
}

pub async fn train_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    let record = state.orchestrator.registry().get(&job_id)?;
    Ok(Json(record))
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = payload?;

    let predicted_price = match request.target(Utc::now().date_naive())? {
        PredictTarget::Symbol { symbol, start, end } => {
            state
                .inference
                .predict_latest(&symbol, start, end)
                .await?
        }
        PredictTarget::Prices(prices) => state.inference.predict(&prices)?,
    };

    Ok(Json(PredictResponse {
        predicted_price,
        timestamp: Utc::now(),
    }))
}

pub async fn best_model(State(state): State<AppState>) -> Result<Json<BestModelInfo>, ApiError> {
    match state.repository.best_model_info()? {
        Some(info) => Ok(Json(info)),
        None => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "no best model has been recorded yet",
        )),
    }
}
