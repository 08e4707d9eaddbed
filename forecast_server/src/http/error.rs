use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::error;

use super::ErrorBody;
use crate::{
    artifacts::ArtifactError, inference::InferenceError, jobs::RegistryError,
    request::ValidationError, source::SourceError,
};

/// An error answered as `{"detail": ...}` with its status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{}: {}", self.status, self.detail);
        }

        let body = ErrorBody {
            detail: self.detail,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::new(value.status(), value.body_text())
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, value.to_string())
    }
}

impl From<InferenceError> for ApiError {
    fn from(value: InferenceError) -> Self {
        let status = match &value {
            InferenceError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            InferenceError::InvalidInput(_)
            | InferenceError::InsufficientData { .. }
            | InferenceError::Source(SourceError::UnknownSymbol(_)) => StatusCode::BAD_REQUEST,
            InferenceError::Source(_) => StatusCode::BAD_GATEWAY,
            InferenceError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Self::new(status, value.to_string())
    }
}

impl From<RegistryError> for ApiError {
    fn from(value: RegistryError) -> Self {
        let status = match &value {
            RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Self::new(status, value.to_string())
    }
}

impl From<ArtifactError> for ApiError {
    fn from(value: ArtifactError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, value.to_string())
    }
}
