//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pipeline::{PipelineError, SecretError, StorageError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The triggering object does not exist.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// A credential could not be fetched.
    Secret(SecretError),
    /// The pipeline aborted on a fatal stage.
    Pipeline(PipelineError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Secret(err) => {
                tracing::error!(error = %err, "credential fetch failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Pipeline(err) => pipeline_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn pipeline_error_to_response(err: PipelineError) -> (StatusCode, String) {
    match &err {
        // The ERP stayed broken through the whole retry budget.
        PipelineError::Gateway(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        PipelineError::IncompleteData(_) | PipelineError::Warehouse(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StorageError::Io(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<SecretError> for ApiError {
    fn from(err: SecretError) -> Self {
        ApiError::Secret(err)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}
