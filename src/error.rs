// Request-level error type shared by the HTTP handlers.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::metrics;

#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed ingest payload. Reported to the client, never retried.
    #[error("{0}")]
    Validation(String),

    /// The durable store could not complete the operation.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(msg) => {
                metrics::SCORE_VALIDATION_FAILURES_TOTAL.inc();
                tracing::warn!("Rejected score payload: {msg}");
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            AppError::StorageUnavailable(e) => {
                metrics::STORAGE_ERRORS_TOTAL.inc();
                tracing::error!("Database error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": "Storage unavailable" })),
                )
                    .into_response()
            }
        }
    }
}
