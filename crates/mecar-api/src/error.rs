//! API error types and conversions

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mecar_core::AccessoryError;
use serde::Serialize;
use thiserror::Error;

/// API error type that converts to HTTP responses
#[derive(Debug, Error)]
pub enum HttpError {
    /// 400 Bad Request
    #[error("{0}")]
    BadRequest(String),
    /// 404 Not Found
    #[error("{0}")]
    NotFound(String),
    /// 409 Conflict (characteristic does not accept writes)
    #[error("{0}")]
    Conflict(String),
    /// 500 Internal Server Error
    #[error("{0}")]
    Internal(String),
}

/// Standard error response format
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            HttpError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            HttpError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            HttpError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        if status.is_server_error() {
            tracing::error!(error = error_type, %message, "API error");
        } else {
            tracing::debug!(error = error_type, %message, "API client error");
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<AccessoryError> for HttpError {
    fn from(err: AccessoryError) -> Self {
        match err {
            AccessoryError::ReadOnly(_) => HttpError::Conflict(err.to_string()),
            AccessoryError::InvalidValue { .. } => HttpError::BadRequest(err.to_string()),
            AccessoryError::CharacteristicNotFound(_) | AccessoryError::ServiceNotFound(_) => {
                HttpError::NotFound(err.to_string())
            }
            AccessoryError::Rejected(_) => HttpError::Internal(err.to_string()),
        }
    }
}
