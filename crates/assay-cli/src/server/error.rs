//! API error types and handling.

use assay::AssayError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from client.
    BadRequest(String),
    /// Internal server error.
    Internal(String),
    /// Error from the assay library.
    Assay(AssayError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
            ApiError::Assay(e) => {
                let error = match e {
                    AssayError::UnsupportedFormat(_) => "unsupported_format",
                    AssayError::EmptyData(_) => "empty_data",
                    _ => "invalid_upload",
                };
                (StatusCode::BAD_REQUEST, error, e.to_string())
            }
        };
        warn!(status = %status, error, message = %message, "Request rejected");

        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

impl From<AssayError> for ApiError {
    fn from(err: AssayError) -> Self {
        ApiError::Assay(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Assay(e) => write!(f, "Assay error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}
