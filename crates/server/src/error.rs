//! API error types.

use axum::Json;
use axum::http::header::CONTENT_RANGE;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sluice_storage::StorageError;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    UnsupportedRange(String),

    #[error("range start {start} exceeds document length {length}")]
    RangeNotSatisfiable { start: u64, length: u64 },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] sluice_core::Error),
}

impl ApiError {
    /// Uniform response for a document that cannot be served.
    pub fn document_not_found(path: &str, method: &Method) -> Self {
        Self::NotFound(format!(
            "document not found at path {path} for method {method}"
        ))
    }

    /// Response for a method the backing store does not serve.
    pub fn method_not_supported(path: &str, method: &Method) -> Self {
        Self::Forbidden(format!("path {path} is not supported for {method} request"))
    }

    /// Fold core and storage errors into the variants clients see.
    fn normalize(self) -> Self {
        match self {
            Self::Core(sluice_core::Error::UnsupportedRange(msg)) => Self::UnsupportedRange(msg),
            Self::Core(sluice_core::Error::RangeNotSatisfiable { start, length }) => {
                Self::RangeNotSatisfiable { start, length }
            }
            Self::Core(e) => Self::Internal(e.to_string()),
            Self::Storage(e) if e.is_unavailable() => Self::NotFound(e.to_string()),
            Self::Storage(e) => Self::Internal(e.to_string()),
            other => other,
        }
    }

    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::UnsupportedRange(_) => "unsupported_range",
            Self::RangeNotSatisfiable { .. } => "range_not_satisfiable",
            Self::Internal(_) => "internal_error",
            Self::Storage(e) if e.is_unavailable() => "not_found",
            Self::Storage(_) => "internal_error",
            Self::Core(sluice_core::Error::UnsupportedRange(_)) => "unsupported_range",
            Self::Core(sluice_core::Error::RangeNotSatisfiable { .. }) => "range_not_satisfiable",
            Self::Core(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::UnsupportedRange(_) => StatusCode::NOT_IMPLEMENTED,
            Self::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(e) if e.is_unavailable() => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Core(sluice_core::Error::UnsupportedRange(_)) => StatusCode::NOT_IMPLEMENTED,
            Self::Core(sluice_core::Error::RangeNotSatisfiable { .. }) => {
                StatusCode::RANGE_NOT_SATISFIABLE
            }
            Self::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = self.normalize();
        let status = error.status_code();

        let message = match &error {
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed with internal error");
                "internal error handling request".to_string()
            }
            other => other.to_string(),
        };

        if status == StatusCode::NOT_FOUND {
            crate::metrics::NOT_FOUND_RESPONSES.inc();
        }

        let body = ErrorResponse {
            code: error.code().to_string(),
            message,
        };

        match error {
            Self::RangeNotSatisfiable { length, .. } => (
                status,
                [(CONTENT_RANGE, format!("bytes */{length}"))],
                Json(body),
            )
                .into_response(),
            _ => (status, Json(body)).into_response(),
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
