use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `NOT_FOUND`,
    /// `CONFLICT`, `PAYLOAD_TOO_LARGE`, `INTERNAL_ERROR`.
    #[schema(example = "NOT_FOUND")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Edit session not found")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    PayloadTooLarge { actual: u64, limit: u64 },
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::PayloadTooLarge { actual, limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    code: "PAYLOAD_TOO_LARGE",
                    message: format!("File exceeds maximum size ({actual} > {limit} bytes)"),
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(url) => AppError::NotFound(format!("Object not found: {url}")),
            StorageError::InvalidIdentifier(msg) | StorageError::InvalidName(msg) => {
                AppError::Validation(msg)
            }
            StorageError::SizeLimitExceeded { actual, limit } => {
                AppError::PayloadTooLarge { actual, limit }
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}
