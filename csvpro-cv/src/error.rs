//! Error types for csvpro-cv

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use csvpro_common::api::ErrorResponse;
use thiserror::Error;
use tracing::error;

use crate::pipeline::ConvertError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or unknown user (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Feature not available on the caller's plan (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request not valid in the current state (409), e.g. nothing to export
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input could not be parsed (422)
    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    /// Feature not configured on this instance (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// Config or storage failure; the status depends on the kind
    #[error(transparent)]
    Common(#[from] csvpro_common::Error),
}

impl From<ConvertError> for ApiError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::Parse(_) => ApiError::Unprocessable(err.to_string()),
            ConvertError::NothingToExport => ApiError::Conflict(err.to_string()),
            ConvertError::Serialize(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "PARSE_ERROR", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => {
                let (status, code) = match err {
                    csvpro_common::Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                    csvpro_common::Error::UnknownProfile(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
                };
                (status, code, err.to_string())
            }
        };

        if status.is_server_error() {
            error!("{} {}: {}", status.as_u16(), error_code, message);
        }

        (status, Json(ErrorResponse::new(error_code, message))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_errors_map_to_status() {
        let parse: ApiError = ConvertError::Parse("bad quote".into()).into();
        assert_eq!(parse.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let empty: ApiError = ConvertError::NothingToExport.into();
        assert_eq!(empty.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_storage_errors_map_to_status() {
        let err: ApiError = csvpro_common::Error::Inconsistent("x".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: ApiError = csvpro_common::Error::InvalidInput("negative row count".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err: ApiError = csvpro_common::Error::UnknownProfile("u1".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
