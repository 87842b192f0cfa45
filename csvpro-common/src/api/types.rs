//! Shared API request/response types

use serde::{Deserialize, Serialize};

// ========================================
// Error Response Types
// ========================================

/// Error body returned by every failing endpoint
///
/// # Examples
///
/// ```
/// use csvpro_common::api::types::ErrorResponse;
///
/// let body = ErrorResponse::new("NOT_FOUND", "Session not found");
/// let json = serde_json::to_value(&body).unwrap();
/// assert_eq!(json["error"]["code"], "NOT_FOUND");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Machine-readable code plus human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }
}
