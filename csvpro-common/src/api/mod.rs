//! API module for shared HTTP API functionality
//!
//! Contains ONLY pure functions and shared types; the converter service
//! wraps them with axum handlers.

pub mod signature;
pub mod types;

pub use signature::{
    calculate_signature, parse_signature_header, sign_payload, verify_signature,
    SignatureError, SignatureHeader, SIGNATURE_HEADER,
};
pub use types::{ErrorDetail, ErrorResponse};
