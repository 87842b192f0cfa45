//! Billing webhook signature verification
//!
//! # Scheme
//!
//! The payment provider signs every webhook delivery with a shared secret:
//!
//! - Header `billing-signature: t=<unix seconds>,v1=<hex>[,v1=<hex>...]`
//! - `v1 = SHA-256(t + "." + raw body + secret)` as 64 lowercase hex chars
//! - More than one `v1` may be present while a secret is being rotated
//! - `t` must lie within the configured tolerance of the receiver's clock
//!
//! # Pure Functions
//!
//! No HTTP framework dependencies; the axum handler in the converter service
//! extracts the header and raw body and calls [`verify_signature`].

use sha2::{Digest, Sha256};

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "billing-signature";

// ========================================
// Error Types
// ========================================

/// Signature verification failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// Header could not be parsed
    Malformed(String),

    /// Timestamp outside acceptable window
    InvalidTimestamp {
        timestamp: i64,
        now: i64,
        reason: String,
    },

    /// No provided signature matches the calculated value
    InvalidSignature { provided: Vec<String>, calculated: String },
}

impl std::fmt::Display for SignatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureError::Malformed(reason) => write!(f, "Malformed signature header: {}", reason),
            SignatureError::InvalidTimestamp { reason, .. } => {
                write!(f, "Invalid timestamp: {}", reason)
            }
            SignatureError::InvalidSignature { .. } => write!(f, "Invalid signature"),
        }
    }
}

impl std::error::Error for SignatureError {}

// ========================================
// Header Parsing
// ========================================

/// Parsed `billing-signature` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

/// Parse `t=<secs>,v1=<hex>,...`
///
/// Unknown keys are ignored so newer signature versions can be added by the
/// provider without breaking verification.
///
/// # Examples
///
/// ```
/// use csvpro_common::api::signature::parse_signature_header;
///
/// let header = parse_signature_header("t=1730000000,v1=abc").unwrap();
/// assert_eq!(header.timestamp, 1730000000);
/// assert_eq!(header.signatures, vec!["abc".to_string()]);
/// ```
pub fn parse_signature_header(value: &str) -> Result<SignatureHeader, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in value.split(',') {
        let Some((key, val)) = part.trim().split_once('=') else {
            return Err(SignatureError::Malformed(format!("unexpected element '{}'", part)));
        };
        match key {
            "t" => {
                let t = val
                    .parse::<i64>()
                    .map_err(|e| SignatureError::Malformed(format!("bad timestamp: {}", e)))?;
                timestamp = Some(t);
            }
            "v1" => signatures.push(val.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| SignatureError::Malformed("missing t".to_string()))?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed("missing v1".to_string()));
    }

    Ok(SignatureHeader { timestamp, signatures })
}

// ========================================
// Timestamp Validation
// ========================================

/// Validate that `timestamp` is within `tolerance_secs` of `now` (both ways)
pub fn validate_timestamp(timestamp: i64, now: i64, tolerance_secs: i64) -> Result<(), SignatureError> {
    let diff = now - timestamp;

    if diff > tolerance_secs {
        return Err(SignatureError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!("Timestamp {}s too old (max {}s)", diff, tolerance_secs),
        });
    }

    if diff < -tolerance_secs {
        return Err(SignatureError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!("Timestamp {}s in future (max {}s)", diff.abs(), tolerance_secs),
        });
    }

    Ok(())
}

// ========================================
// Signature Calculation and Validation
// ========================================

/// Calculate the `v1` signature for a payload
///
/// # Examples
///
/// ```
/// use csvpro_common::api::signature::calculate_signature;
///
/// let sig = calculate_signature(1730000000, br#"{"type":"ping"}"#, "whsec_test");
/// assert_eq!(sig.len(), 64);
/// ```
pub fn calculate_signature(timestamp: i64, payload: &[u8], secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.to_string().as_bytes());
    hasher.update(b".");
    hasher.update(payload);
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Build a complete header value for a payload
///
/// Used by tests and by tooling that replays events against a local instance.
pub fn sign_payload(timestamp: i64, payload: &[u8], secret: &str) -> String {
    format!("t={},v1={}", timestamp, calculate_signature(timestamp, payload, secret))
}

/// Verify a header against the raw payload at time `now` (unix seconds)
pub fn verify_signature(
    header_value: &str,
    payload: &[u8],
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let header = parse_signature_header(header_value)?;
    validate_timestamp(header.timestamp, now, tolerance_secs)?;

    let calculated = calculate_signature(header.timestamp, payload, secret);
    if header
        .signatures
        .iter()
        .any(|provided| constant_time_eq(provided.as_bytes(), calculated.as_bytes()))
    {
        return Ok(());
    }

    Err(SignatureError::InvalidSignature {
        provided: header.signatures,
        calculated,
    })
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ========================================
// Tests
// ========================================
