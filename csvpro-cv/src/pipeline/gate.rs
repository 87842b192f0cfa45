//! Entitlement gate
//!
//! Runs after a full parse so the parser behaves the same for every tier.
//! Free-tier datasets longer than the row limit keep their first rows only.

use serde::Serialize;

use super::row::Row;

/// Caller-supplied tier flag and free-tier row limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Entitlement {
    pub is_pro: bool,
    /// Applies only when `is_pro` is false
    pub row_limit: usize,
}

impl Entitlement {
    pub fn free(row_limit: usize) -> Self {
        Self { is_pro: false, row_limit }
    }

    pub fn pro(row_limit: usize) -> Self {
        Self { is_pro: true, row_limit }
    }
}

/// Parsed rows after the gate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    pub rows: Vec<Row>,
    pub truncated: bool,
    /// Non-fatal notice; set exactly when `truncated`
    pub warning: Option<String>,
}

/// Warning attached to a truncated free-tier result
pub fn limit_warning(row_limit: usize) -> String {
    format!(
        "Free limit reached. Only the first {} rows are available.",
        row_limit
    )
}

/// Keep the first `row_limit` rows of an oversized free-tier dataset
///
/// Total: never fails, never reorders.
pub fn apply_entitlement(mut rows: Vec<Row>, entitlement: &Entitlement) -> ConversionResult {
    if entitlement.is_pro || rows.len() <= entitlement.row_limit {
        return ConversionResult {
            rows,
            truncated: false,
            warning: None,
        };
    }

    rows.truncate(entitlement.row_limit);
    ConversionResult {
        rows,
        truncated: true,
        warning: Some(limit_warning(entitlement.row_limit)),
    }
}
