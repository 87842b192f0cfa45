//! Tabular conversion pipeline
//!
//! parse -> entitlement gate -> serialize. Every stage is a pure function of
//! its input; the HTTP layer owns session state, downloads and usage logging.

pub mod format;
pub mod gate;
pub mod json;
pub mod parser;
pub mod row;
pub mod session;
pub mod sql;

pub use format::{export, ExportFile, ExportFormat};
pub use gate::{apply_entitlement, ConversionResult, Entitlement};
pub use row::Row;
pub use session::{Session, SessionSnapshot, SessionStatus, SessionStore};

use thiserror::Error;

/// Pipeline failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// Malformed or unreadable input; message is shown to the user as-is
    #[error("Could not parse CSV: {0}")]
    Parse(String),

    /// Export requested with no rows available
    #[error("Nothing to export")]
    NothingToExport,

    #[error("Could not serialize export: {0}")]
    Serialize(String),
}

/// One conversion of one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    /// Source file name without its extension
    pub source_name: String,
    pub entitlement: Entitlement,
}

impl ConversionRequest {
    pub fn new(file_name: &str, entitlement: Entitlement) -> Self {
        Self {
            source_name: base_name(file_name),
            entitlement,
        }
    }
}

/// Parse and gate uploaded bytes
pub fn convert(input: &[u8], request: &ConversionRequest) -> Result<ConversionResult, ConvertError> {
    let rows = parser::parse_bytes(input)?;
    Ok(apply_entitlement(rows, &request.entitlement))
}

/// Strip the final extension from a file name (`report.v2.csv` -> `report.v2`)
///
/// Any directory part sent by the client is dropped first.
pub fn base_name(file_name: &str) -> String {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);

    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => name[..dot].to_string(),
        _ => name.to_string(),
    }
}
