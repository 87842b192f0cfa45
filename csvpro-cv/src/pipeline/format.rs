//! Export formats and dispatch

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::row::Row;
use super::{json, sql, ConvertError};

/// Target format of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Sql,
}

impl ExportFormat {
    /// Wire name, also stored in the usage log
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Sql => "sql",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Sql => "text/plain",
        }
    }

    /// File name suffix, dot included
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => ".json",
            ExportFormat::Sql => ".sql",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "sql" => Ok(ExportFormat::Sql),
            other => Err(format!("Unknown export format '{}' (expected json or sql)", other)),
        }
    }
}

/// A rendered export ready to be offered as a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: String,
}

/// Serialize rows in the requested format
pub fn export(rows: &[Row], base_name: &str, format: ExportFormat) -> Result<ExportFile, ConvertError> {
    let (file_name, body) = match format {
        ExportFormat::Json => (json::json_file_name(base_name), json::to_json(rows)?),
        ExportFormat::Sql => (sql::sql_file_name(base_name), sql::to_sql(rows, base_name)?),
    };

    Ok(ExportFile {
        file_name,
        content_type: format.content_type(),
        body,
    })
}
