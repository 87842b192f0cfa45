//! CSV parser
//!
//! Reads comma-separated text with a header line into [`Row`]s. The `csv`
//! crate does the tokenizing in flexible mode; this module applies the row
//! policy on top of it:
//!
//! - the first non-blank line names the columns
//! - blank lines are skipped and never produce rows
//! - short lines fill missing trailing columns with `""`
//! - long lines drop the fields past the last column
//! - a repeated column name keeps its first position, the later value wins
//!
//! Invalid UTF-8 and a quoted field left open at end of input are parse
//! errors. The `csv` crate itself would silently read an unterminated quote
//! to the end of the input, so that case is detected up front.

use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use super::row::Row;
use super::ConvertError;

/// Parse uploaded bytes (must be UTF-8; a leading BOM is ignored)
pub fn parse_bytes(input: &[u8]) -> Result<Vec<Row>, ConvertError> {
    let text = std::str::from_utf8(input).map_err(|e| {
        ConvertError::Parse(format!(
            "file is not valid UTF-8 text (invalid byte at offset {})",
            e.valid_up_to()
        ))
    })?;
    parse_str(text)
}

/// Parse pasted text
pub fn parse_str(input: &str) -> Result<Vec<Row>, ConvertError> {
    let text = input.strip_prefix('\u{feff}').unwrap_or(input);
    check_quotes(text)?;

    let mut reader = ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut header: Option<Header> = None;
    let mut rows = Vec::new();
    let mut overlong = 0usize;

    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| ConvertError::Parse(format!("record {}: {}", index + 1, e)))?;
        if is_blank(&record) {
            continue;
        }

        match &header {
            None => header = Some(Header::from_record(&record)),
            Some(h) => {
                if record.len() > h.width() {
                    overlong += 1;
                }
                rows.push(h.row(&record));
            }
        }
    }

    if overlong > 0 {
        debug!("Dropped extra fields from {} line(s) longer than the header", overlong);
    }
    debug!("Parsed {} row(s)", rows.len());

    Ok(rows)
}

/// Column names plus the field-index -> column-index mapping
struct Header {
    columns: Vec<String>,
    slots: Vec<usize>,
}

impl Header {
    fn from_record(record: &StringRecord) -> Self {
        let mut columns: Vec<String> = Vec::with_capacity(record.len());
        let mut slots = Vec::with_capacity(record.len());

        for name in record.iter() {
            let slot = match columns.iter().position(|c| c == name) {
                Some(existing) => existing,
                None => {
                    columns.push(name.to_string());
                    columns.len() - 1
                }
            };
            slots.push(slot);
        }

        Self { columns, slots }
    }

    /// Number of fields in the header line
    fn width(&self) -> usize {
        self.slots.len()
    }

    fn row(&self, record: &StringRecord) -> Row {
        let mut values = vec![String::new(); self.columns.len()];
        for (field, &slot) in record.iter().zip(&self.slots) {
            values[slot] = field.to_string();
        }
        Row::from_unique_fields(self.columns.iter().cloned().zip(values).collect())
    }
}

/// An empty or whitespace-only line
///
/// Empty lines never reach here (the reader skips them); a line of spaces
/// arrives as one whitespace field. A line of bare commas is a real row of
/// empty values.
fn is_blank(record: &StringRecord) -> bool {
    record.len() <= 1 && record.iter().all(|f| f.trim().is_empty())
}

/// Reject a quoted field that is still open at end of input
///
/// Mirrors the reader's quoting rules: a quote opens a quoted field only at
/// the start of a field (or right after a closing quote, as an escaped `""`);
/// anywhere else it is a literal character.
fn check_quotes(text: &str) -> Result<(), ConvertError> {
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut after_closing = false;
    let mut line = 1usize;
    let mut opened_on = 1usize;

    for b in text.bytes() {
        if in_quotes {
            match b {
                b'"' => {
                    in_quotes = false;
                    after_closing = true;
                }
                b'\n' => line += 1,
                _ => {}
            }
            continue;
        }

        match b {
            b'"' if at_field_start || after_closing => {
                in_quotes = true;
                if at_field_start {
                    opened_on = line;
                }
                at_field_start = false;
                after_closing = false;
            }
            b',' | b'\r' => {
                at_field_start = true;
                after_closing = false;
            }
            b'\n' => {
                at_field_start = true;
                after_closing = false;
                line += 1;
            }
            _ => {
                at_field_start = false;
                after_closing = false;
            }
        }
    }

    if in_quotes {
        return Err(ConvertError::Parse(format!(
            "unterminated quoted field starting on line {}",
            opened_on
        )));
    }

    Ok(())
}
