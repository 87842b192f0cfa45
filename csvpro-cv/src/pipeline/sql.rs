//! SQL script serializer
//!
//! Emits one `CREATE TABLE` with every column typed `TEXT`, then one
//! multi-row `INSERT`. The result is a downloadable script, not an executed
//! query, so values are written as literals with `'` doubled.
//!
//! Identifiers are lower-cased and each whitespace run becomes `_`. A name
//! that is still not a plain identifier afterwards, or that is an SQL
//! keyword (`order`, `group`, ...), is double-quoted with `"` doubled.
//! Everything else is left bare.

use std::borrow::Cow;
use std::collections::HashSet;

use super::format::ExportFormat;
use super::row::Row;
use super::ConvertError;

/// Table name used when the source has no usable base name
pub const DEFAULT_TABLE_NAME: &str = "my_table";

/// Lower-case and replace each run of whitespace with a single `_`
pub fn normalize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for ch in name.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.extend(ch.to_lowercase());
            in_space = false;
        }
    }
    out
}

/// Table name derived from the export base name
pub fn table_name(base_name: &str) -> String {
    let name = normalize_identifier(base_name);
    if name.is_empty() {
        DEFAULT_TABLE_NAME.to_string()
    } else {
        name
    }
}

/// `<table>.sql`
pub fn sql_file_name(base_name: &str) -> String {
    format!("{}{}", table_name(base_name), ExportFormat::Sql.extension())
}

/// SQLite keywords plus the ANSI reserved words common in other engines
///
/// Sorted for binary search; compared against lower-case names.
const RESERVED_WORDS: &[&str] = &[
    "abort", "action", "add", "after", "all", "alter", "always", "analyze", "and", "as", "asc",
    "attach", "autoincrement", "before", "begin", "between", "by", "cascade", "case", "cast",
    "check", "collate", "column", "commit", "conflict", "constraint", "create", "cross",
    "current", "current_date", "current_time", "current_timestamp", "database", "default",
    "deferrable", "deferred", "delete", "desc", "detach", "distinct", "do", "drop", "each",
    "else", "end", "escape", "except", "exclude", "exclusive", "exists", "explain", "fail",
    "fetch", "filter", "first", "following", "for", "foreign", "from", "full", "generated",
    "glob", "grant", "group", "groups", "having", "if", "ignore", "immediate", "in", "index",
    "indexed", "initially", "inner", "insert", "instead", "intersect", "into", "is", "isnull",
    "join", "key", "last", "left", "like", "limit", "match", "materialized", "natural", "no",
    "not", "nothing", "notnull", "null", "nulls", "of", "offset", "on", "or", "order",
    "others", "outer", "over", "partition", "plan", "pragma", "preceding", "primary", "query",
    "raise", "range", "recursive", "references", "regexp", "reindex", "release", "rename",
    "replace", "restrict", "returning", "revoke", "right", "rollback", "row", "rows",
    "savepoint", "select", "set", "table", "temp", "temporary", "then", "ties", "to",
    "transaction", "trigger", "unbounded", "union", "unique", "update", "user", "using",
    "vacuum", "values", "view", "virtual", "when", "where", "window", "with", "without",
];

fn is_reserved_word(ident: &str) -> bool {
    RESERVED_WORDS
        .binary_search(&ident.to_ascii_lowercase().as_str())
        .is_ok()
}

fn is_plain_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !is_reserved_word(ident)
}

/// Bare when plain, otherwise a double-quoted identifier
pub fn quote_identifier(ident: &str) -> Cow<'_, str> {
    if is_plain_identifier(ident) {
        Cow::Borrowed(ident)
    } else {
        Cow::Owned(format!("\"{}\"", ident.replace('"', "\"\"")))
    }
}

/// String literal with embedded single quotes doubled
pub fn quote_value(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Normalized, unique column identifiers for the header
///
/// Empty names become `column_<n>` (1-based position). Names that collide
/// after normalization get a `_<k>` suffix.
fn column_identifiers<'a>(columns: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for (index, column) in columns.enumerate() {
        let mut ident = normalize_identifier(column);
        if ident.is_empty() {
            ident = format!("column_{}", index + 1);
        }
        if seen.contains(&ident) {
            let mut k = 2;
            while seen.contains(&format!("{}_{}", ident, k)) {
                k += 1;
            }
            ident = format!("{}_{}", ident, k);
        }
        seen.insert(ident.clone());
        out.push(ident);
    }

    out
}

/// Render the CREATE TABLE + INSERT script
pub fn to_sql(rows: &[Row], base_name: &str) -> Result<String, ConvertError> {
    let first = rows.first().ok_or(ConvertError::NothingToExport)?;
    let table = table_name(base_name);
    let table = quote_identifier(&table);

    let columns: Vec<&str> = first.columns().collect();
    let idents = column_identifiers(columns.iter().copied());
    let quoted: Vec<Cow<'_, str>> = idents.iter().map(|i| quote_identifier(i)).collect();

    let mut sql = format!("CREATE TABLE {} (\n", table);
    sql.push_str(
        &quoted
            .iter()
            .map(|c| format!("  {} TEXT", c))
            .collect::<Vec<_>>()
            .join(",\n"),
    );
    sql.push_str("\n);\n\n");

    sql.push_str(&format!("INSERT INTO {} ({}) VALUES\n", table, quoted.join(", ")));

    let tuples: Vec<String> = rows
        .iter()
        .map(|row| {
            let values: Vec<String> = columns
                .iter()
                .map(|c| quote_value(row.get(c).unwrap_or("")))
                .collect();
            format!("({})", values.join(", "))
        })
        .collect();
    sql.push_str(&tuples.join(",\n"));
    sql.push_str(";\n");

    Ok(sql)
}
