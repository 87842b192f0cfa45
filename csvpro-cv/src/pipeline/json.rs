//! JSON serializer

use super::format::ExportFormat;
use super::row::Row;
use super::ConvertError;

/// File name used when the source has no usable base name
pub const DEFAULT_JSON_BASE: &str = "data";

/// Pretty-printed (2-space) array of row objects, keys in column order
pub fn to_json(rows: &[Row]) -> Result<String, ConvertError> {
    if rows.is_empty() {
        return Err(ConvertError::NothingToExport);
    }
    serde_json::to_string_pretty(rows).map_err(|e| ConvertError::Serialize(e.to_string()))
}

/// `<base>.json`, or `data.json` for an empty base
pub fn json_file_name(base_name: &str) -> String {
    let base = if base_name.is_empty() { DEFAULT_JSON_BASE } else { base_name };
    format!("{}{}", base, ExportFormat::Json.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Vec<Row> {
        vec![
            Row::from_pairs([("name", "Alice"), ("age", "30")]),
            Row::from_pairs([("name", "Bob"), ("age", "25")]),
        ]
    }

    #[test]
    fn test_pretty_two_space_layout() {
        let json = to_json(&people()).unwrap();
        let expected = "[\n  {\n    \"name\": \"Alice\",\n    \"age\": \"30\"\n  },\n  {\n    \"name\": \"Bob\",\n    \"age\": \"25\"\n  }\n]";
        assert_eq!(json, expected);
    }

    #[test]
    fn test_compact_equivalent_matches_expected_document() {
        let json = to_json(&people()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"[{"age":"30","name":"Alice"},{"age":"25","name":"Bob"}]"#
        );
    }

    #[test]
    fn test_round_trip_preserves_rows_and_order() {
        let rows = vec![
            Row::from_pairs([("z", "quote \" and \\ slash"), ("a", "ünïcödé"), ("m", "")]),
            Row::from_pairs([("z", "line\nbreak"), ("a", "{}"), ("m", "'")]),
        ];
        let json = to_json(&rows).unwrap();
        let back: Vec<Row> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_empty_is_nothing_to_export() {
        assert_eq!(to_json(&[]), Err(ConvertError::NothingToExport));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(json_file_name("sales"), "sales.json");
        assert_eq!(json_file_name(""), "data.json");
    }
}
