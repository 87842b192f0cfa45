//! End-to-end tests of the conversion pipeline without HTTP
//!
//! Checks the laws that hold for any input: row counts and key sets,
//! truncation, JSON round trips, and SQL scripts that load into SQLite.

use csvpro_cv::pipeline::parser::parse_str;
use csvpro_cv::pipeline::{
    apply_entitlement, convert, export, ConversionRequest, ConvertError, Entitlement, ExportFormat, Row,
};
use sqlx::{Connection, SqliteConnection};

/// Hand-picked inputs covering quoting, blank lines, ragged rows and BOMs
fn corpus() -> Vec<(&'static str, usize)> {
    vec![
        ("name,age\nAlice,30\nBob,25", 2),
        ("a,b,c\n1,2,3\n\n4,5,6\n   \n7,8,9\n", 3),
        ("\u{feff}id,text\n1,\"hello, world\"\n2,\"say \"\"hi\"\"\"\n", 2),
        ("x,y\n1\n2,3,4\n", 2),
        ("\n\nh1,h2\r\nv1,v2\r\n", 1),
        ("only_header\n", 0),
        ("", 0),
        ("k\n\"multi\nline\"\n", 1),
    ]
}

fn header_of(input: &str) -> Vec<String> {
    let first = input
        .trim_start_matches('\u{feff}')
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("");
    first.split(',').map(|s| s.trim_end_matches('\r').to_string()).collect()
}

#[test]
fn test_row_count_and_keys_match_input() {
    for (input, expected_rows) in corpus() {
        let rows = parse_str(input).unwrap();
        assert_eq!(rows.len(), expected_rows, "row count for {:?}", input);

        let header = header_of(input);
        for row in &rows {
            let keys: Vec<String> = row.columns().map(str::to_string).collect();
            assert_eq!(keys, header, "keys for {:?}", input);
        }
    }
}

#[test]
fn test_truncation_law() {
    for n in [0usize, 1, 9, 10, 11, 15, 40] {
        let rows: Vec<Row> = (0..n).map(|i| Row::from_pairs([("i", i.to_string())])).collect();
        for limit in [0usize, 1, 10] {
            let result = apply_entitlement(rows.clone(), &Entitlement::free(limit));
            assert_eq!(result.rows.len(), n.min(limit));
            assert_eq!(result.truncated, n > limit);
            assert_eq!(result.warning.is_some(), n > limit);
            assert_eq!(result.rows[..], rows[..n.min(limit)]);

            let pro = apply_entitlement(rows.clone(), &Entitlement::pro(limit));
            assert_eq!(pro.rows.len(), n);
            assert!(!pro.truncated);
        }
    }
}

#[test]
fn test_json_export_round_trips() {
    for (input, _) in corpus() {
        let rows = parse_str(input).unwrap();
        match export(&rows, "t", ExportFormat::Json) {
            Ok(file) => {
                let back: Vec<Row> = serde_json::from_str(&file.body).unwrap();
                assert_eq!(back, rows);
            }
            Err(e) => {
                assert!(rows.is_empty());
                assert_eq!(e, ConvertError::NothingToExport);
            }
        }
    }
}

#[test]
fn test_sql_export_has_one_create_and_one_insert() {
    for (input, _) in corpus() {
        let rows = parse_str(input).unwrap();
        let Ok(file) = export(&rows, "Some Table", ExportFormat::Sql) else {
            assert!(rows.is_empty());
            continue;
        };

        assert_eq!(file.file_name, "some_table.sql");
        assert_eq!(file.body.matches("CREATE TABLE some_table (").count(), 1);
        assert_eq!(file.body.matches("INSERT INTO some_table (").count(), 1);

        // Values may span lines; count tuple separators instead
        let values = file.body.split(") VALUES\n").nth(1).unwrap();
        assert_eq!(values.matches("'),\n(").count() + 1, rows.len());
        assert!(values.ends_with(");\n"));
    }
}

/// Run a generated script on a fresh in-memory database, returning the row count
async fn load_script(script: &str, table: &str) -> i64 {
    let mut conn = SqliteConnection::connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    sqlx::raw_sql(script)
        .execute(&mut conn)
        .await
        .unwrap_or_else(|e| panic!("script failed: {}\n{}", e, script));
    let query = format!("SELECT COUNT(*) FROM {}", table);
    let count: i64 = sqlx::query_scalar(&query).fetch_one(&mut conn).await.unwrap();
    count
}

#[tokio::test]
async fn test_sql_script_runs_on_sqlite() {
    for (input, _) in corpus() {
        let rows = parse_str(input).unwrap();
        let Ok(file) = export(&rows, "Some Table", ExportFormat::Sql) else {
            continue;
        };
        assert_eq!(load_script(&file.body, "some_table").await, rows.len() as i64);
    }
}

#[tokio::test]
async fn test_sql_script_with_keyword_columns_runs_on_sqlite() {
    let rows = parse_str("id,order,group,select,from,table,Unit Price ($),\n1,2,3,4,5,6,7,8\n9,it's,,,,,,\n").unwrap();

    let file = export(&rows, "order", ExportFormat::Sql).unwrap();
    assert_eq!(load_script(&file.body, "\"order\"").await, 2);

    let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
    sqlx::raw_sql(&file.body).execute(&mut conn).await.unwrap();
    let value: String = sqlx::query_scalar("SELECT \"order\" FROM \"order\" WHERE id = '9'")
        .fetch_one(&mut conn)
        .await
        .unwrap();
    assert_eq!(value, "it's");
}

#[test]
fn test_small_free_scenario() {
    let request = ConversionRequest::new("people.csv", Entitlement::free(10));
    let result = convert(b"name,age\nAlice,30\nBob,25", &request).unwrap();

    assert!(!result.truncated);
    assert_eq!(
        serde_json::to_string(&result.rows).unwrap(),
        r#"[{"name":"Alice","age":"30"},{"name":"Bob","age":"25"}]"#
    );
}

#[test]
fn test_large_free_scenario() {
    let mut csv = String::from("id\n");
    for i in 1..=15 {
        csv.push_str(&format!("{}\n", i));
    }

    let request = ConversionRequest::new("big.csv", Entitlement::free(10));
    let result = convert(csv.as_bytes(), &request).unwrap();

    assert_eq!(result.rows.len(), 10);
    assert!(result.truncated);
    assert_eq!(
        result.warning.as_deref(),
        Some("Free limit reached. Only the first 10 rows are available.")
    );
}

#[test]
fn test_invalid_utf8_is_parse_error() {
    let request = ConversionRequest::new("bin.csv", Entitlement::pro(10));
    let err = convert(&[b'a', b'\n', 0xff, 0xfe], &request).unwrap_err();
    assert!(matches!(err, ConvertError::Parse(_)));
}
