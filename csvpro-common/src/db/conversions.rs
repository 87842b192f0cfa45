//! Usage log (`conversion_history`) queries

use crate::db::models::{ConversionRecord, NewConversion};
use crate::{Error, Result};
use sqlx::SqlitePool;

/// Insert one usage log entry, returning its id
pub async fn record_conversion(pool: &SqlitePool, entry: &NewConversion) -> Result<i64> {
    if entry.row_count < 0 {
        return Err(Error::InvalidInput(format!("Negative row count: {}", entry.row_count)));
    }

    let result = sqlx::query(
        "INSERT INTO conversion_history (user_id, file_name, row_count, format) VALUES (?, ?, ?, ?)",
    )
    .bind(&entry.user_id)
    .bind(&entry.file_name)
    .bind(entry.row_count)
    .bind(&entry.format)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Most recent entries for a user, newest first
pub async fn recent_conversions(pool: &SqlitePool, user_id: &str, limit: i64) -> Result<Vec<ConversionRecord>> {
    let records = sqlx::query_as::<_, ConversionRecord>(
        r#"
        SELECT id, user_id, file_name, row_count, format, created_at
        FROM conversion_history
        WHERE user_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Total entries for a user
pub async fn count_conversions(pool: &SqlitePool, user_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM conversion_history WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}
