//! Runtime settings stored in the `settings` table
//!
//! Every setting has a built-in default. Missing or NULL values are written
//! back with the default so the table always documents the live values.

use crate::{Error, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Rows kept for a free-tier upload
pub const FREE_ROW_LIMIT_KEY: &str = "free_row_limit";
/// Entries returned by the history listing
pub const HISTORY_LIMIT_KEY: &str = "history_limit";
/// Rows included in a session preview
pub const PREVIEW_ROWS_KEY: &str = "preview_rows";
/// Seconds a session may sit unchanged before it is discarded
pub const SESSION_TTL_SECS_KEY: &str = "session_ttl_secs";

const DEFAULT_FREE_ROW_LIMIT: usize = 10;
const DEFAULT_HISTORY_LIMIT: i64 = 5;
const DEFAULT_PREVIEW_ROWS: usize = 10;
const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Runtime settings loaded from database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub free_row_limit: usize,
    pub history_limit: i64,
    pub preview_rows: usize,
    pub session_ttl_secs: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            free_row_limit: DEFAULT_FREE_ROW_LIMIT,
            history_limit: DEFAULT_HISTORY_LIMIT,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }
}

impl RuntimeSettings {
    /// Load runtime settings from database
    ///
    /// Unparseable values fall back to the default with a warning rather
    /// than preventing startup.
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            free_row_limit: load_parsed(pool, FREE_ROW_LIMIT_KEY, defaults.free_row_limit).await?,
            history_limit: load_parsed(pool, HISTORY_LIMIT_KEY, defaults.history_limit).await?,
            preview_rows: load_parsed(pool, PREVIEW_ROWS_KEY, defaults.preview_rows).await?,
            session_ttl_secs: load_parsed(pool, SESSION_TTL_SECS_KEY, defaults.session_ttl_secs).await?,
        })
    }
}

async fn load_parsed<T>(pool: &SqlitePool, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + ToString,
{
    match get_setting(pool, key).await? {
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(_) => {
                warn!("Invalid value '{}' for setting '{}', using default {}", value, key, default.to_string());
                Ok(default)
            }
        },
        None => {
            info!("Setting '{}' not found in database, using default: {}", key, default.to_string());
            set_setting(pool, key, &default.to_string()).await?;
            Ok(default)
        }
    }
}

/// Read a setting value (NULL and missing both give `None`)
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(value.flatten())
}

/// Insert or replace a setting value
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidInput("Setting key must not be empty".to_string()));
    }

    sqlx::query(
        "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
pub(crate) async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, FREE_ROW_LIMIT_KEY, &DEFAULT_FREE_ROW_LIMIT.to_string()).await?;
    ensure_setting(pool, HISTORY_LIMIT_KEY, &DEFAULT_HISTORY_LIMIT.to_string()).await?;
    ensure_setting(pool, PREVIEW_ROWS_KEY, &DEFAULT_PREVIEW_ROWS.to_string()).await?;
    ensure_setting(pool, SESSION_TTL_SECS_KEY, &DEFAULT_SESSION_TTL_SECS.to_string()).await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let existing: Option<Option<String>> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    match existing {
        None => {
            // INSERT OR IGNORE: two services may initialize concurrently
            sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(default_value)
                .execute(pool)
                .await?;

            info!("Initialized setting '{}' with default value: {}", key, default_value);
        }
        Some(None) => {
            sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
                .bind(default_value)
                .bind(key)
                .execute(pool)
                .await?;

            warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
        }
        Some(Some(_)) => {}
    }

    Ok(())
}
