//! Usage log endpoints

use axum::extract::{Query, State};
use axum::Json;
use csvpro_common::db::conversions::{count_conversions, record_conversion, recent_conversions};
use csvpro_common::db::{ConversionRecord, NewConversion};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use super::CurrentUser;
use crate::{ApiResult, AppState};

/// Largest page a client may request
const MAX_HISTORY_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub entries: Vec<ConversionRecord>,
    pub total: i64,
}

/// GET /api/history?limit=
///
/// Newest first. Without `limit` the configured history length is used.
pub async fn list_history(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let limit = query
        .limit
        .unwrap_or(state.settings.history_limit)
        .clamp(0, MAX_HISTORY_LIMIT);

    let entries = recent_conversions(&state.db, user.id(), limit).await?;
    let total = count_conversions(&state.db, user.id()).await?;

    Ok(Json(HistoryResponse { entries, total }))
}

/// Record a usage entry in the background
///
/// The caller's response never waits on, or fails because of, the insert.
pub(crate) fn log_usage(db: &SqlitePool, entry: NewConversion) -> tokio::task::JoinHandle<()> {
    let db = db.clone();
    tokio::spawn(async move {
        match record_conversion(&db, &entry).await {
            Ok(id) => debug!(
                "Logged {} export of '{}' ({} rows) for {} as #{}",
                entry.format, entry.file_name, entry.row_count, entry.user_id, id
            ),
            Err(e) => warn!(
                "Failed to log {} export of '{}' for {}: {}",
                entry.format, entry.file_name, entry.user_id, e
            ),
        }
    })
}
