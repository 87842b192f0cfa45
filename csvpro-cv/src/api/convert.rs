//! Stateless conversion endpoint (Pro only)

use axum::extract::{Multipart, State};
use axum::Json;
use csvpro_common::db::NewConversion;
use serde::Serialize;
use tracing::info;

use super::history::log_usage;
use super::sessions::read_file_field;
use super::CurrentUser;
use crate::pipeline::{convert, ConversionRequest, ExportFormat, Row};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub data: Vec<Row>,
    pub count: usize,
}

/// POST /api/convert
///
/// Parses a multipart `file` field in one request and returns every row.
pub async fn convert_file(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> ApiResult<Json<ConvertResponse>> {
    if !user.0.is_pro {
        return Err(ApiError::Forbidden("Please upgrade to use this feature".to_string()));
    }

    let (file_name, bytes) = read_file_field(multipart)
        .await?
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    let request = ConversionRequest::new(&file_name, user.entitlement(state.settings.free_row_limit));
    let result = tokio::task::spawn_blocking(move || convert(&bytes, &request))
        .await
        .map_err(|e| ApiError::Internal(format!("Conversion task failed: {}", e)))??;

    let count = result.rows.len();
    info!("Converted '{}' for {}: {} rows", file_name, user.id(), count);

    log_usage(
        &state.db,
        NewConversion {
            user_id: user.id().to_string(),
            file_name,
            row_count: count as i64,
            format: ExportFormat::Json.as_str().to_string(),
        },
    );

    Ok(Json(ConvertResponse {
        data: result.rows,
        count,
    }))
}
