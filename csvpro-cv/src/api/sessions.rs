//! Conversion session endpoints
//!
//! Create a session, feed it a CSV upload or pasted text, read back the
//! preview, then download exports. Every export is recorded in the usage log.

use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use csvpro_common::db::NewConversion;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::history::log_usage;
use super::CurrentUser;
use crate::pipeline::{convert, ConversionRequest, ExportFormat, SessionSnapshot};
use crate::{ApiError, ApiResult, AppState};

/// Multipart field holding the uploaded file
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct PasteRequest {
    pub text: String,
    /// Optional name used for export file names
    pub name: Option<String>,
}

fn session_not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Session {}", id))
}

/// POST /api/sessions
pub async fn create_session(
    State(state): State<AppState>,
    user: CurrentUser,
) -> (StatusCode, Json<SessionSnapshot>) {
    let session = state.sessions.create(user.id()).await;
    info!("Created session {} for {}", session.id, user.id());
    (
        StatusCode::CREATED,
        Json(session.snapshot(state.settings.preview_rows)),
    )
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionSnapshot>> {
    let preview_rows = state.settings.preview_rows;
    state
        .sessions
        .read(id, user.id(), |s| s.snapshot(preview_rows))
        .await
        .map(Json)
        .ok_or_else(|| session_not_found(id))
}

/// DELETE /api/sessions/:id
pub async fn delete_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.sessions.remove(id, user.id()).await {
        info!("Deleted session {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found(id))
    }
}

/// POST /api/sessions/:id/upload
///
/// Multipart body with a `file` field whose name ends in `.csv`.
pub async fn upload_file(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<SessionSnapshot>> {
    let (file_name, bytes) = read_file_field(multipart)
        .await?
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    if !file_name.to_ascii_lowercase().ends_with(".csv") {
        return Err(ApiError::BadRequest(format!(
            "Only .csv files are accepted (got '{}')",
            file_name
        )));
    }

    process_input(&state, &user, id, &file_name, bytes).await
}

/// POST /api/sessions/:id/paste
pub async fn paste_text(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<PasteRequest>,
) -> ApiResult<Json<SessionSnapshot>> {
    let name = request.name.unwrap_or_default();
    process_input(&state, &user, id, &name, Bytes::from(request.text)).await
}

/// Run the pipeline for new session input
///
/// The session enters `Processing` before the parse and takes the outcome
/// afterwards, unless newer input arrived in between.
async fn process_input(
    state: &AppState,
    user: &CurrentUser,
    id: Uuid,
    file_name: &str,
    bytes: Bytes,
) -> ApiResult<Json<SessionSnapshot>> {
    let request = ConversionRequest::new(file_name, user.entitlement(state.settings.free_row_limit));

    let source_name = request.source_name.clone();
    let generation = state
        .sessions
        .update(id, user.id(), |s| s.begin(source_name))
        .await
        .ok_or_else(|| session_not_found(id))?;

    debug!(
        "Session {}: processing '{}' ({} bytes, generation {})",
        id,
        file_name,
        bytes.len(),
        generation
    );

    let outcome = tokio::task::spawn_blocking(move || convert(&bytes, &request))
        .await
        .map_err(|e| ApiError::Internal(format!("Conversion task failed: {}", e)))?;

    match &outcome {
        Ok(result) if result.truncated => info!(
            "Session {}: {} rows (truncated for free tier)",
            id,
            result.rows.len()
        ),
        Ok(result) => info!("Session {}: {} rows", id, result.rows.len()),
        Err(e) => warn!("Session {}: {}", id, e),
    }

    let preview_rows = state.settings.preview_rows;
    state
        .sessions
        .update(id, user.id(), |s| {
            s.complete(generation, outcome);
            s.snapshot(preview_rows)
        })
        .await
        .map(Json)
        .ok_or_else(|| session_not_found(id))
}

/// GET /api/sessions/:id/export/:format
pub async fn export_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, format)): Path<(Uuid, String)>,
) -> ApiResult<Response> {
    let format: ExportFormat = format.parse().map_err(ApiError::BadRequest)?;

    let (file, entry) = state
        .sessions
        .read(id, user.id(), |s| {
            s.export(format).map(|file| {
                let entry = NewConversion {
                    user_id: user.id().to_string(),
                    file_name: s.source_name().unwrap_or_default().to_string(),
                    row_count: s.rows().len() as i64,
                    format: format.as_str().to_string(),
                };
                (file, entry)
            })
        })
        .await
        .ok_or_else(|| session_not_found(id))??;

    let disposition = content_disposition(&file.file_name)?;

    info!(
        "Session {}: exporting {} ({} rows)",
        id, file.file_name, entry.row_count
    );
    log_usage(&state.db, entry);

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(file.content_type)),
        (header::CONTENT_DISPOSITION, disposition),
    ];
    Ok((headers, file.body).into_response())
}

/// Download file name safe to place inside a quoted header parameter
///
/// Control characters, quotes, backslashes and non-ASCII characters become `_`.
fn attachment_name(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            ' '..='~' if c != '"' && c != '\\' => c,
            _ => '_',
        })
        .collect();
    if safe.trim().is_empty() {
        "download".to_string()
    } else {
        safe
    }
}

fn content_disposition(file_name: &str) -> ApiResult<HeaderValue> {
    let value = format!("attachment; filename=\"{}\"", attachment_name(file_name));
    HeaderValue::try_from(value)
        .map_err(|e| ApiError::Internal(format!("Invalid download header: {}", e)))
}

/// First `file` field of a multipart body: (client file name, contents)
pub(crate) async fn read_file_field(mut multipart: Multipart) -> ApiResult<Option<(String, Bytes)>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Could not read upload: {}", e)))?;
        return Ok(Some((file_name, bytes)));
    }

    Ok(None)
}
