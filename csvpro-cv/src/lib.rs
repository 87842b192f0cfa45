//! csvpro-cv library - CSV conversion service
//!
//! Parses uploaded or pasted CSV into rows, truncates free-tier datasets,
//! and exports them as JSON or an SQL script.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use csvpro_common::db::RuntimeSettings;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod pipeline;

pub use error::{ApiError, ApiResult};

use pipeline::SessionStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// In-memory conversion sessions
    pub sessions: SessionStore,
    /// Runtime settings loaded at startup
    pub settings: RuntimeSettings,
    /// Billing webhook secret; `None` disables the webhook endpoint
    pub webhook_secret: Option<Arc<str>>,
    /// Accepted clock skew for webhook signatures
    pub signature_tolerance_secs: i64,
    /// Request body cap in bytes
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Create new application state with default limits
    pub fn new(db: SqlitePool, settings: RuntimeSettings) -> Self {
        Self {
            db,
            sessions: SessionStore::with_idle_ttl(Duration::from_secs(settings.session_ttl_secs)),
            settings,
            webhook_secret: None,
            signature_tolerance_secs: 300,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }

    pub fn with_webhook_secret(mut self, secret: Option<String>, tolerance_secs: i64) -> Self {
        self.webhook_secret = secret.map(Arc::from);
        self.signature_tolerance_secs = tolerance_secs;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Build application router
///
/// Health and build info are public; the webhook authenticates by signature;
/// everything else requires an `x-user-id` naming a known profile.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let body_limit = state.max_upload_bytes;

    let sessions = Router::new()
        .route("/api/sessions", post(api::create_session))
        .route(
            "/api/sessions/:id",
            get(api::get_session).delete(api::delete_session),
        )
        .route("/api/sessions/:id/upload", post(api::upload_file))
        .route("/api/sessions/:id/paste", post(api::paste_text))
        .route("/api/sessions/:id/export/:format", get(api::export_session));

    let account = Router::new()
        .route("/api/convert", post(api::convert_file))
        .route("/api/history", get(api::list_history))
        .route("/api/redeem", post(api::redeem_code))
        .route("/api/billing/webhook", post(api::billing_webhook));

    let public = Router::new()
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes());

    Router::new()
        .merge(sessions)
        .merge(account)
        .merge(public)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
