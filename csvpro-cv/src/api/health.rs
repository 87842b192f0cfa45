//! Liveness endpoint for load balancers and monitoring
//!
//! Answers without a user header. A failing database ping turns the answer
//! into 503 so the instance is taken out of rotation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database does not answer
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub database: bool,
    /// Sessions held in memory, expired ones included until the next sweep
    pub sessions: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => true,
        Err(e) => {
            warn!("Health check: database ping failed: {}", e);
            false
        }
    };

    let (code, status) = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let response = HealthResponse {
        status,
        module: "csvpro-cv",
        version: env!("CARGO_PKG_VERSION"),
        database,
        sessions: state.sessions.len().await,
    };
    (code, Json(response))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
