//! Promo code redemption

use axum::extract::State;
use axum::Json;
use csvpro_common::db::promo::redeem_promo_code;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::CurrentUser;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub success: bool,
    pub tier: String,
}

/// POST /api/redeem
///
/// Grants a lifetime plan for an unused code.
pub async fn redeem_code(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<RedeemRequest>,
) -> ApiResult<Json<RedeemResponse>> {
    let code = request.code.trim();
    if code.is_empty() {
        return Err(ApiError::BadRequest("Invalid or used code".to_string()));
    }

    match redeem_promo_code(&state.db, code, user.id()).await? {
        Some(tier) => Ok(Json(RedeemResponse { success: true, tier })),
        None => {
            warn!("User {} tried invalid or used promo code", user.id());
            Err(ApiError::BadRequest("Invalid or used code".to_string()))
        }
    }
}
