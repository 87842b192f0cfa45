//! Caller identity
//!
//! Authentication happens upstream; requests arrive with the user id in a
//! header. The id must name an existing profile.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use csvpro_common::db::{profiles, Profile};

use crate::pipeline::Entitlement;
use crate::{ApiError, AppState};

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Profile of the user making the request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Profile);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    /// Entitlement for a conversion started now
    pub fn entitlement(&self, free_row_limit: usize) -> Entitlement {
        Entitlement {
            is_pro: self.0.is_pro,
            row_limit: free_row_limit,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Missing user id".to_string()))?;

        let profile = profiles::find_profile(&state.db, user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized(format!("Unknown user: {}", user_id)))?;

        Ok(CurrentUser(profile))
    }
}
