//! Promo code issue and redemption

use crate::db::models::PromoCode;
use crate::db::profiles::apply_lifetime_plan;
use crate::{Error, Result};
use rand::{distributions::Alphanumeric, Rng};
use sqlx::SqlitePool;
use tracing::info;

const GENERATED_CODE_LEN: usize = 12;

/// Store a promo code for `tier`
pub async fn insert_promo_code(pool: &SqlitePool, code: &str, tier: &str) -> Result<()> {
    if code.trim().is_empty() || tier.trim().is_empty() {
        return Err(Error::InvalidInput("Promo code and tier must not be empty".to_string()));
    }

    sqlx::query("INSERT INTO promo_codes (code, tier) VALUES (?, ?)")
        .bind(code)
        .bind(tier)
        .execute(pool)
        .await?;

    Ok(())
}

/// Generate and store a random upper-case code for `tier`
pub async fn create_promo_code(pool: &SqlitePool, tier: &str) -> Result<String> {
    let code: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_CODE_LEN)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();

    insert_promo_code(pool, &code, tier).await?;
    Ok(code)
}

pub async fn find_promo_code(pool: &SqlitePool, code: &str) -> Result<Option<PromoCode>> {
    let promo = sqlx::query_as::<_, PromoCode>(
        "SELECT code, tier, is_used, used_by FROM promo_codes WHERE code = ?",
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(promo)
}

/// Redeem a code for a user
///
/// Marking the code used and upgrading the profile happen in one
/// transaction. The `is_used = 0` guard in the UPDATE makes concurrent
/// redemptions of the same code race-free: only one sees a returned tier.
///
/// Returns the granted tier, or `None` when the code is unknown or used.
pub async fn redeem_promo_code(pool: &SqlitePool, code: &str, user_id: &str) -> Result<Option<String>> {
    let mut tx = pool.begin().await?;

    let tier: Option<String> = sqlx::query_scalar(
        r#"
        UPDATE promo_codes
        SET is_used = 1, used_by = ?, used_at = CURRENT_TIMESTAMP
        WHERE code = ? AND is_used = 0
        RETURNING tier
        "#,
    )
    .bind(user_id)
    .bind(code)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(tier) = tier else {
        tx.rollback().await?;
        return Ok(None);
    };

    if !apply_lifetime_plan(&mut tx, user_id, &tier).await? {
        tx.rollback().await?;
        return Err(Error::UnknownProfile(user_id.to_string()));
    }

    tx.commit().await?;
    info!("User {} redeemed promo code for tier '{}'", user_id, tier);

    Ok(Some(tier))
}
