//! Profile queries (entitlement source)

use crate::db::models::Profile;
use crate::{Error, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};

const PROFILE_COLUMNS: &str =
    "id, email, is_pro, billing_customer_id, plan_type, tier, created_at, updated_at";

/// Fetch one profile by user id
pub async fn find_profile(pool: &SqlitePool, user_id: &str) -> Result<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(&format!(
        "SELECT {} FROM profiles WHERE id = ?",
        PROFILE_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(profile)
}

/// Create a profile, or refresh the email of an existing one
///
/// Called by the identity layer when a user signs in; entitlement columns
/// are never touched here.
pub async fn upsert_profile(pool: &SqlitePool, user_id: &str, email: Option<&str>) -> Result<Profile> {
    if user_id.trim().is_empty() {
        return Err(Error::InvalidInput("User id must not be empty".to_string()));
    }

    sqlx::query(
        r#"
        INSERT INTO profiles (id, email) VALUES (?, ?)
        ON CONFLICT(id) DO UPDATE SET
            email = COALESCE(excluded.email, profiles.email),
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(user_id)
    .bind(email)
    .execute(pool)
    .await?;

    find_profile(pool, user_id)
        .await?
        .ok_or_else(|| Error::Inconsistent(format!("profile {} missing after upsert", user_id)))
}

/// Set the Pro flag for a user, optionally linking the billing customer
///
/// Returns `false` when no profile has that id.
pub async fn set_pro_by_user(
    pool: &SqlitePool,
    user_id: &str,
    is_pro: bool,
    billing_customer_id: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE profiles SET
            is_pro = ?,
            billing_customer_id = COALESCE(?, billing_customer_id),
            plan_type = CASE WHEN ? THEN 'subscription' ELSE plan_type END,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(is_pro)
    .bind(billing_customer_id)
    .bind(is_pro)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Set the Pro flag for whichever profile is linked to a billing customer
///
/// Lifetime plans are left untouched: a cancelled subscription does not
/// revoke a redeemed lifetime code. Returns the number of updated profiles.
pub async fn set_pro_by_customer(pool: &SqlitePool, billing_customer_id: &str, is_pro: bool) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE profiles SET
            is_pro = ?,
            plan_type = CASE WHEN ? THEN 'subscription' ELSE 'free' END,
            updated_at = CURRENT_TIMESTAMP
        WHERE billing_customer_id = ? AND plan_type != 'lifetime'
        "#,
    )
    .bind(is_pro)
    .bind(is_pro)
    .bind(billing_customer_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Grant a lifetime plan inside an open transaction
pub(crate) async fn apply_lifetime_plan(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: &str,
    tier: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE profiles SET
            is_pro = 1,
            plan_type = 'lifetime',
            tier = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(tier)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}
