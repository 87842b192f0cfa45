//! Tests for database initialization and the query modules
//!
//! Each test works on its own database file inside a temp directory.

use csvpro_common::db::conversions::{count_conversions, record_conversion, recent_conversions};
use csvpro_common::db::init::init_database;
use csvpro_common::db::profiles::{find_profile, set_pro_by_customer, set_pro_by_user, upsert_profile};
use csvpro_common::db::promo::{create_promo_code, find_promo_code, insert_promo_code, redeem_promo_code};
use csvpro_common::db::settings::{get_setting, set_setting, FREE_ROW_LIMIT_KEY, SESSION_TTL_SECS_KEY};
use csvpro_common::db::{NewConversion, RuntimeSettings};
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn fresh_db() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("temp dir");
    let pool = init_database(&dir.path().join("csvpro.db"))
        .await
        .expect("database init");
    (dir, pool)
}

fn conversion(user_id: &str, file_name: &str, rows: i64, format: &str) -> NewConversion {
    NewConversion {
        user_id: user_id.to_string(),
        file_name: file_name.to_string(),
        row_count: rows,
        format: format.to_string(),
    }
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("csvpro.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("csvpro.db");

    let pool1 = init_database(&db_path).await.unwrap();
    upsert_profile(&pool1, "user-1", None).await.unwrap();
    pool1.close().await;

    // Second open keeps data and does not fail on existing tables
    let pool2 = init_database(&db_path).await.unwrap();
    assert!(find_profile(&pool2, "user-1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let (_dir, pool) = fresh_db().await;

    let settings = RuntimeSettings::load(&pool).await.unwrap();
    assert_eq!(settings, RuntimeSettings::default());
    assert_eq!(settings.free_row_limit, 10);
    assert_eq!(settings.history_limit, 5);
    assert_eq!(settings.session_ttl_secs, 3600);

    let stored = get_setting(&pool, FREE_ROW_LIMIT_KEY).await.unwrap();
    assert_eq!(stored.as_deref(), Some("10"));
    let stored = get_setting(&pool, SESSION_TTL_SECS_KEY).await.unwrap();
    assert_eq!(stored.as_deref(), Some("3600"));
}

#[tokio::test]
async fn test_settings_override_and_invalid_fallback() {
    let (_dir, pool) = fresh_db().await;

    set_setting(&pool, FREE_ROW_LIMIT_KEY, "25").await.unwrap();
    assert_eq!(RuntimeSettings::load(&pool).await.unwrap().free_row_limit, 25);

    set_setting(&pool, FREE_ROW_LIMIT_KEY, "lots").await.unwrap();
    assert_eq!(RuntimeSettings::load(&pool).await.unwrap().free_row_limit, 10);
}

#[tokio::test]
async fn test_upsert_profile_defaults_to_free() {
    let (_dir, pool) = fresh_db().await;

    let profile = upsert_profile(&pool, "user-1", Some("a@example.com")).await.unwrap();
    assert!(!profile.is_pro);
    assert_eq!(profile.plan_type, "free");
    assert_eq!(profile.email.as_deref(), Some("a@example.com"));

    // A later upsert without email keeps the stored email
    let again = upsert_profile(&pool, "user-1", None).await.unwrap();
    assert_eq!(again.email.as_deref(), Some("a@example.com"));

    assert!(upsert_profile(&pool, "  ", None).await.is_err());
}

#[tokio::test]
async fn test_pro_flag_by_user_and_customer() {
    let (_dir, pool) = fresh_db().await;
    upsert_profile(&pool, "user-1", None).await.unwrap();

    assert!(set_pro_by_user(&pool, "user-1", true, Some("cus_1")).await.unwrap());
    let profile = find_profile(&pool, "user-1").await.unwrap().unwrap();
    assert!(profile.is_pro);
    assert_eq!(profile.plan_type, "subscription");
    assert_eq!(profile.billing_customer_id.as_deref(), Some("cus_1"));

    assert_eq!(set_pro_by_customer(&pool, "cus_1", false).await.unwrap(), 1);
    let profile = find_profile(&pool, "user-1").await.unwrap().unwrap();
    assert!(!profile.is_pro);
    assert_eq!(profile.plan_type, "free");

    // Unknown user / customer
    assert!(!set_pro_by_user(&pool, "ghost", true, None).await.unwrap());
    assert_eq!(set_pro_by_customer(&pool, "cus_unknown", true).await.unwrap(), 0);
}

#[tokio::test]
async fn test_conversion_history_newest_first() {
    let (_dir, pool) = fresh_db().await;
    upsert_profile(&pool, "user-1", None).await.unwrap();
    upsert_profile(&pool, "user-2", None).await.unwrap();

    for i in 0..7 {
        record_conversion(&pool, &conversion("user-1", &format!("file{}", i), i, "json"))
            .await
            .unwrap();
    }
    record_conversion(&pool, &conversion("user-2", "other", 3, "sql")).await.unwrap();

    let recent = recent_conversions(&pool, "user-1", 5).await.unwrap();
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0].file_name, "file6");
    assert_eq!(recent[4].file_name, "file2");
    assert!(recent.iter().all(|r| r.user_id == "user-1"));

    assert_eq!(count_conversions(&pool, "user-1").await.unwrap(), 7);
    assert_eq!(count_conversions(&pool, "user-2").await.unwrap(), 1);
}

#[tokio::test]
async fn test_conversion_rejects_unknown_format_and_negative_rows() {
    let (_dir, pool) = fresh_db().await;
    upsert_profile(&pool, "user-1", None).await.unwrap();

    assert!(record_conversion(&pool, &conversion("user-1", "f", 1, "xml")).await.is_err());
    assert!(record_conversion(&pool, &conversion("user-1", "f", -1, "json")).await.is_err());
}

#[tokio::test]
async fn test_promo_redemption_once() {
    let (_dir, pool) = fresh_db().await;
    upsert_profile(&pool, "user-1", None).await.unwrap();
    upsert_profile(&pool, "user-2", None).await.unwrap();
    insert_promo_code(&pool, "LAUNCH", "plus").await.unwrap();

    let tier = redeem_promo_code(&pool, "LAUNCH", "user-1").await.unwrap();
    assert_eq!(tier.as_deref(), Some("plus"));

    let profile = find_profile(&pool, "user-1").await.unwrap().unwrap();
    assert!(profile.is_pro);
    assert_eq!(profile.plan_type, "lifetime");
    assert_eq!(profile.tier.as_deref(), Some("plus"));

    let promo = find_promo_code(&pool, "LAUNCH").await.unwrap().unwrap();
    assert!(promo.is_used);
    assert_eq!(promo.used_by.as_deref(), Some("user-1"));

    // Second redemption fails, even by another user
    assert_eq!(redeem_promo_code(&pool, "LAUNCH", "user-2").await.unwrap(), None);
    assert_eq!(redeem_promo_code(&pool, "NOPE", "user-2").await.unwrap(), None);
    assert!(!find_profile(&pool, "user-2").await.unwrap().unwrap().is_pro);
}

#[tokio::test]
async fn test_lifetime_plan_survives_subscription_cancel() {
    let (_dir, pool) = fresh_db().await;
    upsert_profile(&pool, "user-1", None).await.unwrap();
    set_pro_by_user(&pool, "user-1", true, Some("cus_1")).await.unwrap();

    let code = create_promo_code(&pool, "pro").await.unwrap();
    assert_eq!(code.len(), 12);
    redeem_promo_code(&pool, &code, "user-1").await.unwrap();

    assert_eq!(set_pro_by_customer(&pool, "cus_1", false).await.unwrap(), 0);
    assert!(find_profile(&pool, "user-1").await.unwrap().unwrap().is_pro);
}

#[tokio::test]
async fn test_redeem_for_missing_profile_rolls_back() {
    let (_dir, pool) = fresh_db().await;
    insert_promo_code(&pool, "ORPHAN", "plus").await.unwrap();

    assert!(redeem_promo_code(&pool, "ORPHAN", "ghost").await.is_err());

    // Code is still available
    let promo = find_promo_code(&pool, "ORPHAN").await.unwrap().unwrap();
    assert!(!promo.is_used);
}
