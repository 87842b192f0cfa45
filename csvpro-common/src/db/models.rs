//! Database models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A user known to the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: String,
    pub email: Option<String>,
    pub is_pro: bool,
    pub billing_customer_id: Option<String>,
    /// `free`, `subscription` or `lifetime`
    pub plan_type: String,
    pub tier: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// One usage log entry, as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversionRecord {
    pub id: i64,
    pub user_id: String,
    pub file_name: String,
    pub row_count: i64,
    pub format: String,
    pub created_at: NaiveDateTime,
}

/// Usage log entry to insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConversion {
    pub user_id: String,
    pub file_name: String,
    pub row_count: i64,
    /// `json` or `sql`
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PromoCode {
    pub code: String,
    pub tier: String,
    pub is_used: bool,
    pub used_by: Option<String>,
}
