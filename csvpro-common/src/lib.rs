//! # CSV Pro Common Library
//!
//! Shared code for the CSV Pro services including:
//! - Database initialization, models and queries
//! - Bootstrap configuration and root folder resolution
//! - Billing webhook signature verification
//! - Shared API response types

pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;

pub use error::{Error, Result};
