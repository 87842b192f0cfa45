//! Database models and queries

pub mod conversions;
pub mod init;
pub mod models;
pub mod profiles;
pub mod promo;
pub mod settings;

pub use init::*;
pub use models::*;
pub use settings::RuntimeSettings;
