//! HTTP API handlers for csvpro-cv

pub mod billing;
pub mod buildinfo;
pub mod convert;
pub mod health;
pub mod history;
pub mod identity;
pub mod redeem;
pub mod sessions;

pub use billing::billing_webhook;
pub use buildinfo::get_build_info;
pub use convert::convert_file;
pub use health::health_routes;
pub use history::list_history;
pub use identity::{CurrentUser, USER_ID_HEADER};
pub use redeem::redeem_code;
pub use sessions::{
    create_session, delete_session, export_session, get_session, paste_text, upload_file,
};
