//! Errors from config loading and the CSV Pro tables

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure in the shared config or storage layer
#[derive(Error, Debug)]
pub enum Error {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Reading the config file or creating the root folder
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML
    #[error("Configuration error: {0}")]
    Config(String),

    /// No profile row for this user id
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    /// Rejected before reaching the database
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A write went through but its row could not be read back
    #[error("Inconsistent state: {0}")]
    Inconsistent(String),
}

impl Error {
    /// The caller passed something unusable; retrying unchanged cannot succeed
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_and_classification() {
        let err = Error::UnknownProfile("u1".to_string());
        assert_eq!(err.to_string(), "Unknown profile: u1");
        assert!(!err.is_invalid_input());

        let err = Error::InvalidInput("empty key".to_string());
        assert!(err.is_invalid_input());

        let io: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(io, Error::Io(_)));
    }
}
