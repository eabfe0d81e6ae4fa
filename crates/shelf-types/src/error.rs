use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid ISBN {isbn:?}: {reason}")]
    InvalidIsbn { isbn: String, reason: String },

    #[error("invalid uuid: {0}")]
    InvalidUuid(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
