//! Error types for hyperion.

use thiserror::Error;

/// Errors that can occur in hyperion operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    /// A request body that is well-formed but violates a schema rule.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    /// A row that was inserted in the current transaction could not be read back.
    #[error("Newly added {0} could not be found in the database")]
    NewlyAddedObjectNotFound(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

/// Result type alias for hyperion operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    pub fn forbidden(why: impl Into<String>) -> Self {
        Error::Forbidden(why.into())
    }
}
