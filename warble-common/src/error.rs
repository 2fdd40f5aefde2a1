//! Error types for the Warble bot extensions.

use thiserror::Error;

/// Result type alias using the Warble error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the Warble crates.
///
/// Presence tracking never fails; these variants cover the credential store,
/// password hashing, and configuration loading. User-visible login outcomes
/// (bad usage, wrong credentials) are not errors and live with the auth gate.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Credential store error
    #[error("Credential store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Password hashing error
    #[error("Password hashing error: {0}")]
    Hash(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Check if this error came from the credential store.
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("missing section".into());
        assert_eq!(err.to_string(), "Configuration error: missing section");

        let err = Error::InvalidInput("username cannot be empty".into());
        assert_eq!(err.to_string(), "Invalid input: username cannot be empty");
    }

    #[test]
    fn test_is_store() {
        let err = Error::from(rusqlite::Error::InvalidQuery);
        assert!(err.is_store());
        assert!(!Error::Hash("bad".into()).is_store());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::from(io);
        assert!(matches!(err, Error::Io(_)));
    }
}
