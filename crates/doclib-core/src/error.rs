//! Error types for the document library.

use thiserror::Error;

/// Result type alias using LibraryError.
pub type Result<T> = std::result::Result<T, LibraryError>;

/// Errors that can occur in the library store.
///
/// Reading a unique-keyed entity that does not exist is not an error;
/// those operations return `Option` instead.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// Underlying storage I/O or constraint failure. The enclosing
    /// transaction has been rolled back.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Persisted schema does not match this build. The store refuses to
    /// open; a migration step is required.
    #[error("Schema mismatch: expected identity {expected}, found {found}")]
    SchemaMismatch { expected: String, found: String },

    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LibraryError {
    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LibraryError::storage("disk full");
        assert!(err.to_string().contains("disk full"));

        let err = LibraryError::SchemaMismatch {
            expected: "aa".to_string(),
            found: "bb".to_string(),
        };
        assert!(err.to_string().contains("aa"));
        assert!(err.to_string().contains("bb"));
    }
}
