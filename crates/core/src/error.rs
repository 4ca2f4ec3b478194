//! Error types for the reverse image search engine.
//!
//! One variant per failure category a user can run into, plus the ambient
//! configuration, I/O and serialization errors.

use thiserror::Error;

/// Unified error type for the engine and the CLI.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Indexing target is missing or is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// Search path does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unreadable or corrupt image, or a malformed pixel grid
    #[error("Decode error: {0}")]
    Decode(String),

    /// Identifier already present in the index
    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    /// Index storage missing, corrupt or cannot be opened
    #[error("Index unavailable: {0}")]
    StorageUnavailable(String),

    /// Bad argument (k, worker count, extractor name, command)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Descriptors from different extractor configurations were mixed
    #[error("Extractor mismatch: index uses '{expected}', got '{found}'")]
    ExtractorMismatch { expected: String, found: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error concerns a single input file and can be recovered
    /// by skipping that file.
    pub fn is_per_file(&self) -> bool {
        matches!(self, AppError::Decode(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message() {
        let err = AppError::ExtractorMismatch {
            expected: "cedd-v1:144".to_string(),
            found: "color-histogram-v1:64".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Extractor mismatch: index uses 'cedd-v1:144', got 'color-histogram-v1:64'"
        );
    }

    #[test]
    fn test_per_file_classification() {
        assert!(AppError::Decode("bad header".to_string()).is_per_file());
        assert!(!AppError::StorageUnavailable("gone".to_string()).is_per_file());
        assert!(!AppError::DuplicateIdentifier("/a.jpg".to_string()).is_per_file());
    }
}
