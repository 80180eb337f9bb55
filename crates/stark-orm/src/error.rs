//! Error types for the storage layer.

use stark_forms::ValidationErrors;
use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No object found for the given primary key.
    #[error("object not found: {0}")]
    NotFound(i64),

    /// The data was rejected by the storage layer.
    ///
    /// Carries per-field messages so callers can show them next to the
    /// offending inputs.
    #[error("validation error: {0}")]
    Validation(ValidationErrors),

    /// Invalid field name.
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// A related collection that the storage does not know.
    #[error("unknown relation target: {0}")]
    UnknownRelation(String),

    /// Row could not be converted to or from the entity type.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend itself failed.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
