//! Error types for the admin scaffold.

use thiserror::Error;

/// Admin-specific errors.
#[derive(Debug, Error)]
pub enum StarkError {
    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] stark_orm::StorageError),

    /// Routing error.
    #[error("router error: {0}")]
    Router(#[from] stark_router::RouterError),

    /// Form error.
    #[error("form error: {0}")]
    Form(#[from] stark_forms::FormError),

    /// A configuration document that does not parse.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// A bulk action name that the handler does not declare.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// Two routes ended up with the same URL name.
    #[error("duplicate url name: {0}")]
    DuplicateUrlName(String),

    /// A handler option names a field the entity does not have.
    #[error("{model}: {option} refers to unknown field {field:?}")]
    UnknownField {
        model: String,
        option: &'static str,
        field: String,
    },

    /// Two declared actions share a name.
    #[error("{model}: duplicate action {action:?}")]
    DuplicateAction { model: String, action: String },

    /// Any other setting that cannot work.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for admin operations.
pub type Result<T> = std::result::Result<T, StarkError>;
