//! Model error types.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while validating or mutating server entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid server config shape: {0}")]
    InvalidConfigShape(String),

    #[error("server '{0}' not found")]
    ServerNotFound(String),

    #[error("server '{0}' is already active")]
    AlreadyActive(String),
}

impl ModelError {
    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        Self::InvalidConfigShape(msg.into())
    }
}
