//! Cloud backup error types.

use thiserror::Error;

/// Result type for cloud operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors that can occur in cloud backup operations.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("API request failed: {0}")]
    Api(String),

    /// A record with the same (server name, client name) already exists.
    #[error("config already exists in cloud: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("authentication required")]
    AuthRequired,

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The server has no batch endpoint; callers fall back to per-item calls.
    #[error("batch sync unavailable: {0}")]
    BatchUnavailable(String),

    #[error("failed to upload '{name}': {reason}")]
    UploadFailed { name: String, reason: String },

    #[error("failed to download '{name}': {reason}")]
    DownloadFailed { name: String, reason: String },

    #[error("failed to delete '{name}': {reason}")]
    DeleteFailed { name: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] mcplinker_crypto::CryptoError),

    #[error(transparent)]
    Model(#[from] mcplinker_model::ModelError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CloudError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, CloudError::Conflict(_))
    }

    pub fn is_key_unavailable(&self) -> bool {
        matches!(
            self,
            CloudError::Crypto(mcplinker_crypto::CryptoError::KeyUnavailable(_))
        )
    }

    pub fn is_batch_unavailable(&self) -> bool {
        matches!(self, CloudError::BatchUnavailable(_))
    }

    /// Errors no retry strategy can fix without the user signing in again.
    pub fn is_auth(&self) -> bool {
        matches!(self, CloudError::AuthRequired | CloudError::AuthFailed(_))
    }
}
