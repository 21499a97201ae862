//! Local sync error types.

use mcplinker_model::ModelError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for local sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while reading, syncing or writing client configs.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("source and destination are the same client '{0}'")]
    SameClientSync(String),

    #[error("client '{0}' requires a config path")]
    PathRequired(String),

    #[error("config file {}: {reason}", path.display())]
    ConfigFile { path: PathBuf, reason: String },

    #[error("could not determine the home directory")]
    NoHomeDir,

    #[error("draft store error: {0}")]
    Draft(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl SyncError {
    pub(crate) fn config_file(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigFile {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
