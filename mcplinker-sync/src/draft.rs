//! Scratch state for a server entry being edited.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

/// An unfinished entry. `config` is kept raw since a draft may not parse yet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerDraft {
    pub server_name: String,
    pub config: Value,
    pub env_values: BTreeMap<String, String>,
}

/// Where the current draft is kept between edits.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn load(&self) -> SyncResult<Option<ServerDraft>>;
    async fn save(&self, draft: &ServerDraft) -> SyncResult<()>;
    async fn clear(&self) -> SyncResult<()>;
}

/// Draft persisted as one JSON file.
#[derive(Clone, Debug)]
pub struct FileDraftStore {
    path: PathBuf,
}

impl FileDraftStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DraftStore for FileDraftStore {
    async fn load(&self) -> SyncResult<Option<ServerDraft>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(draft) => Ok(Some(draft)),
            Err(e) => {
                // corrupt drafts are dropped
                warn!(path = %self.path.display(), error = %e, "discarding unreadable draft");
                Ok(None)
            }
        }
    }

    async fn save(&self, draft: &ServerDraft) -> SyncResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(draft)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }

    async fn clear(&self) -> SyncResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process draft.
#[derive(Default)]
pub struct MemoryDraftStore {
    draft: Mutex<Option<ServerDraft>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> SyncResult<std::sync::MutexGuard<'_, Option<ServerDraft>>> {
        self.draft
            .lock()
            .map_err(|_| SyncError::Draft("draft slot poisoned".into()))
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn load(&self) -> SyncResult<Option<ServerDraft>> {
        Ok(self.slot()?.clone())
    }

    async fn save(&self, draft: &ServerDraft) -> SyncResult<()> {
        *self.slot()? = Some(draft.clone());
        Ok(())
    }

    async fn clear(&self) -> SyncResult<()> {
        *self.slot()? = None;
        Ok(())
    }
}
