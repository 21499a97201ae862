//! Merge / override of one client's servers into another's.

use crate::client::ClientTarget;
use crate::config_io::ConfigFileIo;
use crate::error::{SyncError, SyncResult};
use mcplinker_model::{ClientConfigStore, NamedServer, SyncMode};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// What a sync did to the destination, by server name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LocalSyncReport {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
}

impl LocalSyncReport {
    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty())
    }
}

/// Applies `source` to `dest` in memory.
///
/// Merge upserts every source entry into the matching partition and leaves
/// other destination entries alone. Override makes `dest` equal to `source`.
/// Moving an entry between partitions counts as an update.
pub fn apply(
    dest: &mut ClientConfigStore,
    source: &ClientConfigStore,
    mode: SyncMode,
) -> LocalSyncReport {
    let mut report = LocalSyncReport::default();

    if mode.is_override() {
        let removed: Vec<String> = dest
            .iter()
            .filter(|(_, name, _)| !source.contains(name))
            .map(|(_, name, _)| name.to_string())
            .collect();
        report.removed = removed;
    }

    for (partition, name, config) in source.iter() {
        match dest.get(name) {
            None => report.added.push(name.to_string()),
            Some((p, existing)) if p == partition && existing.equals(config) => {
                report.unchanged.push(name.to_string())
            }
            Some(_) => report.updated.push(name.to_string()),
        }
    }

    if mode.is_override() {
        dest.clear();
    }
    for (partition, name, config) in source.iter() {
        dest.upsert(partition, name, config.clone());
    }

    report
}

/// Syncs between client config files.
pub struct LocalSyncEngine {
    io: Arc<dyn ConfigFileIo>,
}

impl LocalSyncEngine {
    pub fn new(io: Arc<dyn ConfigFileIo>) -> Self {
        Self { io }
    }

    /// Writes `source`'s servers into `dest`.
    ///
    /// Both targets are validated before anything is read. The destination
    /// file is only written when something changed.
    pub async fn sync(
        &self,
        source: &ClientTarget,
        dest: &ClientTarget,
        mode: SyncMode,
    ) -> SyncResult<LocalSyncReport> {
        if source.client == dest.client {
            return Err(SyncError::SameClientSync(source.client.clone()));
        }
        source.validate()?;
        dest.validate()?;

        let source_store = self.io.read_config(source).await?;
        let mut dest_store = self.io.read_config(dest).await?;

        let report = apply(&mut dest_store, &source_store, mode);
        if report.has_changes() {
            self.io.write_config(dest, &dest_store).await?;
        }

        info!(
            from = %source.client,
            to = %dest.client,
            %mode,
            added = report.added.len(),
            updated = report.updated.len(),
            removed = report.removed.len(),
            unchanged = report.unchanged.len(),
            "local sync complete"
        );
        Ok(report)
    }

    pub async fn enable(&self, target: &ClientTarget, name: &str) -> SyncResult<()> {
        target.validate()?;
        self.io.enable(target, name).await
    }

    pub async fn disable(&self, target: &ClientTarget, name: &str) -> SyncResult<()> {
        target.validate()?;
        self.io.disable(target, name).await
    }

    pub async fn delete_entry(&self, target: &ClientTarget, name: &str) -> SyncResult<()> {
        target.validate()?;
        self.io.delete_entry(target, name).await
    }

    /// Adds or replaces one entry; see [`ConfigFileIo::upsert_entry`].
    pub async fn upsert_entry(
        &self,
        target: &ClientTarget,
        name: &str,
        raw: &Value,
    ) -> SyncResult<()> {
        target.validate()?;
        self.io.upsert_entry(target, name, raw).await
    }

    /// Removes the listed entries and returns the names that existed.
    pub async fn delete_entries(
        &self,
        target: &ClientTarget,
        names: &[String],
    ) -> SyncResult<Vec<String>> {
        target.validate()?;
        let removed = self.io.delete_entries(target, names).await?;
        info!(
            client = %target.client,
            requested = names.len(),
            removed = removed.len(),
            "deleted servers"
        );
        Ok(removed)
    }

    /// Writes a server list (e.g. a cloud download) into a client's file.
    ///
    /// The servers land in the active partition. Same write rules as
    /// [`sync`](Self::sync).
    pub async fn restore(
        &self,
        target: &ClientTarget,
        servers: Vec<NamedServer>,
        mode: SyncMode,
    ) -> SyncResult<LocalSyncReport> {
        target.validate()?;
        let source = ClientConfigStore::from_active(servers);
        let mut dest = self.io.read_config(target).await?;

        let report = apply(&mut dest, &source, mode);
        if report.has_changes() {
            self.io.write_config(target, &dest).await?;
        }

        info!(
            to = %target.client,
            %mode,
            added = report.added.len(),
            updated = report.updated.len(),
            removed = report.removed.len(),
            "restore complete"
        );
        Ok(report)
    }

    /// Reads a client's servers, or an empty store when the file is missing.
    pub async fn read(&self, target: &ClientTarget) -> SyncResult<ClientConfigStore> {
        target.validate()?;
        self.io.read_config(target).await
    }
}

