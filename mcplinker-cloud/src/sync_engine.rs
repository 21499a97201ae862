//! Upload, download and status against a [`RemoteConfigClient`].

use crate::error::{CloudError, CloudResult};
use crate::remote::RemoteConfigClient;
use crate::types::{
    CloudStatus, DownloadReport, EncryptedRecord, FailureKind, ItemFailure, NewRecord, SyncReport,
};
use mcplinker_crypto::{EncryptionGateway, SecretKey};
use mcplinker_model::{NamedServer, ServerConfig, SyncMode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Moves server entries between this device and the encrypted cloud store.
///
/// Operations for the same client must not overlap; sequencing is the
/// caller's job.
pub struct CloudSyncEngine {
    remote: Arc<dyn RemoteConfigClient>,
    gateway: Arc<dyn EncryptionGateway>,
    batch_enabled: bool,
}

impl CloudSyncEngine {
    pub fn new(remote: Arc<dyn RemoteConfigClient>, gateway: Arc<dyn EncryptionGateway>) -> Self {
        Self {
            remote,
            gateway,
            batch_enabled: true,
        }
    }

    /// Skips the batch endpoint and always uploads item by item.
    pub fn with_batch(mut self, enabled: bool) -> Self {
        self.batch_enabled = enabled;
        self
    }

    // ── Upload ──

    /// Encrypts and uploads `entries` for `client_name`.
    ///
    /// Returns `Err` only when nothing could be attempted (no key, auth lost,
    /// listing for an override failed). Per-entry problems land in the report.
    pub async fn upload(
        &self,
        entries: &[NamedServer],
        client_name: &str,
        mode: SyncMode,
    ) -> CloudResult<SyncReport> {
        let key = self.gateway.ensure_key()?;
        let mut report = SyncReport::default();

        // Nothing remote is touched until every entry is sealed.
        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.seal(entry, client_name, &key) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(server = %entry.name, error = %e, "failed to encrypt entry");
                    report.record_failure(ItemFailure::new(&entry.name, FailureKind::Upload, e));
                }
            }
        }

        if mode.is_override() {
            let deleted = self.remote.delete_all_for_client(client_name).await?;
            if let Some(summary) = deleted.summary() {
                warn!(client = client_name, "override delete incomplete: {summary}");
            }
        }

        if self.batch_enabled && !records.is_empty() {
            match self
                .remote
                .batch_upsert(client_name, &records, mode.is_override())
                .await
            {
                Ok(()) => {
                    for record in records {
                        report.record_success(record.server_name);
                    }
                    self.log_upload(client_name, mode, &report);
                    return Ok(report);
                }
                Err(e) if e.is_auth() => return Err(e),
                Err(e) if e.is_batch_unavailable() => {
                    debug!(client = client_name, "batch endpoint unavailable, uploading per item");
                }
                Err(e) => {
                    warn!(
                        client = client_name,
                        error = %e,
                        "batch upload failed, uploading per item"
                    );
                }
            }
        }

        for record in &records {
            match self.upload_one(record, mode).await {
                Ok(()) => report.record_success(&record.server_name),
                Err(e) => {
                    warn!(server = %record.server_name, error = %e, "upload failed");
                    report.record_failure(ItemFailure::new(
                        &record.server_name,
                        FailureKind::Upload,
                        e,
                    ));
                }
            }
        }

        self.log_upload(client_name, mode, &report);
        Ok(report)
    }

    fn seal(
        &self,
        entry: &NamedServer,
        client_name: &str,
        key: &SecretKey,
    ) -> CloudResult<NewRecord> {
        let cipher_text = self.gateway.encrypt(&entry.config.to_payload(), key)?;
        Ok(NewRecord {
            server_name: entry.name.clone(),
            client_name: client_name.to_string(),
            cipher_text,
        })
    }

    /// Create, falling back to update on a merge conflict.
    async fn upload_one(&self, record: &NewRecord, mode: SyncMode) -> CloudResult<()> {
        match self.remote.create(record).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_conflict() && !mode.is_override() => {
                debug!(server = %record.server_name, "config exists, updating");
                let existing = self
                    .remote
                    .find_by_name(&record.server_name, &record.client_name)
                    .await?
                    .ok_or_else(|| CloudError::UploadFailed {
                        name: record.server_name.clone(),
                        reason: "store reported a conflict but has no such record".into(),
                    })?;
                self.remote.update(&existing.id, &record.cipher_text).await
            }
            Err(e) if e.is_conflict() => Err(CloudError::UploadFailed {
                name: record.server_name.clone(),
                reason: "record still exists after override".into(),
            }),
            Err(e) => Err(e),
        }
    }

    fn log_upload(&self, client_name: &str, mode: SyncMode, report: &SyncReport) {
        match report.summary() {
            None => info!(
                client = client_name,
                %mode,
                uploaded = report.succeeded.len(),
                "cloud upload complete"
            ),
            Some(summary) => warn!(client = client_name, %mode, "cloud upload partial: {summary}"),
        }
    }

    // ── Download ──

    /// Decrypted servers for `client_name`; corrupt records are skipped.
    pub async fn download(&self, client_name: &str) -> CloudResult<Vec<NamedServer>> {
        Ok(self.download_with_report(client_name).await?.servers)
    }

    pub async fn download_with_report(&self, client_name: &str) -> CloudResult<DownloadReport> {
        let key = self.gateway.ensure_key()?;
        let records = self.remote.list_by_client(client_name).await?;

        let mut report = DownloadReport::default();
        for record in records {
            match self.open(&record, &key) {
                Ok(config) => report
                    .servers
                    .push(NamedServer::new(record.server_name, config)),
                Err(e) => {
                    warn!(
                        server = %record.server_name,
                        id = %record.id,
                        error = %e,
                        "skipping cloud record"
                    );
                    report.skipped.push(ItemFailure::new(
                        record.server_name,
                        FailureKind::Download,
                        e,
                    ));
                }
            }
        }

        info!(
            client = client_name,
            restored = report.servers.len(),
            skipped = report.skipped.len(),
            "cloud download complete"
        );
        Ok(report)
    }

    fn open(&self, record: &EncryptedRecord, key: &SecretKey) -> CloudResult<ServerConfig> {
        let download_failed = |reason: String| CloudError::DownloadFailed {
            name: record.server_name.clone(),
            reason,
        };

        if record.cipher_text.trim().is_empty() {
            return Err(download_failed("record has no encrypted payload".into()));
        }
        let plain = self
            .gateway
            .decrypt(&record.cipher_text, key)
            .map_err(|e| download_failed(e.to_string()))?;
        let mut value: Value = serde_json::from_str(&plain)
            .map_err(|e| download_failed(format!("payload is not JSON: {e}")))?;
        // Older payloads carried the row's name and id alongside the entry.
        if let Some(obj) = value.as_object_mut() {
            obj.remove("name");
            obj.remove("id");
        }
        ServerConfig::parse(&value).map_err(|e| download_failed(e.to_string()))
    }

    // ── Status ──

    pub async fn status(&self, client_name: &str) -> CloudResult<CloudStatus> {
        let records = self.remote.list_by_client(client_name).await?;
        Ok(CloudStatus {
            total: records.len(),
            last_sync: records.iter().filter_map(|r| r.updated_at).max(),
        })
    }
}
