//! The contract between the sync engine and a cloud store.

use crate::error::{CloudError, CloudResult};
use crate::types::{EncryptedRecord, FailureKind, ItemFailure, NewRecord, SyncReport};
use async_trait::async_trait;
use tracing::{debug, warn};

/// CRUD + batch operations against records keyed by (server name, client name).
#[async_trait]
pub trait RemoteConfigClient: Send + Sync {
    /// Fails with `Conflict` when the (server name, client name) pair exists.
    async fn create(&self, record: &NewRecord) -> CloudResult<()>;

    async fn update(&self, id: &str, cipher_text: &str) -> CloudResult<()>;

    async fn list_by_client(&self, client_name: &str) -> CloudResult<Vec<EncryptedRecord>>;

    async fn delete_by_id(&self, id: &str) -> CloudResult<()>;

    /// Creates or updates every record in one round-trip.
    ///
    /// With `override_existing` false the server applies create-or-update per
    /// record. Stores without a batch endpoint return `BatchUnavailable`.
    async fn batch_upsert(
        &self,
        client_name: &str,
        records: &[NewRecord],
        override_existing: bool,
    ) -> CloudResult<()> {
        let _ = (client_name, records, override_existing);
        Err(CloudError::BatchUnavailable(
            "store has no batch endpoint".into(),
        ))
    }

    async fn find_by_name(
        &self,
        server_name: &str,
        client_name: &str,
    ) -> CloudResult<Option<EncryptedRecord>> {
        Ok(self
            .list_by_client(client_name)
            .await?
            .into_iter()
            .find(|r| r.server_name == server_name))
    }

    /// Deletes every record of a client, continuing past individual failures.
    ///
    /// Only a failure to list aborts; each failed delete is logged and
    /// reported.
    async fn delete_all_for_client(&self, client_name: &str) -> CloudResult<SyncReport> {
        let records = self.list_by_client(client_name).await?;
        let mut report = SyncReport::default();
        for record in records {
            match self.delete_by_id(&record.id).await {
                Ok(()) => {
                    debug!(
                        server = %record.server_name,
                        client = client_name,
                        "deleted cloud config"
                    );
                    report.record_success(record.server_name);
                }
                Err(e) => {
                    warn!(
                        server = %record.server_name,
                        client = client_name,
                        error = %e,
                        "failed to delete cloud config"
                    );
                    report.record_failure(ItemFailure::new(
                        record.server_name,
                        FailureKind::Delete,
                        e,
                    ));
                }
            }
        }
        Ok(report)
    }
}
