//! Shared test helpers: an in-memory config store and fixtures.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use mcplinker_cloud::{CloudError, CloudResult, EncryptedRecord, NewRecord, RemoteConfigClient};
use mcplinker_crypto::{DEFAULT_SCOPE, LocalKeyGateway, MemoryKeyStore};
use mcplinker_model::{NamedServer, ServerConfig, StdioConfig};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Store that behaves like the API: unique (server, client), 409 on create.
#[derive(Default)]
pub struct InMemoryRemote {
    records: Mutex<Vec<EncryptedRecord>>,
    batch_supported: bool,
    failing_deletes: Mutex<HashSet<String>>,
    clock: AtomicUsize,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    pub batches: AtomicUsize,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch() -> Self {
        Self {
            batch_supported: true,
            ..Self::default()
        }
    }

    /// Deletes of this server name will fail.
    pub fn fail_delete_of(&self, server_name: &str) {
        self.failing_deletes
            .lock()
            .unwrap()
            .insert(server_name.to_string());
    }

    /// Inserts a record verbatim, bypassing conflict checks.
    pub fn insert_raw(&self, server_name: &str, client_name: &str, cipher_text: &str) {
        let record = self.stamp(server_name, client_name, cipher_text);
        self.records.lock().unwrap().push(record);
    }

    pub fn records(&self, client_name: &str) -> Vec<EncryptedRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.client_name == client_name)
            .cloned()
            .collect()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn stamp(&self, server_name: &str, client_name: &str, cipher_text: &str) -> EncryptedRecord {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst) as i64;
        let at = base_time() + Duration::minutes(tick);
        EncryptedRecord {
            id: Uuid::new_v4().to_string(),
            server_name: server_name.to_string(),
            client_name: client_name.to_string(),
            cipher_text: cipher_text.to_string(),
            created_at: Some(at),
            updated_at: Some(at),
        }
    }

    fn upsert(&self, record: &NewRecord) {
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records
            .iter_mut()
            .find(|r| r.server_name == record.server_name && r.client_name == record.client_name)
        {
            existing.cipher_text = record.cipher_text.clone();
            existing.updated_at = Some(Utc::now());
            return;
        }
        drop(records);
        let stamped = self.stamp(&record.server_name, &record.client_name, &record.cipher_text);
        self.records.lock().unwrap().push(stamped);
    }
}

#[async_trait]
impl RemoteConfigClient for InMemoryRemote {
    async fn create(&self, record: &NewRecord) -> CloudResult<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let exists = self.records.lock().unwrap().iter().any(|r| {
            r.server_name == record.server_name && r.client_name == record.client_name
        });
        if exists {
            return Err(CloudError::Conflict(record.server_name.clone()));
        }
        let stamped = self.stamp(&record.server_name, &record.client_name, &record.cipher_text);
        self.records.lock().unwrap().push(stamped);
        Ok(())
    }

    async fn update(&self, id: &str, cipher_text: &str) -> CloudResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CloudError::NotFound(format!("config {id}")))?;
        record.cipher_text = cipher_text.to_string();
        record.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn list_by_client(&self, client_name: &str) -> CloudResult<Vec<EncryptedRecord>> {
        Ok(self.records(client_name))
    }

    async fn delete_by_id(&self, id: &str) -> CloudResult<()> {
        let mut records = self.records.lock().unwrap();
        let pos = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| CloudError::NotFound(format!("config {id}")))?;
        if self
            .failing_deletes
            .lock()
            .unwrap()
            .contains(&records[pos].server_name)
        {
            return Err(CloudError::Api("500 Internal Server Error".into()));
        }
        records.remove(pos);
        Ok(())
    }

    async fn batch_upsert(
        &self,
        _client_name: &str,
        records: &[NewRecord],
        _override_existing: bool,
    ) -> CloudResult<()> {
        if !self.batch_supported {
            return Err(CloudError::BatchUnavailable("404 Not Found".into()));
        }
        self.batches.fetch_add(1, Ordering::SeqCst);
        for record in records {
            self.upsert(record);
        }
        Ok(())
    }
}

pub fn base_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

pub fn gateway() -> Arc<LocalKeyGateway> {
    Arc::new(LocalKeyGateway::new(
        Arc::new(MemoryKeyStore::new()),
        DEFAULT_SCOPE,
    ))
}

pub fn stdio(name: &str, command: &str, args: &[&str]) -> NamedServer {
    NamedServer::new(
        name,
        ServerConfig::Stdio(StdioConfig::new(command, args.iter().copied())),
    )
}

/// The filesystem server used throughout the docs: `npx -y server-fs`.
pub fn fs_server() -> NamedServer {
    stdio("fs", "npx", &["-y", "server-fs"])
}
