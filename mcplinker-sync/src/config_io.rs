//! Reading and writing client config files.

use crate::client::{ClientKind, ClientTarget, DISABLED_SECTION, DisabledLayout};
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use mcplinker_model::{ClientConfigStore, ModelError, Partition, ServerConfig};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Whole-file access to one client's servers.
///
/// Every call reads or writes the full file; the partition operations are
/// read-modify-write on top of [`read_config`](Self::read_config) and
/// [`write_config`](Self::write_config).
#[async_trait]
pub trait ConfigFileIo: Send + Sync {
    async fn read_config(&self, target: &ClientTarget) -> SyncResult<ClientConfigStore>;

    async fn write_config(
        &self,
        target: &ClientTarget,
        store: &ClientConfigStore,
    ) -> SyncResult<()>;

    async fn enable(&self, target: &ClientTarget, name: &str) -> SyncResult<()> {
        let mut store = self.read_config(target).await?;
        store.enable(name)?;
        self.write_config(target, &store).await
    }

    async fn disable(&self, target: &ClientTarget, name: &str) -> SyncResult<()> {
        let mut store = self.read_config(target).await?;
        store.disable(name)?;
        self.write_config(target, &store).await
    }

    async fn delete_entry(&self, target: &ClientTarget, name: &str) -> SyncResult<()> {
        let mut store = self.read_config(target).await?;
        store.remove(name)?;
        self.write_config(target, &store).await
    }

    /// Adds or replaces one entry from its raw JSON.
    ///
    /// The entry is validated before the file is read. An existing entry
    /// keeps its partition; a new one is added as active.
    async fn upsert_entry(
        &self,
        target: &ClientTarget,
        name: &str,
        raw: &Value,
    ) -> SyncResult<()> {
        let config = ServerConfig::parse(raw)?;
        let mut store = self.read_config(target).await?;
        let partition = store.get(name).map_or(Partition::Active, |(p, _)| p);
        store.upsert(partition, name, config);
        self.write_config(target, &store).await
    }

    /// Removes every listed entry that exists and returns the removed names.
    ///
    /// Unknown names are ignored. The file is left alone when nothing matched.
    async fn delete_entries(
        &self,
        target: &ClientTarget,
        names: &[String],
    ) -> SyncResult<Vec<String>> {
        let mut store = self.read_config(target).await?;
        let removed: Vec<String> = names
            .iter()
            .filter(|name| store.remove(name).is_ok())
            .cloned()
            .collect();
        if !removed.is_empty() {
            self.write_config(target, &store).await?;
        }
        Ok(removed)
    }
}

/// JSON config files under a home directory.
#[derive(Clone, Debug)]
pub struct JsonConfigFiles {
    home: PathBuf,
}

impl JsonConfigFiles {
    /// Uses the current user's home directory.
    pub fn new() -> SyncResult<Self> {
        let home = dirs::home_dir().ok_or(SyncError::NoHomeDir)?;
        Ok(Self { home })
    }

    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn path_for(&self, target: &ClientTarget) -> SyncResult<PathBuf> {
        target.config_path(&self.home)
    }

    async fn read_root(path: &Path) -> SyncResult<Option<Map<String, Value>>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SyncError::config_file(path, format!("failed to read: {e}"))),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Some(Map::new()));
        }
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(root)) => Ok(Some(root)),
            Ok(_) => Err(SyncError::config_file(path, "top level is not a JSON object")),
            Err(e) => Err(SyncError::config_file(path, format!("invalid JSON: {e}"))),
        }
    }
}

#[async_trait]
impl ConfigFileIo for JsonConfigFiles {
    async fn read_config(&self, target: &ClientTarget) -> SyncResult<ClientConfigStore> {
        let path = self.path_for(target)?;
        let Some(root) = Self::read_root(&path).await? else {
            debug!(
                client = %target.client,
                path = %path.display(),
                "config file missing, treating as empty"
            );
            return Ok(ClientConfigStore::new());
        };
        store_from_root(&root, &target.kind(), &path)
    }

    async fn write_config(
        &self,
        target: &ClientTarget,
        store: &ClientConfigStore,
    ) -> SyncResult<()> {
        let path = self.path_for(target)?;
        let root = Self::read_root(&path).await?.unwrap_or_default();
        let root = patch_root(root, store, &target.kind());

        let mut bytes = serde_json::to_vec_pretty(&Value::Object(root))?;
        bytes.push(b'\n');
        write_file_atomic(&path, &bytes).await?;

        debug!(
            client = %target.client,
            path = %path.display(),
            active = store.active.len(),
            disabled = store.disabled.len(),
            "wrote config file"
        );
        Ok(())
    }
}

fn entry_error(path: &Path, name: &str, err: ModelError) -> SyncError {
    let reason = match err {
        ModelError::InvalidConfigShape(reason) => reason,
        other => other.to_string(),
    };
    SyncError::Model(ModelError::InvalidConfigShape(format!(
        "server '{name}' in {}: {reason}",
        path.display()
    )))
}

fn servers_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
    path: &Path,
) -> SyncResult<Option<&'a Map<String, Value>>> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(obj)) => Ok(Some(obj)),
        Some(_) => Err(SyncError::config_file(path, format!("`{key}` is not an object"))),
    }
}

/// Splits a file's servers into the two partitions.
fn store_from_root(
    root: &Map<String, Value>,
    kind: &ClientKind,
    path: &Path,
) -> SyncResult<ClientConfigStore> {
    let layout = kind.disabled_layout();
    let mut store = ClientConfigStore::new();

    if let Some(servers) = servers_object(root, kind.servers_key(), path)? {
        for (name, raw) in servers {
            let mut raw = raw.clone();
            let disabled = take_disabled_marker(&mut raw, layout);
            let config = ServerConfig::parse(&raw).map_err(|e| entry_error(path, name, e))?;
            if disabled {
                store.disabled.insert(name.clone(), config);
            } else {
                store.active.insert(name.clone(), config);
            }
        }
    }

    if layout == DisabledLayout::Section {
        if let Some(section) = servers_object(root, DISABLED_SECTION, path)? {
            for (name, raw) in section {
                let config = ServerConfig::parse(raw).map_err(|e| entry_error(path, name, e))?;
                store.disabled.insert(name.clone(), config);
            }
        }
    }

    Ok(store)
}

/// Removes the per-entry disabled marker, returning whether it said disabled.
fn take_disabled_marker(raw: &mut Value, layout: DisabledLayout) -> bool {
    let Some(obj) = raw.as_object_mut() else {
        return false;
    };
    match layout {
        DisabledLayout::Section => false,
        DisabledLayout::Flag => {
            if obj.get("disabled") == Some(&Value::Bool(true)) {
                obj.remove("disabled");
                true
            } else {
                false
            }
        }
        DisabledLayout::IsActive => match obj.remove("isActive") {
            Some(Value::Bool(active)) => !active,
            _ => false,
        },
    }
}

/// Replaces the servers in `root`, keeping every other key.
///
/// Entries whose config and partition did not change keep their JSON as
/// found in the file.
fn patch_root(
    mut root: Map<String, Value>,
    store: &ClientConfigStore,
    kind: &ClientKind,
) -> Map<String, Value> {
    let layout = kind.disabled_layout();
    let existing = existing_entries(&root, kind);
    let mut servers = Map::new();
    let mut section = Map::new();

    let value_for = |partition: Partition, name: &str, config: &ServerConfig| {
        match existing.get(name) {
            Some((p, raw, found)) if *p == partition && found.equals(config) => raw.clone(),
            _ => entry_value(config, partition, layout),
        }
    };

    for (name, config) in &store.active {
        servers.insert(name.clone(), value_for(Partition::Active, name, config));
    }

    for (name, config) in &store.disabled {
        if store.active.contains_key(name) {
            continue;
        }
        let value = value_for(Partition::Disabled, name, config);
        if layout == DisabledLayout::Section {
            section.insert(name.clone(), value);
        } else {
            servers.insert(name.clone(), value);
        }
    }

    root.insert(kind.servers_key().to_string(), Value::Object(servers));
    if layout == DisabledLayout::Section {
        if section.is_empty() {
            root.remove(DISABLED_SECTION);
        } else {
            root.insert(DISABLED_SECTION.to_string(), Value::Object(section));
        }
    }
    root
}

/// The readable entries already in `root`, with their raw JSON.
///
/// An active copy shadows a disabled one of the same name.
fn existing_entries(
    root: &Map<String, Value>,
    kind: &ClientKind,
) -> BTreeMap<String, (Partition, Value, ServerConfig)> {
    let layout = kind.disabled_layout();
    let mut entries = BTreeMap::new();

    if layout == DisabledLayout::Section {
        if let Some(Value::Object(section)) = root.get(DISABLED_SECTION) {
            for (name, raw) in section {
                if let Ok(config) = ServerConfig::parse(raw) {
                    entries.insert(name.clone(), (Partition::Disabled, raw.clone(), config));
                }
            }
        }
    }

    if let Some(Value::Object(servers)) = root.get(kind.servers_key()) {
        for (name, raw) in servers {
            let mut stripped = raw.clone();
            let partition = if take_disabled_marker(&mut stripped, layout) {
                Partition::Disabled
            } else {
                Partition::Active
            };
            if let Ok(config) = ServerConfig::parse(&stripped) {
                entries.insert(name.clone(), (partition, raw.clone(), config));
            }
        }
    }
    entries
}

/// Serializes an entry with the layout's partition marker.
fn entry_value(config: &ServerConfig, partition: Partition, layout: DisabledLayout) -> Value {
    let mut value = config.to_value();
    match (layout, partition) {
        (DisabledLayout::Section, _) => {}
        (DisabledLayout::Flag, Partition::Active) => {
            // the flag is this layout's partition marker
            if let Some(obj) = value.as_object_mut() {
                if obj.get("disabled") == Some(&Value::Bool(true)) {
                    obj.remove("disabled");
                }
            }
        }
        (DisabledLayout::Flag, Partition::Disabled) => {
            set_key(&mut value, "disabled", Value::Bool(true))
        }
        (DisabledLayout::IsActive, Partition::Active) => {
            set_key(&mut value, "isActive", Value::Bool(true))
        }
        (DisabledLayout::IsActive, Partition::Disabled) => {
            set_key(&mut value, "isActive", Value::Bool(false))
        }
    }
    value
}

fn set_key(value: &mut Value, key: &str, v: Value) {
    if let Some(obj) = value.as_object_mut() {
        obj.insert(key.to_string(), v);
    }
}

/// Writes through a sibling temp file and a rename.
async fn write_file_atomic(path: &Path, bytes: &[u8]) -> SyncResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            SyncError::config_file(path, format!("failed to create {}: {e}", parent.display()))
        })?;
    }

    let file_name = path
        .file_name()
        .and_then(|v| v.to_str())
        .unwrap_or("config.json");
    let tmp_path = path.with_file_name(format!("{file_name}.mcplinker-tmp"));

    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|e| SyncError::config_file(path, format!("failed to write temp file: {e}")))?;

    // Windows rename requires the target not to exist.
    if cfg!(windows) && tokio::fs::try_exists(path).await.unwrap_or(false) {
        let _ = tokio::fs::remove_file(path).await;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| SyncError::config_file(path, format!("failed to finalize: {e}")))
}
