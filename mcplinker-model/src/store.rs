//! Two-partition store of one client's servers.

use crate::error::{ModelError, ModelResult};
use crate::server::{NamedServer, ServerConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which half of a [`ClientConfigStore`] an entry lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Active,
    Disabled,
}

/// One client's servers keyed by name.
///
/// The partitions are kept disjoint by the mutating operations. Files written
/// by other tools can still carry a name in both; reads then resolve to the
/// active copy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigStore {
    pub active: BTreeMap<String, ServerConfig>,
    pub disabled: BTreeMap<String, ServerConfig>,
}

impl ClientConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_active(servers: impl IntoIterator<Item = NamedServer>) -> Self {
        let mut store = Self::new();
        for server in servers {
            store.upsert_active(server.name, server.config);
        }
        store
    }

    /// Inserts or replaces an active entry, dropping any disabled copy.
    pub fn upsert_active(&mut self, name: impl Into<String>, config: ServerConfig) {
        let name = name.into();
        self.disabled.remove(&name);
        self.active.insert(name, config);
    }

    /// Inserts or replaces a disabled entry, dropping any active copy.
    pub fn upsert_disabled(&mut self, name: impl Into<String>, config: ServerConfig) {
        let name = name.into();
        self.active.remove(&name);
        self.disabled.insert(name, config);
    }

    pub fn upsert(&mut self, partition: Partition, name: impl Into<String>, config: ServerConfig) {
        match partition {
            Partition::Active => self.upsert_active(name, config),
            Partition::Disabled => self.upsert_disabled(name, config),
        }
    }

    /// Moves an active entry into the disabled partition, payload untouched.
    pub fn disable(&mut self, name: &str) -> ModelResult<()> {
        let config = self
            .active
            .remove(name)
            .ok_or_else(|| ModelError::ServerNotFound(name.to_string()))?;
        self.disabled.insert(name.to_string(), config);
        Ok(())
    }

    /// Moves a disabled entry back into the active partition.
    pub fn enable(&mut self, name: &str) -> ModelResult<()> {
        if self.active.contains_key(name) {
            return Err(ModelError::AlreadyActive(name.to_string()));
        }
        let config = self
            .disabled
            .remove(name)
            .ok_or_else(|| ModelError::ServerNotFound(name.to_string()))?;
        self.active.insert(name.to_string(), config);
        Ok(())
    }

    /// Removes a name from both partitions.
    pub fn remove(&mut self, name: &str) -> ModelResult<ServerConfig> {
        let active = self.active.remove(name);
        let disabled = self.disabled.remove(name);
        active
            .or(disabled)
            .ok_or_else(|| ModelError::ServerNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<(Partition, &ServerConfig)> {
        if let Some(config) = self.active.get(name) {
            return Some((Partition::Active, config));
        }
        self.disabled.get(name).map(|c| (Partition::Disabled, c))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.active.contains_key(name) || self.disabled.contains_key(name)
    }

    /// Every entry once, active first, each partition in name order.
    pub fn iter(&self) -> impl Iterator<Item = (Partition, &str, &ServerConfig)> {
        let active = self
            .active
            .iter()
            .map(|(n, c)| (Partition::Active, n.as_str(), c));
        let disabled = self
            .disabled
            .iter()
            .filter(|(n, _)| !self.active.contains_key(n.as_str()))
            .map(|(n, c)| (Partition::Disabled, n.as_str(), c));
        active.chain(disabled)
    }

    pub fn active_servers(&self) -> Vec<NamedServer> {
        self.active
            .iter()
            .map(|(n, c)| NamedServer::new(n.clone(), c.clone()))
            .collect()
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.active.len()
            + self
                .disabled
                .keys()
                .filter(|n| !self.active.contains_key(n.as_str()))
                .count()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.disabled.is_empty()
    }

    /// Drops disabled copies of names that are also active.
    pub fn dedupe(&mut self) -> usize {
        let before = self.disabled.len();
        let active = &self.active;
        self.disabled.retain(|name, _| !active.contains_key(name));
        before - self.disabled.len()
    }

    pub fn clear(&mut self) {
        self.active.clear();
        self.disabled.clear();
    }
}
