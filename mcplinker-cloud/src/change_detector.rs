//! Structural diff between a local server set and the cloud copy.

use crate::error::CloudResult;
use crate::sync_engine::CloudSyncEngine;
use mcplinker_model::NamedServer;
use serde::Serialize;
use std::collections::BTreeMap;

/// Names that differ between two sets, each list sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConfigDiff {
    pub local_only: Vec<String>,
    pub cloud_only: Vec<String>,
    /// Present on both sides but not equal after normalization.
    pub changed: Vec<String>,
}

impl ConfigDiff {
    pub fn is_empty(&self) -> bool {
        self.local_only.is_empty() && self.cloud_only.is_empty() && self.changed.is_empty()
    }
}

/// Compares both directions. With duplicate names the last entry wins.
pub fn diff(local: &[NamedServer], cloud: &[NamedServer]) -> ConfigDiff {
    let local_map: BTreeMap<&str, &NamedServer> =
        local.iter().map(|s| (s.name.as_str(), s)).collect();
    let cloud_map: BTreeMap<&str, &NamedServer> =
        cloud.iter().map(|s| (s.name.as_str(), s)).collect();

    let mut out = ConfigDiff::default();
    for (name, local_entry) in &local_map {
        match cloud_map.get(name) {
            None => out.local_only.push(name.to_string()),
            Some(cloud_entry) if !local_entry.config.equals(&cloud_entry.config) => {
                out.changed.push(name.to_string())
            }
            Some(_) => {}
        }
    }
    out.cloud_only = cloud_map
        .keys()
        .filter(|name| !local_map.contains_key(*name))
        .map(|name| name.to_string())
        .collect();
    out
}

/// True when the two sets differ in size or in any entry.
///
/// A size mismatch counts even when it only comes from duplicate names.
pub fn differs(local: &[NamedServer], cloud: &[NamedServer]) -> bool {
    local.len() != cloud.len() || !diff(local, cloud).is_empty()
}

impl CloudSyncEngine {
    /// Downloads the cloud set for `client_name` and diffs it against `local`.
    pub async fn pending_changes(
        &self,
        local: &[NamedServer],
        client_name: &str,
    ) -> CloudResult<ConfigDiff> {
        let cloud = self.download(client_name).await?;
        Ok(diff(local, &cloud))
    }

    /// Downloads the cloud set for `client_name` and checks it against `local`.
    pub async fn has_changes(&self, local: &[NamedServer], client_name: &str) -> CloudResult<bool> {
        let cloud = self.download(client_name).await?;
        Ok(differs(local, &cloud))
    }
}
