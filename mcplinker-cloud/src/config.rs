//! Cloud backup configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the cloud backup engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Base URL of the MCP Linker API, including the version prefix.
    pub api_base_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Try the single round-trip batch endpoint before per-item uploads.
    pub batch_sync_enabled: bool,

    /// Which stored key encrypts payloads: `"default"` or a team id.
    pub key_scope: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/v1".to_string(),
            request_timeout_secs: 30,
            batch_sync_enabled: true,
            key_scope: "default".to_string(),
        }
    }
}

impl CloudConfig {
    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}
