//! Cloud backup for MCP Linker.
//!
//! Server entries are encrypted on the device and stored remotely as opaque
//! strings keyed by (server name, client name):
//! - [`RemoteConfigClient`]: the CRUD + batch contract against the store,
//!   with [`CloudApiClient`] as the HTTP implementation
//! - [`CloudSyncEngine`]: upload with per-item conflict handling, download
//!   that skips corrupt records, and status
//! - [`change_detector`]: structural diff between a local and a cloud set

pub mod api_client;
pub mod change_detector;
pub mod config;
pub mod error;
pub mod remote;
pub mod sync_engine;
pub mod types;

pub use api_client::CloudApiClient;
pub use change_detector::{ConfigDiff, diff, differs};
pub use config::CloudConfig;
pub use error::{CloudError, CloudResult};
pub use remote::RemoteConfigClient;
pub use sync_engine::CloudSyncEngine;
pub use types::*;
