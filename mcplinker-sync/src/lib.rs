//! Local sync for MCP Linker.
//!
//! Copies one client's servers (active and disabled) into another client's
//! config file, by merge or by override. The config files themselves are
//! reached through [`ConfigFileIo`]; [`JsonConfigFiles`] handles the JSON
//! layouts of the supported clients.

pub mod client;
pub mod config_io;
pub mod draft;
mod error;
pub mod local_sync;

pub use client::{ClientKind, ClientTarget, DisabledLayout};
pub use config_io::{ConfigFileIo, JsonConfigFiles};
pub use draft::{DraftStore, FileDraftStore, MemoryDraftStore, ServerDraft};
pub use error::{SyncError, SyncResult};
pub use local_sync::{LocalSyncEngine, LocalSyncReport, apply};
