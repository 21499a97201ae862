//! Data model for MCP Linker.
//!
//! - [`ServerConfig`]: a single MCP server entry, either a local process
//!   (stdio) or a network endpoint (http / sse), validated once at parse time
//! - [`ClientConfigStore`]: one client's entries split into an active and a
//!   disabled partition
//! - [`SyncMode`]: merge vs. override semantics shared by local and cloud sync

mod error;
mod mode;
mod server;
mod store;

pub use error::{ModelError, ModelResult};
pub use mode::SyncMode;
pub use server::{NamedServer, NetworkConfig, NetworkKind, ServerConfig, StdioConfig};
pub use store::{ClientConfigStore, Partition};
