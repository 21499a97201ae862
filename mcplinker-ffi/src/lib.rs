//! C ABI exports for the MCP Linker desktop shell.
//!
//! The UI process links this library and drives local sync, cloud backup and
//! the edit draft through it. Requests and results cross the boundary as JSON
//! strings; every function reports failures through [`McpLinkerError`].
//! Strings handed out through out-pointers are freed with
//! [`mcplinker_free_string`].

mod cloud;
mod draft;
mod local;

pub use cloud::*;
pub use draft::*;
pub use local::*;

use mcplinker_cloud::{CloudApiClient, CloudError};
use mcplinker_crypto::{CryptoError, FileKeyStore, KeyStore, MemoryKeyStore};
use mcplinker_model::ModelError;
use mcplinker_sync::{
    DraftStore, FileDraftStore, JsonConfigFiles, LocalSyncEngine, MemoryDraftStore, SyncError,
};
use std::ffi::{CStr, CString, c_char};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;
use tracing::{error, info};

/// Error codes returned by FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpLinkerError {
    /// Operation succeeded.
    Ok = 0,
    /// Null pointer argument.
    NullPointer = 1,
    /// Invalid UTF-8 string.
    InvalidUtf8 = 2,
    /// JSON serialization error.
    JsonError = 3,
    /// File system error.
    IoError = 4,
    /// Server entry or record not found.
    NotFound = 5,
    /// Handle (or the cloud client) not initialized.
    NotInitialized = 6,
    /// A server entry has an invalid shape.
    InvalidConfigShape = 7,
    /// Local sync source and destination are the same client.
    SameClientSync = 8,
    /// The client needs a user-configured config path.
    PathRequired = 9,
    /// A client config file could not be parsed.
    ConfigFileError = 10,
    /// Not signed in, or the session could not be refreshed.
    AuthError = 11,
    /// Cloud API or transport error.
    CloudError = 12,
    /// The entry already exists in the cloud.
    Conflict = 13,
    /// No encryption key for the configured scope.
    KeyUnavailable = 14,
    /// Encryption or decryption failed.
    CryptoError = 15,
    /// Invalid argument.
    InvalidArgument = 16,
    /// Unknown error.
    Unknown = 99,
}

const DRAFT_FILE: &str = "server_draft.json";

/// State shared by every export.
pub(crate) struct McpLinkerHandle {
    pub(crate) runtime: Runtime,
    pub(crate) key_store: Arc<dyn KeyStore>,
    pub(crate) local: LocalSyncEngine,
    pub(crate) drafts: Arc<dyn DraftStore>,
    /// Set by `mcplinker_cloud_configure`.
    pub(crate) cloud_api: Option<CloudApiClient>,
}

static HANDLE: Mutex<Option<McpLinkerHandle>> = Mutex::new(None);

/// Locks the global handle, recovering from a poisoned mutex.
pub(crate) fn lock_handle() -> std::sync::MutexGuard<'static, Option<McpLinkerHandle>> {
    HANDLE.lock().unwrap_or_else(|poisoned| {
        eprintln!("[FFI] recovering from poisoned HANDLE mutex");
        poisoned.into_inner()
    })
}

// ============================================================================
// Core Functions
// ============================================================================

/// Initializes the runtime.
///
/// `data_dir` holds the encryption keys and the edit draft. `":memory:"`
/// keeps both in process.
///
/// # Safety
/// - `data_dir` must be a valid null-terminated UTF-8 string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_init(data_dir: *const c_char) -> McpLinkerError {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let data_dir = match unsafe { parse_cstr(data_dir) } {
        Ok(s) => s,
        Err(e) => return e,
    };
    init_core(data_dir)
}

pub(crate) fn init_core(data_dir: &str) -> McpLinkerError {
    let runtime = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start async runtime");
            return McpLinkerError::IoError;
        }
    };

    let config_files = match JsonConfigFiles::new() {
        Ok(files) => Arc::new(files),
        Err(e) => return sync_err(&e),
    };

    let (key_store, drafts): (Arc<dyn KeyStore>, Arc<dyn DraftStore>) = if data_dir == ":memory:" {
        (Arc::new(MemoryKeyStore::new()), Arc::new(MemoryDraftStore::new()))
    } else {
        let dir = Path::new(data_dir);
        (
            Arc::new(FileKeyStore::new(dir)),
            Arc::new(FileDraftStore::new(dir.join(DRAFT_FILE))),
        )
    };

    *lock_handle() = Some(McpLinkerHandle {
        runtime,
        key_store,
        local: LocalSyncEngine::new(config_files),
        drafts,
        cloud_api: None,
    });
    info!(data_dir, "mcp linker core initialized");
    McpLinkerError::Ok
}

/// Shuts down the runtime and drops all state.
#[unsafe(no_mangle)]
pub extern "C" fn mcplinker_shutdown() {
    *lock_handle() = None;
}

/// Returns the library version as a string.
///
/// # Safety
/// - The returned string is statically allocated and must not be freed.
#[unsafe(no_mangle)]
pub extern "C" fn mcplinker_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

/// Frees a string allocated by this library.
///
/// # Safety
/// - `s` must be a string allocated by this library, or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Parses a C string pointer to &str.
pub(crate) unsafe fn parse_cstr<'a>(ptr: *const c_char) -> Result<&'a str, McpLinkerError> {
    if ptr.is_null() {
        return Err(McpLinkerError::NullPointer);
    }
    unsafe { CStr::from_ptr(ptr).to_str().map_err(|_| McpLinkerError::InvalidUtf8) }
}

/// Writes a JSON-serializable value to an out pointer.
pub(crate) fn write_json_out(
    out: *mut *mut c_char,
    value: &impl serde::Serialize,
) -> McpLinkerError {
    if out.is_null() {
        return McpLinkerError::NullPointer;
    }
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(_) => return McpLinkerError::JsonError,
    };
    match CString::new(json) {
        Ok(c_json) => {
            unsafe { *out = c_json.into_raw() };
            McpLinkerError::Ok
        }
        Err(_) => McpLinkerError::JsonError,
    }
}

pub(crate) fn model_err(e: &ModelError) -> McpLinkerError {
    match e {
        ModelError::InvalidConfigShape(_) => McpLinkerError::InvalidConfigShape,
        ModelError::ServerNotFound(_) => McpLinkerError::NotFound,
        ModelError::AlreadyActive(_) => McpLinkerError::InvalidArgument,
    }
}

pub(crate) fn crypto_err(e: &CryptoError) -> McpLinkerError {
    match e {
        CryptoError::KeyUnavailable(_) => McpLinkerError::KeyUnavailable,
        CryptoError::InvalidKeyLength { .. } | CryptoError::InvalidEncoding(_) => {
            McpLinkerError::InvalidArgument
        }
        _ => McpLinkerError::CryptoError,
    }
}

pub(crate) fn sync_err(e: &SyncError) -> McpLinkerError {
    error!("[sync_err] {e}");
    match e {
        SyncError::SameClientSync(_) => McpLinkerError::SameClientSync,
        SyncError::PathRequired(_) => McpLinkerError::PathRequired,
        SyncError::ConfigFile { .. } => McpLinkerError::ConfigFileError,
        SyncError::Serialization(_) => McpLinkerError::JsonError,
        SyncError::Model(m) => model_err(m),
        SyncError::NoHomeDir | SyncError::Draft(_) | SyncError::Io(_) => McpLinkerError::IoError,
    }
}

pub(crate) fn cloud_err(e: &CloudError) -> McpLinkerError {
    error!("[cloud_err] {e}");
    match e {
        CloudError::AuthRequired | CloudError::AuthFailed(_) => McpLinkerError::AuthError,
        CloudError::Conflict(_) => McpLinkerError::Conflict,
        CloudError::NotFound(_) => McpLinkerError::NotFound,
        CloudError::Crypto(c) => crypto_err(c),
        CloudError::Model(m) => model_err(m),
        CloudError::Serialization(_) => McpLinkerError::JsonError,
        CloudError::Config(_) => McpLinkerError::InvalidArgument,
        _ => McpLinkerError::CloudError,
    }
}
