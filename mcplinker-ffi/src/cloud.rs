//! Cloud backup exports: configure, sign-in state, upload, download, restore, status.

use crate::{
    McpLinkerError, McpLinkerHandle, cloud_err, crypto_err, lock_handle, model_err, parse_cstr,
    sync_err, write_json_out,
};
use mcplinker_cloud::{
    AuthTokens, CloudApiClient, CloudConfig, CloudSyncEngine, ConfigDiff, ItemFailure, diff,
    differs,
};
use mcplinker_crypto::{DEFAULT_SCOPE, LocalKeyGateway};
use mcplinker_model::{NamedServer, SyncMode};
use mcplinker_sync::{ClientTarget, LocalSyncReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ffi::c_char;
use std::sync::Arc;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest {
    client_name: String,
    /// UI rows (`name` plus entry keys). When absent, `source` is read.
    #[serde(default)]
    entries: Option<Vec<Value>>,
    #[serde(default)]
    source: Option<ClientTarget>,
    #[serde(default)]
    mode: SyncMode,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingChangesRequest {
    client_name: String,
    #[serde(default)]
    local: Option<Vec<Value>>,
    #[serde(default)]
    source: Option<ClientTarget>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PendingChanges {
    has_changes: bool,
    diff: ConfigDiff,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestoreRequest {
    client_name: String,
    dest: ClientTarget,
    #[serde(default)]
    mode: SyncMode,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RestoreReport {
    local: LocalSyncReport,
    skipped: Vec<ItemFailure>,
}

/// Builds an engine over the configured client and the key for its scope.
///
/// Only the personal scope creates a key on first use.
fn cloud_engine(handle: &McpLinkerHandle) -> Result<CloudSyncEngine, McpLinkerError> {
    let api = handle
        .cloud_api
        .as_ref()
        .ok_or(McpLinkerError::NotInitialized)?;
    let config = api.config();

    let mut gateway = LocalKeyGateway::new(handle.key_store.clone(), config.key_scope.clone());
    if config.key_scope != DEFAULT_SCOPE {
        gateway = gateway.without_key_creation();
    }
    Ok(CloudSyncEngine::new(Arc::new(api.clone()), Arc::new(gateway))
        .with_batch(config.batch_sync_enabled))
}

/// Resolves the local set a request refers to: explicit rows win over a
/// client target, whose active servers are read from disk.
fn local_entries(
    handle: &McpLinkerHandle,
    rows: Option<Vec<Value>>,
    source: Option<ClientTarget>,
) -> Result<Vec<NamedServer>, McpLinkerError> {
    if let Some(rows) = rows {
        return rows
            .iter()
            .map(|row| NamedServer::parse(row).map_err(|e| model_err(&e)))
            .collect();
    }
    let source = source.ok_or(McpLinkerError::InvalidArgument)?;
    handle
        .runtime
        .block_on(handle.local.read(&source))
        .map(|store| store.active_servers())
        .map_err(|e| sync_err(&e))
}

// ============================================================================
// Configuration & auth
// ============================================================================

/// Configures the cloud API client.
///
/// Tokens from an earlier configuration are dropped.
///
/// # Safety
/// - `config_json` must be a valid null-terminated UTF-8 string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_cloud_configure(config_json: *const c_char) -> McpLinkerError {
    let json = match unsafe { parse_cstr(config_json) } {
        Ok(s) => s,
        Err(e) => return e,
    };
    let config: CloudConfig = match serde_json::from_str(json) {
        Ok(c) => c,
        Err(_) => return McpLinkerError::InvalidArgument,
    };
    let api = match CloudApiClient::new(config) {
        Ok(api) => api,
        Err(e) => return cloud_err(&e),
    };

    let mut handle = lock_handle();
    let handle = match handle.as_mut() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };
    handle.cloud_api = Some(api);
    McpLinkerError::Ok
}

/// Sets auth tokens (restoring a saved session).
///
/// # Safety
/// - `tokens_json` must be a valid null-terminated UTF-8 string:
///   `{"access_token": "...", "refresh_token": "..."}`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_cloud_set_tokens(tokens_json: *const c_char) -> McpLinkerError {
    let json = match unsafe { parse_cstr(tokens_json) } {
        Ok(s) => s,
        Err(e) => return e,
    };
    let tokens: AuthTokens = match serde_json::from_str(json) {
        Ok(t) => t,
        Err(_) => return McpLinkerError::InvalidArgument,
    };

    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };
    let api = match handle.cloud_api.as_ref() {
        Some(a) => a.clone(),
        None => return McpLinkerError::NotInitialized,
    };

    handle.runtime.block_on(api.set_tokens(tokens));
    McpLinkerError::Ok
}

/// Clears the auth tokens.
#[unsafe(no_mangle)]
pub extern "C" fn mcplinker_cloud_logout() -> McpLinkerError {
    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };
    let api = match handle.cloud_api.as_ref() {
        Some(a) => a.clone(),
        None => return McpLinkerError::NotInitialized,
    };

    handle.runtime.block_on(api.logout());
    McpLinkerError::Ok
}

/// Gets the current tokens (JSON, or `null` when signed out), so the host
/// can persist a refreshed session.
///
/// # Safety
/// - `out_json` must be a valid pointer. Free the result with `mcplinker_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_cloud_get_tokens(out_json: *mut *mut c_char) -> McpLinkerError {
    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };
    let api = match handle.cloud_api.as_ref() {
        Some(a) => a.clone(),
        None => return McpLinkerError::NotInitialized,
    };

    let tokens = handle.runtime.block_on(api.current_tokens());
    write_json_out(out_json, &tokens)
}

// ============================================================================
// Sync
// ============================================================================

/// Encrypts and uploads a server set.
///
/// Request: `{"clientName", "mode", "entries": [...]}` or
/// `{"clientName", "mode", "source": {"client", "path"}}`.
/// Writes a `SyncReport`; per-entry failures are reported there, not as an
/// error code.
///
/// # Safety
/// - `request_json` must be a valid null-terminated UTF-8 string.
/// - `out_json` must be a valid pointer. Free the result with `mcplinker_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_cloud_upload(
    request_json: *const c_char,
    out_json: *mut *mut c_char,
) -> McpLinkerError {
    let json = match unsafe { parse_cstr(request_json) } {
        Ok(s) => s,
        Err(e) => return e,
    };
    let request: UploadRequest = match serde_json::from_str(json) {
        Ok(r) => r,
        Err(_) => return McpLinkerError::InvalidArgument,
    };

    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };
    let engine = match cloud_engine(handle) {
        Ok(e) => e,
        Err(e) => return e,
    };
    let entries = match local_entries(handle, request.entries, request.source) {
        Ok(entries) => entries,
        Err(e) => return e,
    };

    match handle
        .runtime
        .block_on(engine.upload(&entries, &request.client_name, request.mode))
    {
        Ok(report) => write_json_out(out_json, &report),
        Err(e) => cloud_err(&e),
    }
}

/// Downloads and decrypts the cloud set for a client.
///
/// Writes `{"servers": [...], "skipped": [...]}`; undecryptable records are
/// listed under `skipped`.
///
/// # Safety
/// - `client_name` must be a valid null-terminated UTF-8 string.
/// - `out_json` must be a valid pointer. Free the result with `mcplinker_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_cloud_download(
    client_name: *const c_char,
    out_json: *mut *mut c_char,
) -> McpLinkerError {
    let client_name = match unsafe { parse_cstr(client_name) } {
        Ok(s) => s,
        Err(e) => return e,
    };

    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };
    let engine = match cloud_engine(handle) {
        Ok(e) => e,
        Err(e) => return e,
    };

    match handle.runtime.block_on(engine.download_with_report(client_name)) {
        Ok(report) => write_json_out(out_json, &report),
        Err(e) => cloud_err(&e),
    }
}

/// Downloads the cloud set for a client and writes it into a local client.
///
/// Request: `{"clientName", "dest": {"client", "path"}, "mode"}`.
/// Writes `{"local": {...}, "skipped": [...]}`; records that could not be
/// decrypted are listed under `skipped` and left out of the write.
///
/// # Safety
/// - `request_json` must be a valid null-terminated UTF-8 string.
/// - `out_json` must be a valid pointer. Free the result with `mcplinker_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_cloud_restore(
    request_json: *const c_char,
    out_json: *mut *mut c_char,
) -> McpLinkerError {
    let json = match unsafe { parse_cstr(request_json) } {
        Ok(s) => s,
        Err(e) => return e,
    };
    let request: RestoreRequest = match serde_json::from_str(json) {
        Ok(r) => r,
        Err(_) => return McpLinkerError::InvalidArgument,
    };

    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };
    let engine = match cloud_engine(handle) {
        Ok(e) => e,
        Err(e) => return e,
    };

    let download = match handle
        .runtime
        .block_on(engine.download_with_report(&request.client_name))
    {
        Ok(report) => report,
        Err(e) => return cloud_err(&e),
    };
    match handle.runtime.block_on(handle.local.restore(
        &request.dest,
        download.servers,
        request.mode,
    )) {
        Ok(local) => write_json_out(
            out_json,
            &RestoreReport {
                local,
                skipped: download.skipped,
            },
        ),
        Err(e) => sync_err(&e),
    }
}

/// Gets the record count and last sync time for a client.
///
/// # Safety
/// - `client_name` must be a valid null-terminated UTF-8 string.
/// - `out_json` must be a valid pointer. Free the result with `mcplinker_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_cloud_status(
    client_name: *const c_char,
    out_json: *mut *mut c_char,
) -> McpLinkerError {
    let client_name = match unsafe { parse_cstr(client_name) } {
        Ok(s) => s,
        Err(e) => return e,
    };

    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };
    let engine = match cloud_engine(handle) {
        Ok(e) => e,
        Err(e) => return e,
    };

    match handle.runtime.block_on(engine.status(client_name)) {
        Ok(status) => write_json_out(out_json, &status),
        Err(e) => cloud_err(&e),
    }
}

/// Compares a local set with the cloud copy.
///
/// Request: `{"clientName", "local": [...]}` or `{"clientName", "source"}`.
/// Writes `{"hasChanges": bool, "diff": {...}}`.
///
/// # Safety
/// - `request_json` must be a valid null-terminated UTF-8 string.
/// - `out_json` must be a valid pointer. Free the result with `mcplinker_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_has_pending_changes(
    request_json: *const c_char,
    out_json: *mut *mut c_char,
) -> McpLinkerError {
    let json = match unsafe { parse_cstr(request_json) } {
        Ok(s) => s,
        Err(e) => return e,
    };
    let request: PendingChangesRequest = match serde_json::from_str(json) {
        Ok(r) => r,
        Err(_) => return McpLinkerError::InvalidArgument,
    };

    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };
    let engine = match cloud_engine(handle) {
        Ok(e) => e,
        Err(e) => return e,
    };
    let local = match local_entries(handle, request.local, request.source) {
        Ok(entries) => entries,
        Err(e) => return e,
    };

    match handle.runtime.block_on(engine.download(&request.client_name)) {
        Ok(cloud) => write_json_out(
            out_json,
            &PendingChanges {
                has_changes: differs(&local, &cloud),
                diff: diff(&local, &cloud),
            },
        ),
        Err(e) => cloud_err(&e),
    }
}

// ============================================================================
// Keys
// ============================================================================

/// Stores a base64 key received from another device under `scope`.
///
/// # Safety
/// - `scope`, `key` must be valid null-terminated UTF-8 strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_key_import(
    scope: *const c_char,
    key: *const c_char,
) -> McpLinkerError {
    let scope = match unsafe { parse_cstr(scope) } {
        Ok(s) => s,
        Err(e) => return e,
    };
    let key = match unsafe { parse_cstr(key) } {
        Ok(s) => s,
        Err(e) => return e,
    };

    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };
    match LocalKeyGateway::new(handle.key_store.clone(), scope).import_key(key) {
        Ok(()) => McpLinkerError::Ok,
        Err(e) => crypto_err(&e),
    }
}

/// Exports the key stored under `scope` as a base64 JSON string.
///
/// # Safety
/// - `scope` must be a valid null-terminated UTF-8 string.
/// - `out_json` must be a valid pointer. Free the result with `mcplinker_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_key_export(
    scope: *const c_char,
    out_json: *mut *mut c_char,
) -> McpLinkerError {
    let scope = match unsafe { parse_cstr(scope) } {
        Ok(s) => s,
        Err(e) => return e,
    };

    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };
    match LocalKeyGateway::new(handle.key_store.clone(), scope).export_key() {
        Ok(encoded) => write_json_out(out_json, &encoded),
        Err(e) => crypto_err(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{cstring, take_json};
    use crate::{init_core, mcplinker_shutdown};
    use serial_test::serial;
    use std::ptr;

    #[test]
    #[serial]
    fn cloud_calls_need_configure() {
        assert_eq!(init_core(":memory:"), McpLinkerError::Ok);
        let client = cstring("claude");
        let mut out: *mut c_char = ptr::null_mut();

        let result = unsafe { mcplinker_cloud_status(client.as_ptr(), &mut out) };
        assert_eq!(result, McpLinkerError::NotInitialized);
        assert!(out.is_null());
        assert_eq!(mcplinker_cloud_logout(), McpLinkerError::NotInitialized);
        mcplinker_shutdown();
    }

    #[test]
    #[serial]
    fn configure_rejects_bad_json() {
        assert_eq!(init_core(":memory:"), McpLinkerError::Ok);
        let bad = cstring("{ nope");
        assert_eq!(
            unsafe { mcplinker_cloud_configure(bad.as_ptr()) },
            McpLinkerError::InvalidArgument
        );
        mcplinker_shutdown();
    }

    #[test]
    #[serial]
    fn configure_and_token_round_trip() {
        assert_eq!(init_core(":memory:"), McpLinkerError::Ok);
        let config = cstring(r#"{"api_base_url": "http://127.0.0.1:9/api/v1"}"#);
        assert_eq!(
            unsafe { mcplinker_cloud_configure(config.as_ptr()) },
            McpLinkerError::Ok
        );

        let mut out: *mut c_char = ptr::null_mut();
        assert_eq!(unsafe { mcplinker_cloud_get_tokens(&mut out) }, McpLinkerError::Ok);
        assert_eq!(take_json(out), serde_json::Value::Null);

        let tokens = cstring(r#"{"access_token": "at", "refresh_token": "rt"}"#);
        assert_eq!(
            unsafe { mcplinker_cloud_set_tokens(tokens.as_ptr()) },
            McpLinkerError::Ok
        );
        let mut out: *mut c_char = ptr::null_mut();
        assert_eq!(unsafe { mcplinker_cloud_get_tokens(&mut out) }, McpLinkerError::Ok);
        assert_eq!(
            take_json(out),
            serde_json::json!({"access_token": "at", "refresh_token": "rt"})
        );

        assert_eq!(mcplinker_cloud_logout(), McpLinkerError::Ok);
        mcplinker_shutdown();
    }

    #[test]
    #[serial]
    fn upload_without_entries_or_source_is_invalid() {
        assert_eq!(init_core(":memory:"), McpLinkerError::Ok);
        let config = cstring("{}");
        assert_eq!(
            unsafe { mcplinker_cloud_configure(config.as_ptr()) },
            McpLinkerError::Ok
        );

        let request = cstring(r#"{"clientName": "claude"}"#);
        let mut out: *mut c_char = ptr::null_mut();
        let result = unsafe { mcplinker_cloud_upload(request.as_ptr(), &mut out) };
        assert_eq!(result, McpLinkerError::InvalidArgument);

        let request = cstring(
            r#"{"clientName": "claude", "entries": [{"name": "x", "command": "a", "url": "b"}]}"#,
        );
        let result = unsafe { mcplinker_cloud_upload(request.as_ptr(), &mut out) };
        assert_eq!(result, McpLinkerError::InvalidConfigShape);
        mcplinker_shutdown();
    }

    #[test]
    #[serial]
    fn team_key_must_be_imported() {
        assert_eq!(init_core(":memory:"), McpLinkerError::Ok);
        let config = cstring(r#"{"key_scope": "team-42"}"#);
        assert_eq!(
            unsafe { mcplinker_cloud_configure(config.as_ptr()) },
            McpLinkerError::Ok
        );

        let request = cstring(r#"{"clientName": "claude", "entries": []}"#);
        let mut out: *mut c_char = ptr::null_mut();
        let result = unsafe { mcplinker_cloud_upload(request.as_ptr(), &mut out) };
        assert_eq!(result, McpLinkerError::KeyUnavailable);

        let scope = cstring("team-42");
        let mut out: *mut c_char = ptr::null_mut();
        assert_eq!(
            unsafe { mcplinker_key_export(scope.as_ptr(), &mut out) },
            McpLinkerError::KeyUnavailable
        );
        mcplinker_shutdown();
    }

    #[test]
    #[serial]
    fn key_import_then_export() {
        assert_eq!(init_core(":memory:"), McpLinkerError::Ok);
        let scope = cstring("team-7");
        let key = mcplinker_crypto::SecretKey::generate().to_base64();
        let key_c = cstring(&key);

        assert_eq!(
            unsafe { mcplinker_key_import(scope.as_ptr(), key_c.as_ptr()) },
            McpLinkerError::Ok
        );
        let mut out: *mut c_char = ptr::null_mut();
        assert_eq!(
            unsafe { mcplinker_key_export(scope.as_ptr(), &mut out) },
            McpLinkerError::Ok
        );
        assert_eq!(take_json(out), serde_json::Value::String(key));

        let short = cstring("AAAA");
        assert_eq!(
            unsafe { mcplinker_key_import(scope.as_ptr(), short.as_ptr()) },
            McpLinkerError::InvalidArgument
        );
        mcplinker_shutdown();
    }

    #[test]
    #[serial]
    fn restore_writes_readable_records_and_reports_the_rest() {
        use mcplinker_model::ServerConfig;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let rt = tokio::runtime::Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());

        assert_eq!(init_core(":memory:"), McpLinkerError::Ok);
        let key = mcplinker_crypto::SecretKey::generate();
        let scope = cstring(DEFAULT_SCOPE);
        let key_c = cstring(&key.to_base64());
        assert_eq!(
            unsafe { mcplinker_key_import(scope.as_ptr(), key_c.as_ptr()) },
            McpLinkerError::Ok
        );

        let fs = ServerConfig::parse(&serde_json::json!({"command": "npx", "args": ["server-fs"]}))
            .unwrap();
        let sealed = mcplinker_crypto::encrypt_string(&key, &fs.to_payload()).unwrap();
        rt.block_on(
            Mock::given(method("GET"))
                .and(path("/user-server-configs/"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "configs": [
                        {"id": 1, "serverName": "fs", "clientName": "claude",
                         "encryptConfigData": sealed},
                        {"id": 2, "serverName": "broken", "clientName": "claude",
                         "encryptConfigData": null}
                    ]
                })))
                .mount(&server),
        );

        let config = cstring(&serde_json::json!({"api_base_url": server.uri()}).to_string());
        assert_eq!(
            unsafe { mcplinker_cloud_configure(config.as_ptr()) },
            McpLinkerError::Ok
        );
        let tokens = cstring(r#"{"access_token": "at"}"#);
        assert_eq!(
            unsafe { mcplinker_cloud_set_tokens(tokens.as_ptr()) },
            McpLinkerError::Ok
        );

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("tool.json");
        std::fs::write(
            &dest,
            serde_json::json!({"mcpServers": {"kept": {"command": "x"}}}).to_string(),
        )
        .unwrap();
        let request = cstring(
            &serde_json::json!({
                "clientName": "claude",
                "dest": {"client": "my-tool", "path": dest},
                "mode": "merge"
            })
            .to_string(),
        );
        let mut out: *mut c_char = ptr::null_mut();
        assert_eq!(
            unsafe { mcplinker_cloud_restore(request.as_ptr(), &mut out) },
            McpLinkerError::Ok
        );

        let report = take_json(out);
        assert_eq!(report["local"]["added"], serde_json::json!(["fs"]));
        assert_eq!(report["skipped"][0]["name"], "broken");

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&dest).unwrap()).unwrap();
        assert_eq!(written["mcpServers"]["kept"], serde_json::json!({"command": "x"}));
        assert_eq!(written["mcpServers"]["fs"]["command"], "npx");
        assert!(written["mcpServers"].get("broken").is_none());
        mcplinker_shutdown();
    }
}
