//! Local config-file exports: client-to-client sync and per-entry edits.

use crate::{McpLinkerError, lock_handle, parse_cstr, sync_err, write_json_out};
use mcplinker_model::SyncMode;
use mcplinker_sync::{ClientTarget, SyncResult};
use serde::Deserialize;
use serde_json::Value;
use std::ffi::c_char;

#[derive(Deserialize)]
struct LocalSyncRequest {
    source: ClientTarget,
    dest: ClientTarget,
    #[serde(default)]
    mode: SyncMode,
}

unsafe fn parse_target(target_json: *const c_char) -> Result<ClientTarget, McpLinkerError> {
    let json = unsafe { parse_cstr(target_json) }?;
    serde_json::from_str(json).map_err(|_| McpLinkerError::InvalidArgument)
}

/// Writes one client's servers into another's config file.
///
/// Request: `{"source": {"client", "path"}, "dest": {...}, "mode": "merge" | "override"}`.
/// Writes a `{"added", "updated", "removed", "unchanged"}` report.
///
/// # Safety
/// - `request_json` must be a valid null-terminated UTF-8 string.
/// - `out_json` must be a valid pointer. Free the result with `mcplinker_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_local_sync(
    request_json: *const c_char,
    out_json: *mut *mut c_char,
) -> McpLinkerError {
    let json = match unsafe { parse_cstr(request_json) } {
        Ok(s) => s,
        Err(e) => return e,
    };
    let request: LocalSyncRequest = match serde_json::from_str(json) {
        Ok(r) => r,
        Err(_) => return McpLinkerError::InvalidArgument,
    };

    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };

    match handle
        .runtime
        .block_on(handle.local.sync(&request.source, &request.dest, request.mode))
    {
        Ok(report) => write_json_out(out_json, &report),
        Err(e) => sync_err(&e),
    }
}

/// Reads a client's servers as `{"active": {...}, "disabled": {...}}`.
///
/// # Safety
/// - `target_json` must be a valid null-terminated UTF-8 string.
/// - `out_json` must be a valid pointer. Free the result with `mcplinker_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_local_read(
    target_json: *const c_char,
    out_json: *mut *mut c_char,
) -> McpLinkerError {
    let target = match unsafe { parse_target(target_json) } {
        Ok(t) => t,
        Err(e) => return e,
    };

    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };

    match handle.runtime.block_on(handle.local.read(&target)) {
        Ok(store) => write_json_out(out_json, &store),
        Err(e) => sync_err(&e),
    }
}

#[derive(Clone, Copy)]
enum EntryOp {
    Enable,
    Disable,
    Delete,
}

unsafe fn run_entry_op(
    target_json: *const c_char,
    name: *const c_char,
    op: EntryOp,
) -> McpLinkerError {
    let target = match unsafe { parse_target(target_json) } {
        Ok(t) => t,
        Err(e) => return e,
    };
    let name = match unsafe { parse_cstr(name) } {
        Ok(s) => s,
        Err(e) => return e,
    };

    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };

    let result: SyncResult<()> = handle.runtime.block_on(async {
        match op {
            EntryOp::Enable => handle.local.enable(&target, name).await,
            EntryOp::Disable => handle.local.disable(&target, name).await,
            EntryOp::Delete => handle.local.delete_entry(&target, name).await,
        }
    });
    match result {
        Ok(()) => McpLinkerError::Ok,
        Err(e) => sync_err(&e),
    }
}

/// Moves a server from the disabled to the active partition.
///
/// # Safety
/// - `target_json`, `name` must be valid null-terminated UTF-8 strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_server_enable(
    target_json: *const c_char,
    name: *const c_char,
) -> McpLinkerError {
    unsafe { run_entry_op(target_json, name, EntryOp::Enable) }
}

/// Moves a server from the active to the disabled partition.
///
/// # Safety
/// - `target_json`, `name` must be valid null-terminated UTF-8 strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_server_disable(
    target_json: *const c_char,
    name: *const c_char,
) -> McpLinkerError {
    unsafe { run_entry_op(target_json, name, EntryOp::Disable) }
}

/// Removes a server from whichever partition holds it.
///
/// # Safety
/// - `target_json`, `name` must be valid null-terminated UTF-8 strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_server_delete(
    target_json: *const c_char,
    name: *const c_char,
) -> McpLinkerError {
    unsafe { run_entry_op(target_json, name, EntryOp::Delete) }
}

/// Adds or replaces one server from its raw entry JSON.
///
/// An existing entry keeps its partition. A malformed entry is rejected with
/// `InvalidConfigShape` before the file is touched.
///
/// # Safety
/// - `target_json`, `name`, `entry_json` must be valid null-terminated UTF-8 strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_server_upsert(
    target_json: *const c_char,
    name: *const c_char,
    entry_json: *const c_char,
) -> McpLinkerError {
    let target = match unsafe { parse_target(target_json) } {
        Ok(t) => t,
        Err(e) => return e,
    };
    let name = match unsafe { parse_cstr(name) } {
        Ok(s) => s,
        Err(e) => return e,
    };
    let json = match unsafe { parse_cstr(entry_json) } {
        Ok(s) => s,
        Err(e) => return e,
    };
    let entry: Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(_) => return McpLinkerError::InvalidArgument,
    };

    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };

    match handle
        .runtime
        .block_on(handle.local.upsert_entry(&target, name, &entry))
    {
        Ok(()) => McpLinkerError::Ok,
        Err(e) => sync_err(&e),
    }
}

/// Removes several servers at once.
///
/// `names_json` is a JSON array of names; unknown names are ignored. Writes
/// the array of names that were removed.
///
/// # Safety
/// - `target_json`, `names_json` must be valid null-terminated UTF-8 strings.
/// - `out_json` must be a valid pointer. Free the result with `mcplinker_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_server_batch_delete(
    target_json: *const c_char,
    names_json: *const c_char,
    out_json: *mut *mut c_char,
) -> McpLinkerError {
    let target = match unsafe { parse_target(target_json) } {
        Ok(t) => t,
        Err(e) => return e,
    };
    let json = match unsafe { parse_cstr(names_json) } {
        Ok(s) => s,
        Err(e) => return e,
    };
    let names: Vec<String> = match serde_json::from_str(json) {
        Ok(n) => n,
        Err(_) => return McpLinkerError::InvalidArgument,
    };

    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };

    match handle
        .runtime
        .block_on(handle.local.delete_entries(&target, &names))
    {
        Ok(removed) => write_json_out(out_json, &removed),
        Err(e) => sync_err(&e),
    }
}
