//! Edit-draft exports.

use crate::{McpLinkerError, lock_handle, parse_cstr, sync_err, write_json_out};
use mcplinker_sync::ServerDraft;
use std::ffi::c_char;

/// Gets the saved draft (JSON, or `null` when there is none).
///
/// # Safety
/// - `out_json` must be a valid pointer. Free the result with `mcplinker_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_draft_load(out_json: *mut *mut c_char) -> McpLinkerError {
    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };

    match handle.runtime.block_on(handle.drafts.load()) {
        Ok(draft) => write_json_out(out_json, &draft),
        Err(e) => sync_err(&e),
    }
}

/// Saves the draft, replacing any earlier one.
///
/// # Safety
/// - `draft_json` must be a valid null-terminated UTF-8 string:
///   `{"serverName", "config", "envValues"}`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mcplinker_draft_save(draft_json: *const c_char) -> McpLinkerError {
    let json = match unsafe { parse_cstr(draft_json) } {
        Ok(s) => s,
        Err(e) => return e,
    };
    let draft: ServerDraft = match serde_json::from_str(json) {
        Ok(d) => d,
        Err(_) => return McpLinkerError::InvalidArgument,
    };

    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };

    match handle.runtime.block_on(handle.drafts.save(&draft)) {
        Ok(()) => McpLinkerError::Ok,
        Err(e) => sync_err(&e),
    }
}

/// Discards the draft.
#[unsafe(no_mangle)]
pub extern "C" fn mcplinker_draft_clear() -> McpLinkerError {
    let handle = lock_handle();
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return McpLinkerError::NotInitialized,
    };

    match handle.runtime.block_on(handle.drafts.clear()) {
        Ok(()) => McpLinkerError::Ok,
        Err(e) => sync_err(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{cstring, take_json};
    use crate::{init_core, mcplinker_shutdown};
    use serde_json::json;
    use serial_test::serial;
    use std::ptr;

    fn load() -> serde_json::Value {
        let mut out: *mut c_char = ptr::null_mut();
        assert_eq!(unsafe { mcplinker_draft_load(&mut out) }, McpLinkerError::Ok);
        take_json(out)
    }

    #[test]
    #[serial]
    fn draft_save_load_clear_in_memory() {
        assert_eq!(init_core(":memory:"), McpLinkerError::Ok);
        assert_eq!(load(), serde_json::Value::Null);

        let draft = json!({
            "serverName": "github",
            "config": {"command": "npx"},
            "envValues": {"GITHUB_TOKEN": "ghp_x"}
        });
        let draft_c = cstring(&draft.to_string());
        assert_eq!(
            unsafe { mcplinker_draft_save(draft_c.as_ptr()) },
            McpLinkerError::Ok
        );
        assert_eq!(load(), draft);

        assert_eq!(mcplinker_draft_clear(), McpLinkerError::Ok);
        assert_eq!(load(), serde_json::Value::Null);
        mcplinker_shutdown();
    }

    #[test]
    #[serial]
    fn draft_survives_reinit_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();
        assert_eq!(init_core(data_dir), McpLinkerError::Ok);

        let draft_c = cstring(r#"{"serverName": "wip", "config": {"args": ["half"]}}"#);
        assert_eq!(
            unsafe { mcplinker_draft_save(draft_c.as_ptr()) },
            McpLinkerError::Ok
        );
        mcplinker_shutdown();

        assert_eq!(init_core(data_dir), McpLinkerError::Ok);
        assert_eq!(
            load(),
            json!({"serverName": "wip", "config": {"args": ["half"]}, "envValues": {}})
        );
        mcplinker_shutdown();
    }

    #[test]
    #[serial]
    fn draft_calls_before_init() {
        mcplinker_shutdown();
        assert_eq!(mcplinker_draft_clear(), McpLinkerError::NotInitialized);
        let draft_c = cstring("not json");
        assert_eq!(
            unsafe { mcplinker_draft_save(draft_c.as_ptr()) },
            McpLinkerError::InvalidArgument
        );
    }
}
