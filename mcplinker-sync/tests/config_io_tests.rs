use mcplinker_model::{ClientConfigStore, ServerConfig};
use mcplinker_sync::{
    ClientKind, ClientTarget, ConfigFileIo, DisabledLayout, JsonConfigFiles, SyncError,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::path::Path;

fn parse(v: Value) -> ServerConfig {
    ServerConfig::parse(&v).unwrap()
}

async fn write_json(path: &Path, value: Value) {
    tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
    tokio::fs::write(path, serde_json::to_vec_pretty(&value).unwrap())
        .await
        .unwrap();
}

async fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&tokio::fs::read(path).await.unwrap()).unwrap()
}

// ── Reading ──

#[tokio::test]
async fn missing_file_reads_as_empty() {
    let home = tempfile::tempdir().unwrap();
    let io = JsonConfigFiles::with_home(home.path());
    let store = io.read_config(&ClientTarget::new("cursor")).await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn section_layout_reads_both_partitions() {
    let home = tempfile::tempdir().unwrap();
    let io = JsonConfigFiles::with_home(home.path());
    write_json(
        &home.path().join(".cursor/mcp.json"),
        json!({
            "mcpServers": {"fs": {"command": "npx", "args": ["-y", "server-fs"]}},
            "__disabled": {"git": {"command": "uvx", "args": ["mcp-server-git"]}}
        }),
    )
    .await;

    let store = io.read_config(&ClientTarget::new("cursor")).await.unwrap();
    assert_eq!(store.active.len(), 1);
    assert_eq!(
        store.disabled.get("git"),
        Some(&parse(json!({"command": "uvx", "args": ["mcp-server-git"]})))
    );
}

#[tokio::test]
async fn flag_layout_reads_disabled_entries() {
    let home = tempfile::tempdir().unwrap();
    let io = JsonConfigFiles::with_home(home.path());
    let target = ClientTarget::with_path("roo_code", home.path().join("proj"));
    write_json(
        &home.path().join("proj/.roo/mcp.json"),
        json!({"mcpServers": {
            "on": {"command": "a", "disabled": false},
            "off": {"command": "b", "disabled": true}
        }}),
    )
    .await;

    let store = io.read_config(&target).await.unwrap();
    assert!(store.active.contains_key("on"));
    assert_eq!(store.disabled.get("off"), Some(&parse(json!({"command": "b"}))));
}

#[tokio::test]
async fn is_active_layout_reads_disabled_entries() {
    let home = tempfile::tempdir().unwrap();
    let io = JsonConfigFiles::with_home(home.path());
    write_json(
        &home.path().join(".config/cherrystudio/mcp.json"),
        json!({"mcpServers": {
            "on": {"command": "a", "isActive": true},
            "off": {"url": "http://x/mcp", "isActive": false}
        }}),
    )
    .await;

    let store = io.read_config(&ClientTarget::new("cherrystudio")).await.unwrap();
    assert_eq!(store.active.get("on"), Some(&parse(json!({"command": "a"}))));
    assert_eq!(store.disabled.get("off"), Some(&parse(json!({"url": "http://x/mcp"}))));
}

#[tokio::test]
async fn vscode_uses_servers_key() {
    let home = tempfile::tempdir().unwrap();
    let io = JsonConfigFiles::with_home(home.path());
    write_json(
        &home.path().join(".vscode/mcp.json"),
        json!({"servers": {"gh": {"type": "http", "url": "https://api.example.com/mcp"}}, "inputs": []}),
    )
    .await;

    let store = io.read_config(&ClientTarget::new("vscode")).await.unwrap();
    assert!(store.active.contains_key("gh"));
}

#[tokio::test]
async fn malformed_entry_names_the_entry() {
    let home = tempfile::tempdir().unwrap();
    let io = JsonConfigFiles::with_home(home.path());
    write_json(
        &home.path().join(".cursor/mcp.json"),
        json!({"mcpServers": {"bad": {"command": "npx", "env": ["A=1"]}}}),
    )
    .await;

    let err = io.read_config(&ClientTarget::new("cursor")).await.unwrap_err();
    assert!(matches!(err, SyncError::Model(_)));
    let msg = err.to_string();
    assert!(msg.starts_with("invalid server config shape: server 'bad' in "), "{msg}");
    assert!(msg.ends_with("`env` must be an object, got an array"), "{msg}");
}

#[tokio::test]
async fn invalid_json_is_a_config_file_error() {
    let home = tempfile::tempdir().unwrap();
    let io = JsonConfigFiles::with_home(home.path());
    let path = home.path().join(".cursor/mcp.json");
    tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
    tokio::fs::write(&path, "{ not json").await.unwrap();

    let err = io.read_config(&ClientTarget::new("cursor")).await.unwrap_err();
    assert!(matches!(err, SyncError::ConfigFile { .. }));

    // writes refuse to clobber it too
    let err = io
        .write_config(&ClientTarget::new("cursor"), &ClientConfigStore::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ConfigFile { .. }));
    assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "{ not json");
}

#[tokio::test]
async fn empty_file_reads_as_empty() {
    let home = tempfile::tempdir().unwrap();
    let io = JsonConfigFiles::with_home(home.path());
    let path = home.path().join(".codeium/windsurf/mcp_config.json");
    tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
    tokio::fs::write(&path, "\n").await.unwrap();
    assert!(io.read_config(&ClientTarget::new("windsurf")).await.unwrap().is_empty());
}

// ── Writing ──

#[tokio::test]
async fn write_preserves_unrelated_root_keys() {
    let home = tempfile::tempdir().unwrap();
    let io = JsonConfigFiles::with_home(home.path());
    let path = home.path().join(".cursor/mcp.json");
    write_json(
        &path,
        json!({"theme": "dark", "mcpServers": {"old": {"command": "x"}}, "__disabled": {"gone": {"command": "y"}}}),
    )
    .await;

    let mut store = ClientConfigStore::new();
    store.upsert_active("fs", parse(json!({"command": "npx"})));
    io.write_config(&ClientTarget::new("cursor"), &store).await.unwrap();

    assert_eq!(
        read_json(&path).await,
        json!({
            "theme": "dark",
            "mcpServers": {"fs": {"type": "stdio", "command": "npx", "args": [], "env": {}}}
        })
    );
}

#[tokio::test]
async fn write_keeps_untouched_entries_verbatim() {
    let home = tempfile::tempdir().unwrap();
    let io = JsonConfigFiles::with_home(home.path());
    let path = home.path().join(".cursor/mcp.json");
    write_json(
        &path,
        json!({
            "mcpServers": {
                "old": {"command": "x"},
                "remote": {"url": "http://h/mcp", "type": "streamable-http"},
                "bumped": {"command": "v1"}
            },
            "__disabled": {"parked": {"command": "p", "args": "--port 1"}}
        }),
    )
    .await;
    let target = ClientTarget::new("cursor");

    let mut store = io.read_config(&target).await.unwrap();
    store.upsert_active("bumped", parse(json!({"command": "v2"})));
    store.upsert_active("fs", parse(json!({"command": "npx"})));
    io.write_config(&target, &store).await.unwrap();

    assert_eq!(
        read_json(&path).await,
        json!({
            "mcpServers": {
                "old": {"command": "x"},
                "remote": {"url": "http://h/mcp", "type": "streamable-http"},
                "bumped": {"type": "stdio", "command": "v2", "args": [], "env": {}},
                "fs": {"type": "stdio", "command": "npx", "args": [], "env": {}}
            },
            "__disabled": {"parked": {"command": "p", "args": "--port 1"}}
        })
    );
}

#[tokio::test]
async fn partition_move_rewrites_only_the_moved_entry() {
    let home = tempfile::tempdir().unwrap();
    let io = JsonConfigFiles::with_home(home.path());
    let target = ClientTarget::with_path("roo_code", home.path().join("p"));
    let path = home.path().join("p/.roo/mcp.json");
    write_json(
        &path,
        json!({"mcpServers": {
            "a": {"command": "a1", "disabled": false},
            "b": {"command": "b1", "disabled": true}
        }}),
    )
    .await;

    io.enable(&target, "b").await.unwrap();

    let written = read_json(&path).await;
    assert_eq!(written["mcpServers"]["a"], json!({"command": "a1", "disabled": false}));
    assert_eq!(
        written["mcpServers"]["b"],
        json!({"type": "stdio", "command": "b1", "args": [], "env": {}})
    );
}

#[tokio::test]
async fn write_is_pretty_with_trailing_newline() {
    let home = tempfile::tempdir().unwrap();
    let io = JsonConfigFiles::with_home(home.path());
    let mut store = ClientConfigStore::new();
    store.upsert_active("fs", parse(json!({"command": "npx"})));
    io.write_config(&ClientTarget::new("windsurf"), &store).await.unwrap();

    let text = tokio::fs::read_to_string(home.path().join(".codeium/windsurf/mcp_config.json"))
        .await
        .unwrap();
    assert!(text.ends_with("}\n"));
    assert!(text.contains("\n  \"mcpServers\": {"));
    assert!(!home
        .path()
        .join(".codeium/windsurf/mcp_config.json.mcplinker-tmp")
        .exists());
}

#[tokio::test]
async fn write_flag_and_is_active_layouts() {
    let home = tempfile::tempdir().unwrap();
    let io = JsonConfigFiles::with_home(home.path());
    let mut store = ClientConfigStore::new();
    store.upsert_active("on", parse(json!({"command": "a"})));
    store.upsert_disabled("off", parse(json!({"command": "b"})));

    let roo = ClientTarget::with_path("roo_code", home.path().join("p"));
    io.write_config(&roo, &store).await.unwrap();
    let written = read_json(&home.path().join("p/.roo/mcp.json")).await;
    assert_eq!(written["mcpServers"]["off"]["disabled"], json!(true));
    assert!(written["mcpServers"]["on"].get("disabled").is_none());
    assert!(written.get("__disabled").is_none());

    io.write_config(&ClientTarget::new("cherrystudio"), &store).await.unwrap();
    let written = read_json(&home.path().join(".config/cherrystudio/mcp.json")).await;
    assert_eq!(written["mcpServers"]["on"]["isActive"], json!(true));
    assert_eq!(written["mcpServers"]["off"]["isActive"], json!(false));

    // and both read back into the same partitions
    assert_eq!(io.read_config(&roo).await.unwrap(), store);
    assert_eq!(io.read_config(&ClientTarget::new("cherrystudio")).await.unwrap(), store);
}

#[tokio::test]
async fn disable_then_enable_round_trips_payload() {
    let home = tempfile::tempdir().unwrap();
    let io = JsonConfigFiles::with_home(home.path());
    let target = ClientTarget::with_path("my-tool", home.path().join("tool.json"));
    write_json(
        &home.path().join("tool.json"),
        json!({"mcpServers": {"fs": {"command": "npx", "args": ["-y", "server-fs"], "cwd": "/srv"}}}),
    )
    .await;
    let before = io.read_config(&target).await.unwrap();

    io.disable(&target, "fs").await.unwrap();
    let disabled = io.read_config(&target).await.unwrap();
    assert_eq!(disabled.disabled.get("fs"), before.active.get("fs"));

    io.enable(&target, "fs").await.unwrap();
    assert_eq!(io.read_config(&target).await.unwrap(), before);
}

// ── Paths ──

#[test]
fn fixed_paths_resolve_under_home() {
    let home = Path::new("/home/u");
    let io = JsonConfigFiles::with_home(home);
    assert_eq!(
        io.path_for(&ClientTarget::new("cursor")).unwrap(),
        home.join(".cursor/mcp.json")
    );
    assert_eq!(
        io.path_for(&ClientTarget::new("windsurf")).unwrap(),
        home.join(".codeium/windsurf/mcp_config.json")
    );
    assert_eq!(
        io.path_for(&ClientTarget::new("mcphub")).unwrap(),
        home.join(".config/mcphub/servers.json")
    );
    assert_eq!(
        io.path_for(&ClientTarget::with_path("vscode", "/work/app")).unwrap(),
        Path::new("/work/app/.vscode/mcp.json")
    );
}

#[test]
fn custom_paths_accept_file_or_directory() {
    let io = JsonConfigFiles::with_home("/home/u");
    assert_eq!(
        io.path_for(&ClientTarget::with_path("custom", "/etc/tools/servers.json")).unwrap(),
        Path::new("/etc/tools/servers.json")
    );
    assert_eq!(
        io.path_for(&ClientTarget::with_path("custom", "/etc/tools")).unwrap(),
        Path::new("/etc/tools/mcp.json")
    );
    assert!(matches!(
        io.path_for(&ClientTarget::new("custom")),
        Err(SyncError::PathRequired(_))
    ));
}

#[test]
fn client_layouts() {
    assert_eq!(ClientKind::from_id("cline").disabled_layout(), DisabledLayout::Flag);
    assert_eq!(ClientKind::from_id("cherrystudio").disabled_layout(), DisabledLayout::IsActive);
    assert_eq!(ClientKind::from_id("claude").disabled_layout(), DisabledLayout::Section);
    assert_eq!(ClientKind::from_id("vscode").servers_key(), "servers");
    assert!(ClientKind::from_id("claude_code").requires_path());
    assert!(!ClientKind::from_id("roo_code").requires_path());
}
