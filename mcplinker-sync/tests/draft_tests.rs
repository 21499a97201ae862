use mcplinker_sync::{DraftStore, FileDraftStore, MemoryDraftStore, ServerDraft};
use pretty_assertions::assert_eq;
use serde_json::json;

fn draft() -> ServerDraft {
    ServerDraft {
        server_name: "github".into(),
        config: json!({"command": "npx", "args": ["-y", "@modelcontextprotocol/server-github"]}),
        env_values: [("GITHUB_TOKEN".to_string(), "ghp_x".to_string())].into(),
    }
}

#[tokio::test]
async fn file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDraftStore::new(dir.path().join("drafts/current.json"));

    assert_eq!(store.load().await.unwrap(), None);
    store.save(&draft()).await.unwrap();
    assert_eq!(store.load().await.unwrap(), Some(draft()));

    store.clear().await.unwrap();
    assert_eq!(store.load().await.unwrap(), None);
    store.clear().await.unwrap();
}

#[tokio::test]
async fn file_store_uses_camel_case() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("draft.json");
    FileDraftStore::new(&path).save(&draft()).await.unwrap();

    let raw: serde_json::Value =
        serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
    assert_eq!(raw["serverName"], json!("github"));
    assert_eq!(raw["envValues"]["GITHUB_TOKEN"], json!("ghp_x"));
}

#[tokio::test]
async fn corrupt_draft_loads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("draft.json");
    tokio::fs::write(&path, "{{{").await.unwrap();
    assert_eq!(FileDraftStore::new(&path).load().await.unwrap(), None);
}

#[tokio::test]
async fn incomplete_config_is_kept_raw() {
    let store = MemoryDraftStore::new();
    let partial = ServerDraft {
        server_name: "wip".into(),
        config: json!({"args": ["half", "typed"]}),
        ..ServerDraft::default()
    };
    store.save(&partial).await.unwrap();
    assert_eq!(store.load().await.unwrap(), Some(partial));
    store.clear().await.unwrap();
    assert_eq!(store.load().await.unwrap(), None);
}
