use pretty_assertions::assert_eq;
use rulesync_cli::settings::{workspace_settings, FileStore, SettingsPaths};
use rulesync_cli::watch::{changed_items, single_pass};
use rulesync_core::{Rule, Scope};
use rulesync_engine::{
    Command, CommandLayer, ScopeStore, StoreError, SyncConfig, SyncEngine, Watched,
};
use rulesync_test_utils::{flattened, rules, ScriptedPrompter};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn store_in(dir: &TempDir, workspace: bool) -> FileStore {
    let global = dir.path().join("config").join("settings.json");
    let workspace = workspace.then(|| workspace_settings(&dir.path().join("project")));
    FileStore::new(SettingsPaths::new(global, workspace), &SyncConfig::default())
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_missing_files_read_empty() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, true);
    assert!(store.read_rules(Scope::Global).await.unwrap().is_empty());
    assert_eq!(store.read_flattened(Scope::Workspace).await.unwrap(), "");
}

#[tokio::test]
async fn test_writes_preserve_unrelated_keys() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, false);
    let path = store.paths().global.clone();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{"editor.fontSize": 14}"#).unwrap();

    store.write_rules(Scope::Global, &rules(&[(1, "a")])).await.unwrap();
    store.write_flattened(Scope::Global, "a: 1").await.unwrap();

    assert_eq!(
        read_json(&path),
        json!({
            "editor.fontSize": 14,
            "rulesync.rules": [{"id": 1, "key": "a"}],
            "rulesync.instructions": "a: 1",
        })
    );
    assert_eq!(store.read_rules(Scope::Global).await.unwrap(), rules(&[(1, "a")]));

    let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("settings.json")]);
}

#[tokio::test]
async fn test_malformed_records_decode_leniently() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, false);
    let path = store.paths().global.clone();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        r#"{"rulesync.rules": [{"id": 2.5, "key": "a"}, {"key": true}, 7, {"id": 3}],
            "rulesync.instructions": 42}"#,
    )
    .unwrap();

    assert_eq!(
        store.read_rules(Scope::Global).await.unwrap(),
        vec![Rule::new(0, "a"), Rule::new(0, "true"), Rule::new(3, "")]
    );
    assert_eq!(store.read_flattened(Scope::Global).await.unwrap(), "");
}

#[tokio::test]
async fn test_invalid_json_is_a_store_error() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, false);
    let path = store.paths().global.clone();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    let err = store.read_rules(Scope::Global).await.unwrap_err();
    assert!(matches!(err, StoreError::Malformed { .. }));
}

#[tokio::test]
async fn test_workspace_needs_a_root() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, false);
    assert!(!store.workspace_open());
    let err = store.write_flattened(Scope::Workspace, "a: 1").await.unwrap_err();
    assert!(matches!(err, StoreError::WorkspaceUnavailable));
}

#[tokio::test]
async fn test_add_writes_both_keys_to_workspace_file() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(store_in(&dir, true));
    let prompter = ScriptedPrompter::new().shared();
    let engine = SyncEngine::new(store.clone(), prompter, SyncConfig::default());
    let layer = CommandLayer::new(Arc::new(engine));

    layer
        .run(Command::Add {
            scope: Some(Scope::Workspace),
            key: Some("greeting".to_string()),
            value: Some("hello".to_string()),
        })
        .await
        .unwrap();

    let path = workspace_settings(&dir.path().join("project"));
    assert_eq!(
        read_json(&path),
        json!({
            "rulesync.rules": [{"id": 1, "key": "greeting"}],
            "rulesync.instructions": "greeting: hello",
        })
    );
    assert!(!store.paths().global.exists());
}

#[tokio::test]
async fn test_single_pass_settles_external_edit() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(store_in(&dir, false));
    store.write_rules(Scope::Global, &rules(&[(1, "a")])).await.unwrap();
    store
        .write_flattened(Scope::Global, &flattened(&["a: 1", "new: 2"]))
        .await
        .unwrap();
    let before = store.snapshot(Scope::Global).await.unwrap();

    let prompter = ScriptedPrompter::new().with_pick(Some(0)).shared();
    let engine = SyncEngine::new(store.clone(), prompter.clone(), SyncConfig::default());
    single_pass(&engine).await;

    assert_eq!(
        store.read_rules(Scope::Global).await.unwrap(),
        rules(&[(1, "a"), (2, "new")])
    );
    let after = store.snapshot(Scope::Global).await.unwrap();
    assert_eq!(changed_items(&before, &after), vec![Watched::Rules]);
    assert_eq!(prompter.remaining(), 0);
}
