//! State store durability and document layout.

use jarvis::StateStore;
use jarvis::memory::MAX_CONVERSATION_ENTRIES;
use std::sync::Arc;

#[tokio::test]
async fn flush_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");

    let store = StateStore::new(&path);
    store.load().await.unwrap();
    store.remember_name("Pepper").await.unwrap();
    store.set_preference("tone", "casual").await.unwrap();
    store.add_custom_command("Lights Out", "close notepad").await.unwrap();
    for i in 0..3 {
        store
            .append_conversation(&format!("q{i}"), &format!("a{i}"))
            .await
            .unwrap();
    }
    store.flush().await.unwrap();
    let before = store.snapshot().await;

    let reloaded = StateStore::new(&path);
    reloaded.load().await.unwrap();
    assert_eq!(reloaded.snapshot().await, before);
    assert_eq!(
        before.user.custom_commands.get("lights out").map(String::as_str),
        Some("close notepad")
    );
}

#[tokio::test]
async fn conversation_log_is_bounded_under_concurrency() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(StateStore::new(dir.path().join("memory.json")));
    store.load().await.unwrap();

    let mut tasks = Vec::new();
    for worker in 0..4 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            for i in 0..20 {
                store
                    .append_conversation(&format!("w{worker}-{i}"), "ok")
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let log = store.recent_conversation(usize::MAX).await;
    assert_eq!(log.len(), MAX_CONVERSATION_ENTRIES);

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(
        on_disk["conversation_log"].as_array().unwrap().len(),
        MAX_CONVERSATION_ENTRIES
    );
}

#[tokio::test]
async fn legacy_document_without_workflow_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");
    std::fs::write(
        &path,
        r#"{"user": {"name": "Happy", "preferences": {"music": "rock"}, "custom_commands": {}},
            "conversation_log": [{"user": "hi", "assistant": "hello"}]}"#,
    )
    .unwrap();

    let store = StateStore::new(&path);
    store.load().await.unwrap();
    let state = store.snapshot().await;
    assert_eq!(state.user.name.as_deref(), Some("Happy"));
    assert_eq!(state.conversation_log.len(), 1);
    assert!(state.workflow.pending.is_empty());
}
