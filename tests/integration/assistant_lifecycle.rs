//! Start / perception loop / shutdown behaviour of the running assistant.

use crate::helpers::{test_assistant, test_assistant_in};
use jarvis::StateStore;

#[tokio::test]
async fn loop_answers_in_order_and_state_survives_restart() {
    let t = test_assistant();
    t.assistant.start().await.unwrap();
    assert!(t.assistant.is_running().await);

    t.listener.say("my name is Grace");
    t.listener.say("what time is it");
    let lines = t.wait_for_lines(2).await;
    assert!(lines[0].contains("Grace"));
    assert_eq!(lines[1], "You said: what time is it");

    t.assistant.shutdown().await;
    assert!(!t.assistant.is_running().await);

    let store = StateStore::new(t.dir.path().join("memory.json"));
    store.load().await.unwrap();
    assert_eq!(store.user_profile().await.name.as_deref(), Some("Grace"));
    assert_eq!(store.recent_conversation(5).await.len(), 1);

    let dir = t.dir;
    let again = test_assistant_in(dir);
    again.assistant.start().await.unwrap();
    assert_eq!(
        again.assistant.store().user_profile().await.name.as_deref(),
        Some("Grace")
    );
    again.assistant.shutdown().await;
}

#[tokio::test]
async fn repeated_start_and_shutdown_are_harmless() {
    let t = test_assistant();
    t.assistant.start().await.unwrap();
    t.assistant.start().await.unwrap();
    t.assistant.shutdown().await;
    t.assistant.shutdown().await;
    assert!(!t.assistant.is_running().await);
}

#[tokio::test]
async fn corrupt_state_file_does_not_block_startup() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("memory.json"), "{ not json").unwrap();
    let t = test_assistant_in(dir);

    t.assistant.start().await.unwrap();
    assert!(t.assistant.store().user_profile().await.name.is_none());
    t.assistant.shutdown().await;
}
