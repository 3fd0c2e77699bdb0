//! End-to-end conversational scenarios through `Assistant::respond`.

use crate::helpers::test_assistant;
use jarvis::FALLBACK_RESPONSE;
use jarvis::workflow::PendingSlot;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn name_is_remembered_and_echoed() {
    let t = test_assistant();
    t.assistant.run_check().await.unwrap();

    let reply = t.turn("my name is Ada").await;
    assert!(reply.contains("Ada"));
    assert_eq!(
        t.assistant.store().user_profile().await.name.as_deref(),
        Some("Ada")
    );
}

#[tokio::test]
async fn preference_is_stored() {
    let t = test_assistant();
    t.assistant.run_check().await.unwrap();

    t.turn("remember coffee is black").await;
    assert_eq!(
        t.assistant.store().preference("coffee").await.as_deref(),
        Some("black")
    );
}

#[tokio::test]
async fn spoken_shortcut_runs_its_action() {
    let t = test_assistant();
    t.assistant.run_check().await.unwrap();

    let stored = t
        .turn("remember command lights out means status report")
        .await;
    assert!(stored.contains("'lights out'"));

    let calls_before = t.llm.calls.load(Ordering::SeqCst);
    let reply = t.turn("Lights Out").await;
    assert_eq!(reply, "CPU usage is at 5 percent. Memory usage is 40 percent.");
    assert_eq!(t.llm.calls.load(Ordering::SeqCst), calls_before);
    assert!(t.assistant.store().recent_conversation(10).await.is_empty());
}

#[tokio::test]
async fn shutdown_then_cancel_has_no_side_effect() {
    let t = test_assistant();
    t.assistant.run_check().await.unwrap();

    let proposal = t.turn("shutdown").await;
    assert!(proposal.contains("confirm shutdown"));
    assert!(
        !PendingSlot::SYSTEM
            .current(t.assistant.store())
            .await
            .is_idle()
    );

    t.turn("cancel").await;
    assert!(
        PendingSlot::SYSTEM
            .current(t.assistant.store())
            .await
            .is_idle()
    );
    assert!(t.power.actions().is_empty());
}

#[tokio::test]
async fn confirm_with_nothing_pending_does_nothing() {
    let t = test_assistant();
    t.assistant.run_check().await.unwrap();

    let reply = t.turn("confirm").await;
    assert_eq!(reply, "There's nothing awaiting confirmation, sir.");
    assert!(t.power.actions().is_empty());
}

#[tokio::test]
async fn last_proposal_wins() {
    let t = test_assistant();
    t.assistant.run_check().await.unwrap();

    t.turn("shutdown").await;
    t.turn("restart").await;
    assert_eq!(t.turn("confirm").await, "Restarting in five seconds.");
    assert_eq!(t.power.actions(), vec!["restart"]);
}

#[tokio::test]
async fn stretch_coach_is_created_and_dispatchable() {
    let t = test_assistant();
    t.assistant.run_check().await.unwrap();

    t.turn("create skill Stretch Coach: reminds me to stretch")
        .await;
    let reply = t.turn("confirm skill changes").await;
    assert!(reply.contains("is live"));

    let manifest = t.dir.path().join("skills").join("stretch_coach.toml");
    assert!(manifest.is_file());

    let skill = t.assistant.registry().find("stretch now").unwrap();
    assert!(skill.metadata().triggers.contains(&"stretch".to_owned()));
    assert!(skill.metadata().triggers.contains(&"coach".to_owned()));

    // Conversational input matching the new trigger is promoted to a command.
    let calls_before = t.llm.calls.load(Ordering::SeqCst);
    let answer = t.turn("coach me through it").await;
    assert_ne!(answer, FALLBACK_RESPONSE);
    assert_eq!(t.llm.calls.load(Ordering::SeqCst), calls_before);
}

#[tokio::test]
async fn conversation_history_feeds_the_model() {
    let t = test_assistant();
    t.assistant.run_check().await.unwrap();

    assert_eq!(t.turn("how is the weather").await, "You said: how is the weather");
    assert_eq!(t.turn("and tomorrow").await, "You said: and tomorrow");

    let log = t.assistant.store().recent_conversation(10).await;
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].assistant, "You said: and tomorrow");
}

#[tokio::test]
async fn dispatch_is_deterministic() {
    let t = test_assistant();
    t.assistant.run_check().await.unwrap();

    let first = t.assistant.registry().find("status report").unwrap();
    for _ in 0..5 {
        let again = t.assistant.registry().find("status report").unwrap();
        assert_eq!(again.name(), first.name());
    }
    assert_eq!(first.name(), "System Status");
}
