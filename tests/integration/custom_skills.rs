//! Hand-written manifests and the update / rollback round trip.

use crate::helpers::test_assistant;
use jarvis::skills::custom::SkillManifest;

const BARISTA: &str = r#"
name = "Barista"
description = "Coffee advice"
triggers = ["coffee", "espresso"]
response = "A fine choice, {user}."

[[rules]]
contains = "decaf"
reply = "Decaf? Are you feeling well, {user}?"
"#;

#[tokio::test]
async fn manifest_rules_and_templates_apply() {
    let t = test_assistant();
    let skills = t.dir.path().join("skills");
    std::fs::create_dir_all(&skills).unwrap();
    std::fs::write(skills.join("barista.toml"), BARISTA).unwrap();
    std::fs::write(skills.join("broken.toml"), "name = ").unwrap();

    t.assistant.run_check().await.unwrap();
    assert!(
        t.assistant
            .registry()
            .skill_names()
            .contains(&"Barista".to_owned())
    );

    assert_eq!(t.turn("coffee please").await, "A fine choice, sir.");
    t.turn("my name is Tony").await;
    assert_eq!(
        t.turn("espresso, but decaf").await,
        "Decaf? Are you feeling well, Tony?"
    );
}

#[tokio::test]
async fn update_then_rollback_restores_previous_manifest() {
    let t = test_assistant();
    t.assistant.run_check().await.unwrap();
    let manifest = t.dir.path().join("skills").join("tea_timer.toml");

    t.turn("create skill Tea Timer: times my tea").await;
    t.turn("confirm skill changes").await;
    let original = std::fs::read_to_string(&manifest).unwrap();

    t.turn("improve skill Tea Timer: ring a bell at four minutes")
        .await;
    t.turn("confirm skill changes").await;
    let updated = SkillManifest::parse(&std::fs::read_to_string(&manifest).unwrap()).unwrap();
    assert_eq!(
        updated.pending_instructions,
        vec!["ring a bell at four minutes"]
    );

    t.turn("rollback skill Tea Timer").await;
    assert_eq!(
        t.turn("confirm skill changes").await,
        "The skill 'Tea Timer' has been restored from backup."
    );
    assert_eq!(std::fs::read_to_string(&manifest).unwrap(), original);
}
