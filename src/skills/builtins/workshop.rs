//! Skill workshop: create, update, and roll back user-authored skills.
//!
//! Every change goes through the [`PendingSlot::SKILL_CHANGE`] slot. A
//! request is staged first and only applied by "confirm skill changes";
//! "cancel skill changes" discards it. After a commit the registry is
//! reloaded so the change is live on the next turn.
//!
//! Updates keep a single `.bak` generation per skill, recorded in the
//! workflow history so a later rollback can restore it.

use crate::error::Result;
use crate::memory::{StateStore, write_atomic};
use crate::skills::custom::{SkillManifest, backup_path, manifest_path};
use crate::skills::{Skill, SkillMetadata, SkillRegistry, slugify, validate_slug};
use crate::workflow::{PendingAction, PendingSlot, SlotState};
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex, Weak};
use tracing::{info, warn};

const CONFIRM_HINT: &str =
    "Say 'confirm skill changes' when you're happy, or 'cancel skill changes' to abort.";

pub struct SkillWorkshop {
    meta: SkillMetadata,
    registry: Mutex<Weak<SkillRegistry>>,
}

impl SkillWorkshop {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: SkillMetadata::new(
                "Skill Development",
                "Guides the creation, update, and rollback of custom skills.",
                [
                    "create skill",
                    "improve skill",
                    "rollback skill",
                    "confirm skill",
                    "cancel skill",
                ],
            ),
            registry: Mutex::new(Weak::new()),
        }
    }

    fn registry(&self) -> Option<Arc<SkillRegistry>> {
        self.registry.lock().ok().and_then(|weak| weak.upgrade())
    }

    async fn propose_create(&self, payload: Option<&str>, store: &StateStore) -> Result<String> {
        let Some(payload) = payload else {
            return Ok("Please specify the skill name and purpose, for example \
'create skill Stretch Coach: reminds me to stretch'."
                .to_owned());
        };
        let (name, description) = match payload.split_once(':') {
            Some((name, description)) => (name.trim(), description.trim()),
            None => match payload.split_once(' ') {
                Some((name, description)) => (name, description.trim()),
                None => (payload, "Custom Jarvis skill."),
            },
        };
        if let Err(e) = validate_slug(&slugify(name)) {
            return Ok(format!("I can't create that skill: {e}."));
        }

        let triggers = name.split_whitespace().map(str::to_lowercase).collect();
        PendingSlot::SKILL_CHANGE
            .propose(
                store,
                PendingAction::Create {
                    name: name.to_owned(),
                    description: description.to_owned(),
                    triggers,
                },
            )
            .await?;
        Ok(format!("Blueprint ready for skill '{name}'. {CONFIRM_HINT}"))
    }

    async fn propose_update(&self, payload: Option<&str>, store: &StateStore) -> Result<String> {
        let Some(payload) = payload else {
            return Ok("Please specify which skill to improve, e.g. \
'improve skill stretch coach: suggest a glass of water'."
                .to_owned());
        };
        let (name, instructions) = match payload.split_once(':') {
            Some((name, instructions)) => (name.trim(), instructions.trim()),
            None => (payload, "No additional guidance supplied."),
        };
        if let Err(e) = validate_slug(&slugify(name)) {
            return Ok(format!("I can't update that skill: {e}."));
        }

        PendingSlot::SKILL_CHANGE
            .propose(
                store,
                PendingAction::Update {
                    name: name.to_owned(),
                    instructions: instructions.to_owned(),
                },
            )
            .await?;
        Ok(format!("Update plan drafted for '{name}'. {CONFIRM_HINT}"))
    }

    async fn propose_rollback(&self, payload: Option<&str>, store: &StateStore) -> Result<String> {
        let Some(name) = payload else {
            return Ok(
                "Please specify the skill to roll back, for example 'rollback skill stretch coach'."
                    .to_owned(),
            );
        };
        if self.registry().is_none() {
            return Ok("Skill management subsystems aren't ready for rollbacks yet.".to_owned());
        }
        if !has_backup(store, &slugify(name)).await {
            return Ok("I can't find an archived version of that skill.".to_owned());
        }

        PendingSlot::SKILL_CHANGE
            .propose(
                store,
                PendingAction::Rollback {
                    name: name.to_owned(),
                },
            )
            .await?;
        Ok(format!("Rollback prepared for '{name}'. {CONFIRM_HINT}"))
    }

    async fn commit(&self, store: &StateStore) -> Result<String> {
        let slot = PendingSlot::SKILL_CHANGE;
        let proposal = match slot.current(store).await {
            SlotState::Idle => return Ok("There's no skill work awaiting confirmation.".to_owned()),
            SlotState::Proposed(proposal) => Some(proposal),
            SlotState::Unrecognised(_) => None,
        };

        let registry = self.registry();
        let message = match (proposal.map(|p| p.action), &registry) {
            (Some(_), None) => {
                "Skill management isn't initialised, so I can't change skills just yet.".to_owned()
            }
            (Some(action), Some(registry)) => {
                let dir = registry.custom_dir();
                let applied = match &action {
                    PendingAction::Create {
                        name,
                        description,
                        triggers,
                    } => create(dir, name, description, triggers).await,
                    PendingAction::Update { name, instructions } => {
                        update(dir, name, instructions, store).await
                    }
                    PendingAction::Rollback { name } => rollback(dir, name, store).await,
                    PendingAction::Shutdown | PendingAction::Restart => {
                        Ok("I couldn't identify the pending skill action.".to_owned())
                    }
                };
                applied.unwrap_or_else(|e| {
                    warn!(kind = action.kind(), error = %e, "skill change failed");
                    format!("I couldn't complete that skill change: {e}.")
                })
            }
            (None, _) => "I couldn't identify the pending skill action.".to_owned(),
        };

        slot.clear(store).await?;
        if let Some(registry) = registry
            && let Err(e) = registry.load_all().await
        {
            warn!(error = %e, "skill registry reload failed");
        }
        Ok(message)
    }
}

impl Default for SkillWorkshop {
    fn default() -> Self {
        Self::new()
    }
}

async fn has_backup(store: &StateStore, slug: &str) -> bool {
    match store.skill_backup(slug).await {
        Some(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
        None => false,
    }
}

async fn create(dir: &Path, name: &str, description: &str, triggers: &[String]) -> Result<String> {
    let slug = slugify(name);
    validate_slug(&slug)?;
    let path = manifest_path(dir, &slug);
    if tokio::fs::try_exists(&path).await? {
        tokio::fs::copy(&path, backup_path(&path)).await?;
    }
    let manifest = SkillManifest::scaffold(name, description, triggers.to_vec());
    write_atomic(&path, &manifest.to_toml()?).await?;
    info!(skill = name, path = %path.display(), "custom skill created");
    Ok(format!(
        "The skill '{name}' is live. I've routed it through the custom skill loader."
    ))
}

async fn update(dir: &Path, name: &str, instructions: &str, store: &StateStore) -> Result<String> {
    let slug = slugify(name);
    validate_slug(&slug)?;
    let path = manifest_path(dir, &slug);
    if !tokio::fs::try_exists(&path).await? {
        return Ok("I couldn't locate that skill for updating.".to_owned());
    }

    let backup = backup_path(&path);
    tokio::fs::copy(&path, &backup).await?;
    store.record_skill_backup(&slug, &backup).await?;

    let mut manifest = SkillManifest::parse(&tokio::fs::read_to_string(&path).await?)?;
    manifest.pending_instructions.push(instructions.to_owned());
    write_atomic(&path, &manifest.to_toml()?).await?;
    info!(skill = name, backup = %backup.display(), "custom skill update staged");
    Ok(format!(
        "I've appended guidance to '{name}'. Please apply the changes to its manifest and I'll pick them up on the next reload."
    ))
}

async fn rollback(dir: &Path, name: &str, store: &StateStore) -> Result<String> {
    let slug = slugify(name);
    let Some(backup) = store.skill_backup(&slug).await else {
        return Ok("I can't find an archived version of that skill.".to_owned());
    };
    if !tokio::fs::try_exists(&backup).await? {
        return Ok("I can't find an archived version of that skill.".to_owned());
    }
    let content = tokio::fs::read_to_string(&backup).await?;
    write_atomic(&manifest_path(dir, &slug), &content).await?;
    info!(skill = name, backup = %backup.display(), "custom skill restored");
    Ok(format!("The skill '{name}' has been restored from backup."))
}

/// Everything after the two-word trigger, if non-empty.
fn payload(text: &str) -> Option<&str> {
    text.trim()
        .splitn(3, char::is_whitespace)
        .nth(2)
        .map(str::trim)
        .filter(|rest| !rest.is_empty())
}

#[async_trait]
impl Skill for SkillWorkshop {
    fn metadata(&self) -> &SkillMetadata {
        &self.meta
    }

    async fn handle(&self, text: &str, store: &StateStore) -> Result<String> {
        let lowered = text.trim().to_lowercase();
        if lowered.starts_with("create skill") {
            return self.propose_create(payload(text), store).await;
        }
        if lowered.starts_with("improve skill") {
            return self.propose_update(payload(text), store).await;
        }
        if lowered.starts_with("rollback skill") {
            return self.propose_rollback(payload(text), store).await;
        }
        if lowered.starts_with("confirm skill") {
            return self.commit(store).await;
        }
        if lowered.starts_with("cancel skill") {
            PendingSlot::SKILL_CHANGE.clear(store).await?;
            return Ok("Pending skill changes have been cancelled.".to_owned());
        }
        Ok("I didn't recognise that instruction in the skill workshop.".to_owned())
    }

    fn attach_registry(&self, registry: Weak<SkillRegistry>) {
        if let Ok(mut slot) = self.registry.lock() {
            *slot = registry;
        }
    }
}
