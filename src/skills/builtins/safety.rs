//! Confirms or cancels pending power actions.

use crate::error::Result;
use crate::memory::StateStore;
use crate::skills::{Skill, SkillMetadata};
use crate::system_control::{PowerAction, SystemActions};
use crate::workflow::{PendingAction, PendingSlot, SlotState};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub const NOTHING_PENDING: &str = "There's nothing awaiting confirmation, sir.";
pub const CANCELLED: &str = "Understood. I've cancelled the pending action.";
pub const MISMATCH: &str = "The requested confirmation doesn't match the pending action.";

pub struct SafetyConfirmationSkill {
    meta: SkillMetadata,
    system: Arc<dyn SystemActions>,
}

impl SafetyConfirmationSkill {
    #[must_use]
    pub fn new(system: Arc<dyn SystemActions>) -> Self {
        Self {
            meta: SkillMetadata::new(
                "Safety Confirmation",
                "Handles confirmations for sensitive system actions.",
                ["jarvis confirm", "confirm", "jarvis cancel", "cancel"],
            ),
            system,
        }
    }
}

/// The power action named after "confirm", if any.
fn named_action(lowered: &str) -> Option<&'static str> {
    let rest = lowered.split_once("confirm").map_or("", |(_, rest)| rest);
    ["shutdown", "restart"]
        .into_iter()
        .find(|kind| rest.contains(kind))
}

#[async_trait]
impl Skill for SafetyConfirmationSkill {
    fn metadata(&self) -> &SkillMetadata {
        &self.meta
    }

    async fn handle(&self, text: &str, store: &StateStore) -> Result<String> {
        let lowered = text.to_lowercase();
        let slot = PendingSlot::SYSTEM;
        let state = slot.current(store).await;
        if state.is_idle() {
            return Ok(NOTHING_PENDING.to_owned());
        }

        if lowered.contains("cancel") {
            slot.clear(store).await?;
            return Ok(CANCELLED.to_owned());
        }

        if !lowered.contains("confirm") {
            return Ok(MISMATCH.to_owned());
        }

        let (power, message) = match state {
            SlotState::Proposed(proposal) => match proposal.action {
                PendingAction::Shutdown => (PowerAction::Shutdown, "Shutting down in five seconds."),
                PendingAction::Restart => (PowerAction::Restart, "Restarting in five seconds."),
                _ => return Ok(MISMATCH.to_owned()),
            },
            SlotState::Unrecognised(_) | SlotState::Idle => return Ok(MISMATCH.to_owned()),
        };
        if named_action(&lowered).is_some_and(|named| named != power.as_str()) {
            return Ok(MISMATCH.to_owned());
        }

        slot.clear(store).await?;
        warn!(action = power.as_str(), "executing confirmed power action");
        self.system.power(power).await?;
        Ok(message.to_owned())
    }
}
