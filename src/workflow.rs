//! Two-phase propose / confirm / cancel workflow.
//!
//! A sensitive action is first *proposed*: a typed descriptor is written into
//! a named slot of the persisted workflow state. A later utterance confirms
//! (the slot is consumed and the action performed) or cancels it. Each slot
//! holds at most one proposal; proposing again replaces the previous one.

use crate::error::Result;
use crate::memory::StateStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A proposed sensitive action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PendingAction {
    Shutdown,
    Restart,
    Create {
        name: String,
        description: String,
        triggers: Vec<String>,
    },
    Update {
        name: String,
        instructions: String,
    },
    Rollback {
        name: String,
    },
}

impl PendingAction {
    /// Short lower-case label, as spoken in confirmations.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Shutdown => "shutdown",
            Self::Restart => "restart",
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Rollback { .. } => "rollback",
        }
    }
}

/// A decoded proposal with the time it was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub action: PendingAction,
    pub proposed_at: DateTime<Utc>,
}

/// What a slot currently holds.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotState {
    Idle,
    Proposed(Proposal),
    /// The slot holds a descriptor this build cannot decode.
    Unrecognised(serde_json::Value),
}

impl SlotState {
    fn decode(raw: Option<serde_json::Value>) -> Self {
        match raw {
            None => Self::Idle,
            Some(value) => match serde_json::from_value::<Proposal>(value.clone()) {
                Ok(proposal) => Self::Proposed(proposal),
                Err(e) => {
                    warn!(error = %e, "pending descriptor could not be decoded");
                    Self::Unrecognised(value)
                }
            },
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// A named pending-action slot in the workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSlot {
    key: &'static str,
}

impl PendingSlot {
    /// Power actions awaiting confirmation.
    pub const SYSTEM: Self = Self {
        key: "pending_action",
    };
    /// Skill authoring changes awaiting confirmation.
    pub const SKILL_CHANGE: Self = Self {
        key: "pending_skill_change",
    };

    #[must_use]
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Record `action` in this slot, replacing any earlier proposal.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub async fn propose(&self, store: &StateStore, action: PendingAction) -> Result<()> {
        let proposal = Proposal {
            action,
            proposed_at: Utc::now(),
        };
        info!(slot = self.key, kind = proposal.action.kind(), "action proposed");
        store
            .set_pending(self.key, serde_json::to_value(&proposal)?)
            .await
    }

    pub async fn current(&self, store: &StateStore) -> SlotState {
        SlotState::decode(store.pending(self.key).await)
    }

    /// Drop whatever the slot holds. Returns whether anything was there.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub async fn clear(&self, store: &StateStore) -> Result<bool> {
        let cleared = store.clear_pending(self.key).await?;
        if cleared {
            info!(slot = self.key, "pending action cleared");
        }
        Ok(cleared)
    }

    /// Consume the slot's proposal.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub async fn take(&self, store: &StateStore) -> Result<SlotState> {
        Ok(SlotState::decode(store.take_pending(self.key).await?))
    }
}
