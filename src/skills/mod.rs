//! Skills: pluggable handlers selected by trigger prefix.
//!
//! Skills come from two sources, loaded in this order:
//! 1. Built-in skills compiled into the binary (see [`builtins`]).
//! 2. User-authored TOML manifests in the custom skills directory (see
//!    [`custom`]), interpreted by a small rule engine.
//!
//! The [`SkillRegistry`] holds them in registration order and the
//! [`SkillDispatcher`] routes each command to the first skill whose trigger
//! prefixes match.

pub mod builtins;
pub mod custom;
mod dispatch;
mod registry;

pub use dispatch::{FALLBACK_RESPONSE, SkillDispatcher};
pub use registry::{BuiltinSource, SkillFactory, SkillRegistry, SkillSource};

use crate::error::{AssistantError, Result};
use crate::memory::StateStore;
use async_trait::async_trait;
use std::sync::{Arc, Weak};

/// A skill's identity: fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillMetadata {
    pub name: String,
    pub description: String,
    /// Lower-case prefixes that select this skill.
    pub triggers: Vec<String>,
}

impl SkillMetadata {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        triggers: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            triggers: triggers
                .into_iter()
                .map(|t| t.into().to_lowercase())
                .collect(),
        }
    }

    /// Whether the lower-cased input starts with any trigger.
    #[must_use]
    pub fn matches_prefix(&self, text: &str) -> bool {
        let lowered = text.trim_start().to_lowercase();
        self.triggers
            .iter()
            .any(|t| !t.is_empty() && lowered.starts_with(t.as_str()))
    }

    /// Like [`matches_prefix`](Self::matches_prefix), but the trigger must
    /// end on a word boundary, so `memory` does not select `memoryless`.
    #[must_use]
    pub fn matches_word(&self, text: &str) -> bool {
        let lowered = text.trim_start().to_lowercase();
        self.triggers.iter().any(|t| {
            !t.is_empty()
                && lowered
                    .strip_prefix(t.as_str())
                    .is_some_and(|rest| !rest.starts_with(char::is_alphanumeric))
        })
    }
}

/// A command handler.
///
/// Skills hold no per-turn state of their own; anything that must survive
/// between turns goes through the [`StateStore`].
#[async_trait]
pub trait Skill: Send + Sync {
    fn metadata(&self) -> &SkillMetadata;

    fn name(&self) -> &str {
        &self.metadata().name
    }

    fn matches(&self, text: &str) -> bool {
        self.metadata().matches_prefix(text)
    }

    /// Produce the spoken response for `text`.
    async fn handle(&self, text: &str, store: &StateStore) -> Result<String>;

    /// Called once at registration for skills that manage other skills.
    fn attach_registry(&self, _registry: Weak<SkillRegistry>) {}
}

/// Shared handle to a registered skill.
pub type SkillRef = Arc<dyn Skill>;

/// File stem for a skill name: lower-cased words joined by `_`.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Check that a slug is safe to use as a file stem.
///
/// # Errors
///
/// Returns an error if the slug is empty or has characters other than
/// lower-case ASCII letters, digits, `-`, or `_`.
pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.trim().is_empty() {
        return Err(AssistantError::Skill("skill name cannot be empty".to_owned()));
    }
    if !slug
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_')
    {
        return Err(AssistantError::Skill(format!(
            "skill name `{slug}` is invalid (use letters, digits, - or _)"
        )));
    }
    Ok(())
}
