//! User-authored skills described by TOML manifests.
//!
//! Each `<slug>.toml` file in the custom skills directory defines one skill:
//!
//! ```toml
//! name = "Stretch Coach"
//! description = "reminds me to stretch"
//! triggers = ["stretch", "coach"]
//! response = "Time to stand up and stretch, {user}."
//! pending_instructions = ["also suggest a glass of water"]
//!
//! [[rules]]
//! contains = "neck"
//! reply = "Roll your shoulders slowly, {user}."
//! ```
//!
//! Replies are templates: `{input}` expands to the utterance and `{user}` to
//! the remembered name, or "sir" when none is known.

use super::{Skill, SkillMetadata, SkillRef, SkillSource};
use crate::error::{AssistantError, Result};
use crate::memory::StateStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reply used by freshly created skills.
pub const DEFAULT_RESPONSE: &str =
    "This is a freshly minted skill. Please customise its behaviour, sir.";

/// A conditional reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRule {
    /// Lower-case substring the input must contain.
    pub contains: String,
    pub reply: String,
}

/// On-disk description of a custom skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillManifest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub triggers: Vec<String>,
    #[serde(default = "default_response")]
    pub response: String,
    /// Change requests staged for whoever maintains this skill.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<ReplyRule>,
}

fn default_response() -> String {
    DEFAULT_RESPONSE.to_owned()
}

impl SkillManifest {
    /// Template for a newly created skill.
    #[must_use]
    pub fn scaffold(name: &str, description: &str, triggers: Vec<String>) -> Self {
        Self {
            name: name.to_owned(),
            description: description.to_owned(),
            triggers,
            response: default_response(),
            pending_instructions: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the text is not a valid manifest.
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self =
            toml::from_str(content).map_err(|e| AssistantError::Skill(format!("invalid manifest: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AssistantError::Skill(format!("cannot serialize manifest: {e}")))
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AssistantError::Skill("manifest name is empty".to_owned()));
        }
        if !self.triggers.iter().any(|t| !t.trim().is_empty()) {
            return Err(AssistantError::Skill(format!(
                "manifest `{}` declares no triggers",
                self.name
            )));
        }
        Ok(())
    }

    /// Pick and render the reply for `input`.
    #[must_use]
    pub fn reply_for(&self, input: &str, user: Option<&str>) -> String {
        let lowered = input.to_lowercase();
        let template = self
            .rules
            .iter()
            .find(|rule| !rule.contains.is_empty() && lowered.contains(&rule.contains.to_lowercase()))
            .map_or(self.response.as_str(), |rule| rule.reply.as_str());
        render(template, input, user)
    }
}

/// Expand `{input}` and `{user}` in a reply template.
#[must_use]
pub fn render(template: &str, input: &str, user: Option<&str>) -> String {
    template
        .replace("{user}", user.unwrap_or("sir"))
        .replace("{input}", input)
}

/// Manifest path for a skill slug.
#[must_use]
pub fn manifest_path(dir: &Path, slug: &str) -> PathBuf {
    dir.join(format!("{slug}.toml"))
}

/// Backup path kept next to a manifest.
#[must_use]
pub fn backup_path(manifest: &Path) -> PathBuf {
    manifest.with_extension("bak")
}

/// A skill interpreted from a [`SkillManifest`].
pub struct CustomSkill {
    meta: SkillMetadata,
    manifest: SkillManifest,
}

impl CustomSkill {
    #[must_use]
    pub fn new(manifest: SkillManifest) -> Self {
        let meta = SkillMetadata::new(
            manifest.name.clone(),
            manifest.description.clone(),
            manifest.triggers.iter().map(|t| t.trim().to_owned()),
        );
        Self { meta, manifest }
    }
}

#[async_trait]
impl Skill for CustomSkill {
    fn metadata(&self) -> &SkillMetadata {
        &self.meta
    }

    async fn handle(&self, text: &str, store: &StateStore) -> Result<String> {
        let user = store.user_profile().await.name;
        Ok(self.manifest.reply_for(text, user.as_deref()))
    }
}

/// Loads every `*.toml` manifest in a directory, in file-name order.
pub struct CustomSkillSource {
    dir: PathBuf,
}

impl CustomSkillSource {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SkillSource for CustomSkillSource {
    fn name(&self) -> &str {
        "custom"
    }

    fn load(&self) -> Result<Vec<SkillRef>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "custom skills directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        let mut skills = Vec::with_capacity(paths.len());
        for path in paths {
            let parsed = std::fs::read_to_string(&path)
                .map_err(AssistantError::from)
                .and_then(|content| SkillManifest::parse(&content));
            match parsed {
                Ok(manifest) => skills.push(Arc::new(CustomSkill::new(manifest)) as SkillRef),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping custom skill"),
            }
        }
        Ok(skills)
    }
}
