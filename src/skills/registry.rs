//! Ordered skill registry with full reload.

use super::{SkillRef, builtins::SkillDeps};
use crate::error::{AssistantError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// A named location skills are loaded from.
pub trait SkillSource: Send + Sync {
    fn name(&self) -> &str;

    /// Instantiate every skill this source provides, in registration order.
    fn load(&self) -> Result<Vec<SkillRef>>;
}

/// Constructor for a compiled-in skill.
pub type SkillFactory = fn(&SkillDeps) -> SkillRef;

/// Compiled-in skills, built from an explicit ordered factory list.
pub struct BuiltinSource {
    deps: SkillDeps,
    factories: Vec<SkillFactory>,
}

impl BuiltinSource {
    #[must_use]
    pub fn new(deps: SkillDeps, factories: Vec<SkillFactory>) -> Self {
        Self { deps, factories }
    }
}

impl SkillSource for BuiltinSource {
    fn name(&self) -> &str {
        "builtin"
    }

    fn load(&self) -> Result<Vec<SkillRef>> {
        Ok(self.factories.iter().map(|make| make(&self.deps)).collect())
    }
}

/// The live set of skills, in first-match-wins order.
pub struct SkillRegistry {
    sources: Vec<Arc<dyn SkillSource>>,
    custom_dir: PathBuf,
    skills: RwLock<Vec<SkillRef>>,
}

impl SkillRegistry {
    /// Create an empty registry. Call [`SkillRegistry::load_all`] to populate it.
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn SkillSource>>, custom_dir: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            sources,
            custom_dir: custom_dir.into(),
            skills: RwLock::new(Vec::new()),
        })
    }

    /// Directory that user-authored skills are written to.
    #[must_use]
    pub fn custom_dir(&self) -> &Path {
        &self.custom_dir
    }

    /// Replace the registry contents with a fresh load of every source.
    ///
    /// A source that fails is skipped with a warning. Returns the number of
    /// skills registered.
    ///
    /// # Errors
    ///
    /// Returns an error only if the loading task itself could not run.
    pub async fn load_all(self: &Arc<Self>) -> Result<usize> {
        let sources = self.sources.clone();
        let loaded = tokio::task::spawn_blocking(move || {
            let mut skills = Vec::new();
            for source in &sources {
                match source.load() {
                    Ok(mut found) => {
                        debug!(source = source.name(), count = found.len(), "skill source loaded");
                        skills.append(&mut found);
                    }
                    Err(e) => {
                        warn!(source = source.name(), error = %e, "skipping skill source");
                    }
                }
            }
            skills
        })
        .await
        .map_err(|e| AssistantError::Skill(format!("skill loading task failed: {e}")))?;

        for skill in &loaded {
            skill.attach_registry(Arc::downgrade(self));
        }

        let count = loaded.len();
        match self.skills.write() {
            Ok(mut skills) => *skills = loaded,
            Err(poisoned) => *poisoned.into_inner() = loaded,
        }
        info!(count, "skill registry loaded");
        Ok(count)
    }

    fn read(&self) -> Vec<SkillRef> {
        match self.skills.read() {
            Ok(skills) => skills.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// First registered skill whose triggers match `text`.
    #[must_use]
    pub fn find(&self, text: &str) -> Option<SkillRef> {
        self.read().into_iter().find(|skill| skill.matches(text))
    }

    /// First registered skill with a trigger that matches `text` as whole
    /// words.
    #[must_use]
    pub fn find_word(&self, text: &str) -> Option<SkillRef> {
        self.read()
            .into_iter()
            .find(|skill| skill.matches(text) && skill.metadata().matches_word(text))
    }

    /// Registered skill names, in order.
    #[must_use]
    pub fn skill_names(&self) -> Vec<String> {
        self.read()
            .iter()
            .map(|skill| skill.name().to_owned())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
