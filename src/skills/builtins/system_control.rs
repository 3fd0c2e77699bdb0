//! Opens and closes whitelisted applications and folders, and proposes
//! power actions for confirmation.

use crate::config::SystemControlConfig;
use crate::error::Result;
use crate::memory::StateStore;
use crate::skills::{Skill, SkillMetadata};
use crate::system_control::SystemActions;
use crate::workflow::{PendingAction, PendingSlot};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub struct SystemControlSkill {
    meta: SkillMetadata,
    system: Arc<dyn SystemActions>,
    whitelist: SystemControlConfig,
}

impl SystemControlSkill {
    #[must_use]
    pub fn new(system: Arc<dyn SystemActions>, whitelist: SystemControlConfig) -> Self {
        Self {
            meta: SkillMetadata::new(
                "System Control",
                "Opens and closes whitelisted desktop applications and folders.",
                ["open", "launch", "close", "shutdown", "restart"],
            ),
            system,
            whitelist,
        }
    }

    async fn propose_power(&self, lowered: &str, store: &StateStore) -> Result<String> {
        let action = if lowered.starts_with("shutdown") {
            PendingAction::Shutdown
        } else {
            PendingAction::Restart
        };
        let kind = action.kind();
        PendingSlot::SYSTEM.propose(store, action).await?;
        Ok(format!(
            "A {kind} is a serious step. Please confirm by saying 'Jarvis confirm {kind}' \
or cancel by saying 'Jarvis cancel action'."
        ))
    }

    async fn launch(&self, lowered: &str) -> Result<String> {
        let Some((friendly, path)) = whitelisted(&self.whitelist.applications, lowered) else {
            return Ok("I'm afraid that application isn't on my approved list.".to_owned());
        };
        if !exists(path).await {
            return Ok(format!("I cannot find {friendly} at the expected location."));
        }
        info!(app = friendly, "launching whitelisted application");
        self.system.launch(path).await?;
        Ok(format!("Launching {friendly} now."))
    }

    async fn close(&self, lowered: &str) -> Result<String> {
        let Some((friendly, path)) = whitelisted(&self.whitelist.applications, lowered) else {
            return Ok("I don't have clearance to close that application.".to_owned());
        };
        let Some(process) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(format!("I can't tell which process runs {friendly}."));
        };
        self.system.close(process).await?;
        Ok(format!("I've attempted to close {friendly}."))
    }

    async fn open_folder(&self, lowered: &str) -> Result<String> {
        let Some((friendly, path)) = whitelisted(&self.whitelist.folders, lowered) else {
            return Ok("That folder isn't in my directory whitelist, sorry.".to_owned());
        };
        if !exists(path).await {
            return Ok(format!("The {friendly} directory is missing."));
        }
        self.system.open_folder(path).await?;
        Ok(format!("Opening your {friendly}."))
    }
}

/// First whitelist entry whose friendly name occurs in the input.
fn whitelisted<'a>(
    list: &'a BTreeMap<String, PathBuf>,
    lowered: &str,
) -> Option<(&'a str, &'a Path)> {
    list.iter()
        .find(|(friendly, _)| lowered.contains(friendly.to_lowercase().as_str()))
        .map(|(friendly, path)| (friendly.as_str(), path.as_path()))
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[async_trait]
impl Skill for SystemControlSkill {
    fn metadata(&self) -> &SkillMetadata {
        &self.meta
    }

    async fn handle(&self, text: &str, store: &StateStore) -> Result<String> {
        let lowered = text.trim().to_lowercase();

        if lowered.starts_with("shutdown") || lowered.starts_with("restart") {
            return self.propose_power(&lowered, store).await;
        }
        if lowered.starts_with("open folder") {
            return self.open_folder(&lowered).await;
        }
        if lowered.starts_with("open") || lowered.starts_with("launch") {
            return self.launch(&lowered).await;
        }
        if lowered.starts_with("close") {
            return self.close(&lowered).await;
        }
        Ok("That command isn't mapped yet, sir.".to_owned())
    }
}
