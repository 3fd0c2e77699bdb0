//! Reports CPU, memory, and battery levels.

use crate::error::Result;
use crate::memory::StateStore;
use crate::skills::{Skill, SkillMetadata};
use crate::system_monitor::MetricsSampler;
use async_trait::async_trait;
use std::sync::Arc;

pub struct StatusSkill {
    meta: SkillMetadata,
    metrics: Arc<dyn MetricsSampler>,
}

impl StatusSkill {
    #[must_use]
    pub fn new(metrics: Arc<dyn MetricsSampler>) -> Self {
        Self {
            meta: SkillMetadata::new(
                "System Status",
                "Reports CPU usage, memory consumption, and battery level.",
                ["status", "cpu", "memory", "battery", "monitor"],
            ),
            metrics,
        }
    }
}

#[async_trait]
impl Skill for StatusSkill {
    fn metadata(&self) -> &SkillMetadata {
        &self.meta
    }

    async fn handle(&self, _text: &str, _store: &StateStore) -> Result<String> {
        let snapshot = match self.metrics.latest().await {
            Some(snapshot) => snapshot,
            None => self.metrics.sample().await?,
        };
        Ok(snapshot.describe())
    }
}
