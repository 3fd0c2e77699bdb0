//! Captures the screen or webcam and describes what it sees.

use crate::error::Result;
use crate::memory::StateStore;
use crate::skills::{Skill, SkillMetadata};
use crate::vision::{ImageCapture, describe_image};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub struct VisionSkill {
    meta: SkillMetadata,
    capture: Arc<dyn ImageCapture>,
}

impl VisionSkill {
    #[must_use]
    pub fn new(capture: Arc<dyn ImageCapture>) -> Self {
        Self {
            meta: SkillMetadata::new(
                "Vision",
                "Captures the screen or webcam and provides a lightweight description.",
                ["grab screen", "screenshot", "webcam", "what do you see"],
            ),
            capture,
        }
    }
}

#[async_trait]
impl Skill for VisionSkill {
    fn metadata(&self) -> &SkillMetadata {
        &self.meta
    }

    async fn handle(&self, text: &str, _store: &StateStore) -> Result<String> {
        let lowered = text.to_lowercase();

        if lowered.contains("screen") {
            return match self.capture.capture_screen().await {
                Ok(path) => Ok(format!(
                    "I've captured the screen to {}. {}",
                    path.display(),
                    describe_image(&path).await
                )),
                Err(e) => {
                    warn!(error = %e, "screen capture failed");
                    Ok("I couldn't capture the screen just now.".to_owned())
                }
            };
        }

        if lowered.contains("webcam") || lowered.contains("what do you see") {
            return match self.capture.capture_webcam().await? {
                Some(path) => Ok(format!(
                    "Webcam snapshot saved to {}. {}",
                    path.display(),
                    describe_image(&path).await
                )),
                None => Ok("I couldn't access the webcam.".to_owned()),
            };
        }

        Ok("I'm not sure which image you'd like me to capture.".to_owned())
    }
}
