//! Routes commands to the first matching skill.

use super::SkillRegistry;
use crate::memory::StateStore;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Response when no skill matches or the matched skill fails.
pub const FALLBACK_RESPONSE: &str = "I'm afraid I can't comply with that request just yet.";

/// Executes commands against the registry, one turn at a time.
pub struct SkillDispatcher {
    registry: Arc<SkillRegistry>,
    store: Arc<StateStore>,
    turn: Mutex<()>,
}

impl SkillDispatcher {
    #[must_use]
    pub fn new(registry: Arc<SkillRegistry>, store: Arc<StateStore>) -> Self {
        Self {
            registry,
            store,
            turn: Mutex::new(()),
        }
    }

    /// Run `text` through the first matching skill.
    ///
    /// Always produces a response: handler errors and panics are logged and
    /// answered with [`FALLBACK_RESPONSE`].
    pub async fn execute(&self, text: &str) -> String {
        let _turn = self.turn.lock().await;

        let Some(skill) = self.registry.find(text) else {
            debug!(text, "no skill matched");
            return FALLBACK_RESPONSE.to_owned();
        };
        let name = skill.name().to_owned();
        info!(skill = %name, "dispatching command");

        match AssertUnwindSafe(skill.handle(text, &self.store))
            .catch_unwind()
            .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(skill = %name, error = %e, "skill failed");
                FALLBACK_RESPONSE.to_owned()
            }
            Err(_) => {
                error!(skill = %name, "skill panicked");
                FALLBACK_RESPONSE.to_owned()
            }
        }
    }
}
