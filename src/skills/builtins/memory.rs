//! Learns the user's name, preferences, tone, and spoken shortcuts.

use crate::error::Result;
use crate::memory::StateStore;
use crate::skills::{Skill, SkillMetadata};
use async_trait::async_trait;

pub struct MemorySkill {
    meta: SkillMetadata,
}

impl MemorySkill {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: SkillMetadata::new(
                "Memory Management",
                "Learns user details such as name and preferences.",
                [
                    "my name is",
                    "remember",
                    "set preference",
                    "serious mode",
                    "casual mode",
                ],
            ),
        }
    }
}

impl Default for MemorySkill {
    fn default() -> Self {
        Self::new()
    }
}

/// Text after a case-insensitive `prefix`, trimmed.
fn after_prefix<'a>(text: &'a str, prefix: &str) -> &'a str {
    text.get(prefix.len()..).unwrap_or_default().trim()
}

#[async_trait]
impl Skill for MemorySkill {
    fn metadata(&self) -> &SkillMetadata {
        &self.meta
    }

    async fn handle(&self, text: &str, store: &StateStore) -> Result<String> {
        let text = text.trim();
        let lowered = text.to_lowercase();

        if lowered.starts_with("my name is") {
            let name = after_prefix(text, "my name is")
                .split_whitespace()
                .next()
                .map(|w| w.trim_end_matches(|c: char| !c.is_alphanumeric()))
                .unwrap_or_default();
            if name.is_empty() {
                return Ok("I didn't quite catch your name.".to_owned());
            }
            store.remember_name(name).await?;
            return Ok(format!("Understood. I'll remember that your name is {name}."));
        }

        if lowered.starts_with("remember command ") {
            let remainder = after_prefix(text, "remember command");
            if let Some((trigger, action)) = remainder.split_once(" means ") {
                let (trigger, action) = (trigger.trim(), action.trim());
                if !trigger.is_empty() && !action.is_empty() {
                    store.add_custom_command(trigger, action).await?;
                    return Ok(format!(
                        "Noted. When you say '{trigger}', I'll take it to mean '{action}'."
                    ));
                }
            }
            return Ok(
                "Please phrase it as 'remember command lights out means close notepad'.".to_owned(),
            );
        }

        if lowered.starts_with("remember") {
            let remainder = after_prefix(text, "remember");
            if let Some((key, value)) = remainder.split_once(" is ") {
                let (key, value) = (key.trim(), value.trim());
                store.set_preference(key, value).await?;
                return Ok(format!("I'll remember that {key} is {value}."));
            }
            return Ok(
                "Could you rephrase that memory in the format 'remember coffee is black'?"
                    .to_owned(),
            );
        }

        if lowered.starts_with("set preference") {
            let parts: Vec<&str> = lowered.split_whitespace().collect();
            if parts.len() >= 4 {
                let key = parts[2];
                let value = parts[3..].join(" ");
                store.set_preference(key, &value).await?;
                return Ok(format!("Preference updated: {key} is now {value}."));
            }
            return Ok("Please say 'set preference' followed by a name and a value.".to_owned());
        }

        if lowered.contains("serious mode") {
            store.set_preference("tone", "serious").await?;
            return Ok("Switching to a more serious tone.".to_owned());
        }

        if lowered.contains("casual mode") {
            store.set_preference("tone", "casual").await?;
            return Ok("Back to my usual charming self.".to_owned());
        }

        Ok("I'm not sure how to store that memory just yet.".to_owned())
    }
}
