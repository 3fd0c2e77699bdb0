//! JSON-backed persistent state for the assistant.
//!
//! A single document holds the user profile, the bounded conversation log,
//! and the workflow state used by two-phase skills. Every mutator updates the
//! in-memory document and flushes it before returning, all under one lock, so
//! exactly one read-modify-serialize-write sequence is in flight at a time.

use crate::error::{AssistantError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Upper bound on retained conversation exchanges.
pub const MAX_CONVERSATION_ENTRIES: usize = 50;

/// What the assistant knows about its user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub name: Option<String>,
    pub preferences: BTreeMap<String, String>,
    pub custom_commands: BTreeMap<String, String>,
}

/// One user/assistant exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub user: String,
    pub assistant: String,
}

/// Short-lived state owned by two-phase workflows.
///
/// Kept apart from [`UserProfile::preferences`] so that user settings and
/// in-flight proposals never share a namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowState {
    /// Pending proposals keyed by slot name.
    pub pending: BTreeMap<String, serde_json::Value>,
    /// Most recent backup per custom skill slug.
    pub skill_history: BTreeMap<String, PathBuf>,
}

/// The full persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub user: UserProfile,
    pub conversation_log: Vec<ConversationEntry>,
    pub workflow: WorkflowState,
}

impl PersistedState {
    /// Append an exchange, evicting the oldest entries past the cap.
    pub fn push_conversation(&mut self, entry: ConversationEntry) {
        self.conversation_log.push(entry);
        self.truncate_conversation();
    }

    fn truncate_conversation(&mut self) {
        let len = self.conversation_log.len();
        if len > MAX_CONVERSATION_ENTRIES {
            self.conversation_log.drain(..len - MAX_CONVERSATION_ENTRIES);
        }
    }
}

/// Owner of the persisted document.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: Mutex<PersistedState>,
}

impl StateStore {
    /// Create a store backed by `path`. Nothing is read until [`StateStore::load`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(PersistedState::default()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hydrate from the backing file.
    ///
    /// A missing file is created with an empty document. An unreadable or
    /// unparseable file is logged and replaced in memory by an empty state.
    ///
    /// # Errors
    ///
    /// Returns an error only if the initial empty document cannot be written.
    pub async fn load(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => match serde_json::from_str::<PersistedState>(&content) {
                Ok(mut loaded) => {
                    loaded.truncate_conversation();
                    info!(path = %self.path.display(), "loaded assistant memory");
                    *state = loaded;
                }
                Err(e) => {
                    error!(path = %self.path.display(), error = %e, "failed to parse memory file, starting empty");
                    *state = PersistedState::default();
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "memory file not found, creating a new one");
                *state = PersistedState::default();
                self.write_locked(&state).await?;
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "failed to read memory file, starting empty");
                *state = PersistedState::default();
            }
        }
        Ok(())
    }

    /// Serialize the full document and replace the backing file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn flush(&self) -> Result<()> {
        let state = self.state.lock().await;
        self.write_locked(&state).await
    }

    async fn write_locked(&self, state: &PersistedState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        write_atomic(&self.path, &json).await.map_err(|e| {
            AssistantError::Memory(format!("failed to persist {}: {e}", self.path.display()))
        })?;
        debug!("persisted memory state");
        Ok(())
    }

    async fn mutate<R>(&self, f: impl FnOnce(&mut PersistedState) -> R) -> Result<R> {
        let mut state = self.state.lock().await;
        let out = f(&mut state);
        self.write_locked(&state).await?;
        Ok(out)
    }

    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub async fn remember_name(&self, name: &str) -> Result<()> {
        let name = name.to_owned();
        self.mutate(move |s| s.user.name = Some(name)).await
    }

    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub async fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        let (key, value) = (key.to_owned(), value.to_owned());
        self.mutate(move |s| {
            s.user.preferences.insert(key, value);
        })
        .await
    }

    /// Register a spoken shortcut. Triggers are stored lower-cased.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub async fn add_custom_command(&self, trigger: &str, action: &str) -> Result<()> {
        let (trigger, action) = (trigger.to_lowercase(), action.to_owned());
        self.mutate(move |s| {
            s.user.custom_commands.insert(trigger, action);
        })
        .await
    }

    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub async fn append_conversation(&self, user: &str, assistant: &str) -> Result<()> {
        let entry = ConversationEntry {
            user: user.to_owned(),
            assistant: assistant.to_owned(),
        };
        self.mutate(move |s| s.push_conversation(entry)).await
    }

    pub async fn snapshot(&self) -> PersistedState {
        self.state.lock().await.clone()
    }

    pub async fn user_profile(&self) -> UserProfile {
        self.state.lock().await.user.clone()
    }

    pub async fn preference(&self, key: &str) -> Option<String> {
        self.state.lock().await.user.preferences.get(key).cloned()
    }

    /// The action registered for a spoken shortcut, matched case-insensitively.
    pub async fn custom_command(&self, trigger: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .user
            .custom_commands
            .get(&trigger.trim().to_lowercase())
            .cloned()
    }

    /// The last `n` exchanges, oldest first.
    pub async fn recent_conversation(&self, n: usize) -> Vec<ConversationEntry> {
        let state = self.state.lock().await;
        let skip = state.conversation_log.len().saturating_sub(n);
        state.conversation_log[skip..].to_vec()
    }

    pub async fn pending(&self, slot: &str) -> Option<serde_json::Value> {
        self.state.lock().await.workflow.pending.get(slot).cloned()
    }

    /// Store a proposal, replacing whatever the slot held.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub async fn set_pending(&self, slot: &str, value: serde_json::Value) -> Result<()> {
        let slot = slot.to_owned();
        self.mutate(move |s| {
            s.workflow.pending.insert(slot, value);
        })
        .await
    }

    /// Remove a slot's proposal. Returns whether one was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub async fn clear_pending(&self, slot: &str) -> Result<bool> {
        Ok(self.take_pending(slot).await?.is_some())
    }

    /// Remove and return a slot's proposal.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub async fn take_pending(&self, slot: &str) -> Result<Option<serde_json::Value>> {
        self.mutate(|s| s.workflow.pending.remove(slot)).await
    }

    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub async fn record_skill_backup(&self, slug: &str, backup: &Path) -> Result<()> {
        let (slug, backup) = (slug.to_owned(), backup.to_path_buf());
        self.mutate(move |s| {
            s.workflow.skill_history.insert(slug, backup);
        })
        .await
    }

    pub async fn skill_backup(&self, slug: &str) -> Option<PathBuf> {
        self.state
            .lock()
            .await
            .workflow
            .skill_history
            .get(slug)
            .cloned()
    }
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `content` to a sibling temp file, then rename it over `path`.
///
/// Each call gets its own temp file, so overlapping writers never share one.
pub(crate) async fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp_name = format!(
        ".{}.tmp-{}-{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("state"),
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    let tmp_path = path
        .parent()
        .map(|p| p.join(&tmp_name))
        .unwrap_or_else(|| PathBuf::from(&tmp_name));

    tokio::fs::write(&tmp_path, content).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}
