//! Jarvis: a voice-driven personal assistant orchestrator.
//!
//! Utterances arrive from a listener, are routed either to the skill
//! dispatcher (commands) or to a language model (conversation), and the
//! response is spoken back:
//!
//! listener → [`orchestrator`] → [`skills`] dispatcher / [`llm`] → speech output
//!
//! # Architecture
//!
//! - **State store** ([`memory`]): profile, conversation log, and workflow
//!   state persisted as one JSON document, one mutator at a time.
//! - **Skills** ([`skills`]): built-in handlers plus data-driven custom
//!   skills, matched by trigger prefix, first match wins.
//! - **Workflow** ([`workflow`]): two-phase propose / confirm / cancel slots
//!   for power actions and skill changes.
//! - **Orchestrator** ([`orchestrator`]): perception and telemetry loops
//!   under a shared cancellation token.

pub mod config;
pub mod error;
pub mod jarvis_dirs;
pub mod llm;
pub mod logging;
pub mod memory;
pub mod orchestrator;
pub mod skills;
pub mod speech;
pub mod system_control;
pub mod system_monitor;
pub mod vision;
pub mod workflow;

#[cfg(test)]
mod test_utils;

pub use config::AssistantConfig;
pub use error::{AssistantError, Result};
pub use memory::StateStore;
pub use orchestrator::{Assistant, Collaborators};
pub use skills::{FALLBACK_RESPONSE, SkillDispatcher, SkillRegistry};
