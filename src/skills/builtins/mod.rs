//! Compiled-in skills and their registration order.
//!
//! Order matters: dispatch is first-match-wins, so the skill workshop is
//! registered ahead of the generic confirmation skill to claim
//! "confirm skill ..." before the bare "confirm" trigger does.

mod memory;
mod safety;
mod status;
mod system_control;
mod vision;
mod workshop;

pub use memory::MemorySkill;
pub use safety::SafetyConfirmationSkill;
pub use status::StatusSkill;
pub use system_control::SystemControlSkill;
pub use vision::VisionSkill;
pub use workshop::SkillWorkshop;

use super::{BuiltinSource, SkillFactory, SkillRef};
use crate::config::SystemControlConfig;
use crate::system_control::SystemActions;
use crate::system_monitor::MetricsSampler;
use crate::vision::ImageCapture;
use std::sync::Arc;

/// Collaborators handed to built-in skill constructors.
#[derive(Clone)]
pub struct SkillDeps {
    pub metrics: Arc<dyn MetricsSampler>,
    pub system: Arc<dyn SystemActions>,
    pub capture: Arc<dyn ImageCapture>,
    pub system_config: SystemControlConfig,
}

fn memory(_: &SkillDeps) -> SkillRef {
    Arc::new(MemorySkill::new())
}

fn workshop(_: &SkillDeps) -> SkillRef {
    Arc::new(SkillWorkshop::new())
}

fn safety(deps: &SkillDeps) -> SkillRef {
    Arc::new(SafetyConfirmationSkill::new(Arc::clone(&deps.system)))
}

fn status(deps: &SkillDeps) -> SkillRef {
    Arc::new(StatusSkill::new(Arc::clone(&deps.metrics)))
}

fn system_control(deps: &SkillDeps) -> SkillRef {
    Arc::new(SystemControlSkill::new(
        Arc::clone(&deps.system),
        deps.system_config.clone(),
    ))
}

fn vision(deps: &SkillDeps) -> SkillRef {
    Arc::new(VisionSkill::new(Arc::clone(&deps.capture)))
}

/// Built-in factories in registration order.
#[must_use]
pub fn default_factories() -> Vec<SkillFactory> {
    vec![
        memory as SkillFactory,
        workshop,
        safety,
        status,
        system_control,
        vision,
    ]
}

/// Source yielding every built-in skill.
#[must_use]
pub fn builtin_source(deps: SkillDeps) -> BuiltinSource {
    BuiltinSource::new(deps, default_factories())
}
