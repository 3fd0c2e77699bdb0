//! Operating-system actions: power control, launching and closing programs,
//! and opening folders.

use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::info;

/// Power transitions that require confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Shutdown,
    Restart,
}

impl PowerAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shutdown => "shutdown",
            Self::Restart => "restart",
        }
    }
}

/// Side-effecting system operations used by skills.
#[async_trait]
pub trait SystemActions: Send + Sync {
    async fn power(&self, action: PowerAction) -> Result<()>;
    async fn launch(&self, program: &Path) -> Result<()>;
    async fn close(&self, process_name: &str) -> Result<()>;
    async fn open_folder(&self, dir: &Path) -> Result<()>;
}

/// [`SystemActions`] implemented with the host's own commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSystemActions;

impl OsSystemActions {
    fn power_command(action: PowerAction) -> Command {
        if cfg!(target_os = "windows") {
            let mut cmd = Command::new("shutdown");
            let flag = match action {
                PowerAction::Shutdown => "/s",
                PowerAction::Restart => "/r",
            };
            cmd.args([flag, "/f", "/t", "5"]);
            cmd
        } else {
            let mut cmd = Command::new("shutdown");
            let flag = match action {
                PowerAction::Shutdown => "-h",
                PowerAction::Restart => "-r",
            };
            cmd.args([flag, "now"]);
            cmd
        }
    }

    fn close_command(process_name: &str) -> Command {
        if cfg!(target_os = "windows") {
            let mut cmd = Command::new("taskkill");
            cmd.args(["/IM", process_name, "/F"]);
            cmd
        } else {
            let mut cmd = Command::new("pkill");
            cmd.args(["-x", process_name]);
            cmd
        }
    }

    fn open_command(dir: &Path) -> Command {
        let opener = if cfg!(target_os = "windows") {
            "explorer"
        } else if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };
        let mut cmd = Command::new(opener);
        cmd.arg(dir);
        cmd
    }
}

async fn run_to_completion(mut cmd: Command, what: &str) -> Result<()> {
    let status = cmd
        .status()
        .await
        .map_err(|e| AssistantError::System(format!("{what}: {e}")))?;
    if status.success() {
        Ok(())
    } else {
        Err(AssistantError::System(format!("{what} exited with {status}")))
    }
}

#[async_trait]
impl SystemActions for OsSystemActions {
    async fn power(&self, action: PowerAction) -> Result<()> {
        info!(action = action.as_str(), "issuing power command");
        run_to_completion(Self::power_command(action), action.as_str()).await
    }

    async fn launch(&self, program: &Path) -> Result<()> {
        info!(program = %program.display(), "launching application");
        // Detached: the child outlives this call.
        Command::new(program)
            .spawn()
            .map(drop)
            .map_err(|e| AssistantError::System(format!("launch {}: {e}", program.display())))
    }

    async fn close(&self, process_name: &str) -> Result<()> {
        info!(process = process_name, "closing application");
        run_to_completion(Self::close_command(process_name), "close").await
    }

    async fn open_folder(&self, dir: &Path) -> Result<()> {
        info!(dir = %dir.display(), "opening folder");
        Self::open_command(dir)
            .spawn()
            .map(drop)
            .map_err(|e| AssistantError::System(format!("open {}: {e}", dir.display())))
    }
}
