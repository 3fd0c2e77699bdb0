//! Jarvis binary: runs the assistant until interrupted, or a one-shot check.

use clap::Parser;
use jarvis::{Assistant, AssistantConfig, Collaborators};
use std::path::PathBuf;
use tracing::info;

/// Jarvis: voice-driven personal assistant.
#[derive(Parser)]
#[command(name = "jarvis", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a diagnostics check and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AssistantConfig::from_file(path)?,
        None => AssistantConfig::load_or_default()?,
    };
    let _log_guard = jarvis::logging::init(&config.logging)?;

    let collaborators = Collaborators::from_config(&config)?;
    let assistant = Assistant::new(config, collaborators);

    if cli.check {
        let outcome = assistant.run_check().await;
        assistant.shutdown().await;
        outcome?;
        return Ok(());
    }

    info!("Jarvis v{}", env!("CARGO_PKG_VERSION"));
    if let Err(e) = assistant.start().await {
        assistant.shutdown().await;
        return Err(e.into());
    }

    wait_for_signal().await?;
    info!("received shutdown signal");
    assistant.shutdown().await;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
