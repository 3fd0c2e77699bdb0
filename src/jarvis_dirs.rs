//! Centralized application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/jarvis/` | `~/.local/share/jarvis/` |
//! | Config | `~/Library/Application Support/jarvis/` | `~/.config/jarvis/` |
//!
//! Overrides for tests and custom deployments:
//! - `JARVIS_DATA_DIR` overrides [`data_dir`]
//! - `JARVIS_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root: persisted state, custom skills, captures, logs.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("JARVIS_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("jarvis"))
        .unwrap_or_else(|| PathBuf::from("/tmp/jarvis-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("JARVIS_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("jarvis"))
        .unwrap_or_else(|| PathBuf::from("/tmp/jarvis-config"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// User-authored skills directory (`data_dir()/skills/custom/`).
#[must_use]
pub fn skills_dir() -> PathBuf {
    data_dir().join("skills").join("custom")
}

/// Persisted assistant state (`data_dir()/memory.json`).
#[must_use]
pub fn state_file() -> PathBuf {
    data_dir().join("memory.json")
}

/// Screen and webcam captures (`data_dir()/captures/`).
#[must_use]
pub fn captures_dir() -> PathBuf {
    data_dir().join("captures")
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}
