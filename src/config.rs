//! Configuration types for the assistant.

use crate::error::{AssistantError, Result};
use crate::jarvis_dirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top-level configuration for the assistant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Persona used when building conversational prompts.
    pub persona: PersonaConfig,
    /// Language model endpoint settings.
    pub llm: LlmConfig,
    /// Persisted state location.
    pub memory: MemoryConfig,
    /// Skill source locations.
    pub skills: SkillsConfig,
    /// Background loop pacing.
    pub loops: LoopConfig,
    /// Wake phrase gate for the perception loop.
    pub wake: WakeConfig,
    /// Whitelisted applications and folders for system control.
    pub system: SystemControlConfig,
    /// Screen / webcam capture settings.
    pub vision: VisionConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Persona settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Name the assistant answers to in prompts.
    pub name: String,
    /// Persona paragraph placed at the start of every system prompt.
    pub prompt: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "Jarvis".to_owned(),
            prompt: "You are Jarvis, a sophisticated AI assistant inspired by Tony Stark's AI. \
You are witty, polite, slightly sarcastic, and extremely competent. \
You adapt to the user's preferences, remain professional during system operations, \
and shift to a more serious tone when explicitly requested. \
Keep responses concise, clear, and useful while maintaining warmth."
                .to_owned(),
        }
    }
}

/// Language model endpoint configuration (Ollama `/api/generate`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the model server.
    pub base_url: String,
    /// Model tag to request.
    pub model: String,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Number of recent exchanges included as conversation context.
    pub context_turns: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_owned(),
            model: "phi3:mini".to_owned(),
            connect_timeout_secs: 60,
            request_timeout_secs: 120,
            context_turns: 6,
        }
    }
}

/// Persisted state settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// JSON document holding the profile, conversation log, and workflow state.
    pub state_file: PathBuf,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            state_file: jarvis_dirs::state_file(),
        }
    }
}

/// Skill source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsConfig {
    /// Directory scanned for user-authored skill manifests.
    pub custom_dir: PathBuf,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            custom_dir: jarvis_dirs::skills_dir(),
        }
    }
}

/// Background loop pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Pause after a failed perception iteration, in milliseconds.
    pub perception_backoff_ms: u64,
    /// Interval between metrics samples, in seconds.
    pub telemetry_interval_secs: u64,
    /// Pause after a failed metrics sample, in seconds.
    pub telemetry_backoff_secs: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            perception_backoff_ms: 1_000,
            telemetry_interval_secs: 30,
            telemetry_backoff_secs: 5,
        }
    }
}

/// Wake phrase gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    /// When enabled, only input following the wake phrase is treated as addressed.
    pub enabled: bool,
    /// Wake phrase, matched case-insensitively on word boundaries.
    pub phrase: String,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            phrase: "hey jarvis".to_owned(),
        }
    }
}

/// Whitelists for the system-control skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemControlConfig {
    /// Friendly name → executable path.
    pub applications: BTreeMap<String, PathBuf>,
    /// Friendly name → directory.
    pub folders: BTreeMap<String, PathBuf>,
}

impl Default for SystemControlConfig {
    fn default() -> Self {
        Self {
            applications: default_applications(),
            folders: default_folders(),
        }
    }
}

fn default_applications() -> BTreeMap<String, PathBuf> {
    let mut apps = BTreeMap::new();
    if cfg!(target_os = "windows") {
        apps.insert(
            "notepad".to_owned(),
            PathBuf::from(r"C:\Windows\System32\notepad.exe"),
        );
        apps.insert(
            "calculator".to_owned(),
            PathBuf::from(r"C:\Windows\System32\calc.exe"),
        );
        apps.insert(
            "command prompt".to_owned(),
            PathBuf::from(r"C:\Windows\System32\cmd.exe"),
        );
        apps.insert(
            "explorer".to_owned(),
            PathBuf::from(r"C:\Windows\explorer.exe"),
        );
        if let Some(home) = dirs::home_dir() {
            apps.insert(
                "visual studio code".to_owned(),
                home.join("AppData/Local/Programs/Microsoft VS Code/Code.exe"),
            );
        }
    } else if cfg!(target_os = "macos") {
        apps.insert(
            "terminal".to_owned(),
            PathBuf::from("/System/Applications/Utilities/Terminal.app/Contents/MacOS/Terminal"),
        );
        apps.insert(
            "calculator".to_owned(),
            PathBuf::from("/System/Applications/Calculator.app/Contents/MacOS/Calculator"),
        );
    } else {
        apps.insert(
            "calculator".to_owned(),
            PathBuf::from("/usr/bin/gnome-calculator"),
        );
        apps.insert("terminal".to_owned(), PathBuf::from("/usr/bin/xterm"));
        apps.insert("visual studio code".to_owned(), PathBuf::from("/usr/bin/code"));
    }
    apps
}

fn default_folders() -> BTreeMap<String, PathBuf> {
    let mut folders = BTreeMap::new();
    if let Some(dir) = dirs::document_dir() {
        folders.insert("documents".to_owned(), dir);
    }
    if let Some(dir) = dirs::download_dir() {
        folders.insert("downloads".to_owned(), dir);
    }
    if let Some(dir) = dirs::picture_dir() {
        folders.insert("pictures".to_owned(), dir);
    }
    folders
}

/// Capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Directory receiving screen and webcam captures.
    pub capture_dir: PathBuf,
    /// Program and arguments that write a screenshot to `{path}`.
    pub screen_command: Option<Vec<String>>,
    /// Program and arguments that write a webcam frame to `{path}`.
    pub webcam_command: Option<Vec<String>>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        let screen_command = if cfg!(target_os = "macos") {
            Some(vec![
                "screencapture".to_owned(),
                "-x".to_owned(),
                "{path}".to_owned(),
            ])
        } else if cfg!(target_os = "linux") {
            Some(vec!["grim".to_owned(), "{path}".to_owned()])
        } else {
            None
        };
        Self {
            capture_dir: jarvis_dirs::captures_dir(),
            screen_command,
            webcam_command: None,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily-rolling log files. `None` disables file logging.
    pub directory: Option<PathBuf>,
    /// Default filter directive when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: Some(jarvis_dirs::logs_dir()),
            filter: "jarvis=info".to_owned(),
        }
    }
}

impl AssistantConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AssistantError::Config(e.to_string()))
    }

    /// Load the default config file if it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_config_path();
        if path.is_file() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AssistantError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        jarvis_dirs::config_file()
    }
}
