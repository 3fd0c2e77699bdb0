//! Error types for the assistant.

/// Top-level error type for the assistant orchestrator and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or parse error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Persistent state error.
    #[error("memory error: {0}")]
    Memory(String),

    /// Skill loading or execution error.
    #[error("skill error: {0}")]
    Skill(String),

    /// Language model request error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Speech input/output error.
    #[error("speech error: {0}")]
    Speech(String),

    /// System metrics sampling error.
    #[error("metrics error: {0}")]
    Metrics(String),

    /// Image capture or analysis error.
    #[error("vision error: {0}")]
    Vision(String),

    /// Process or power control error.
    #[error("system error: {0}")]
    System(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AssistantError>;
