//! Language-model collaborator and the Ollama HTTP client.
//!
//! The orchestrator composes a plain-text prompt from recent conversation and
//! the latest utterance, and passes the persona as a separate system prompt.

use crate::config::LlmConfig;
use crate::error::{AssistantError, Result};
use crate::memory::ConversationEntry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Text generation backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a reply to `prompt`, optionally steered by `system_prompt`.
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String>;

    /// Release held resources. Safe to call more than once.
    async fn shutdown(&self) {}
}

/// Render recent exchanges and the latest input as a completion prompt.
#[must_use]
pub fn compose_prompt(history: &[ConversationEntry], latest: &str, assistant_name: &str) -> String {
    let mut sections = Vec::with_capacity(3);
    if !history.is_empty() {
        let lines: Vec<String> = history
            .iter()
            .flat_map(|entry| {
                [
                    format!("User: {}", entry.user),
                    format!("{assistant_name}: {}", entry.assistant),
                ]
            })
            .collect();
        sections.push(format!("Recent conversation:\n{}", lines.join("\n")));
    }
    sections.push(format!("User: {latest}"));
    sections.push(format!("{assistant_name}:"));
    sections.join("\n\n")
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Client for a local Ollama server's `/api/generate` endpoint.
pub struct OllamaClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AssistantError::Llm(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: format!("{}/api/generate", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String> {
        debug!(model = %self.model, "sending prompt to Ollama");
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system: system_prompt,
            stream: false,
        };
        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(500)
                .collect();
            return Err(AssistantError::Llm(format!("HTTP {status}: {detail}")));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Llm(format!("invalid response body: {e}")))?;
        Ok(parsed.response.trim().to_owned())
    }
}
