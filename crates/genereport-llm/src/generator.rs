//! Text generation backends.
//!
//! Backends:
//!   OpenAiCompatibleGenerator - any OpenAI-compatible `/v1/chat/completions`
//!                               endpoint (OpenAI, Ollama, vLLM, LM Studio, …)
//!   UnconfiguredGenerator     - placeholder when no endpoint is configured
//!   MockGenerator             - scripted responses for tests (see `mock`)

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::prompts::SYSTEM_PROMPT;

/// Generation errors.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("AI backend is not configured")]
    NotConfigured,

    #[error("API error [{status}]: {message}")]
    Api { status: u16, message: String },

    #[error("AI backend returned an empty response")]
    EmptyResponse,
}

pub type GenerationResult<T> = Result<T, GenerationError>;

/// A backend that turns a prompt into report text.
pub trait ReportGenerator: Send + Sync {
    /// Generate text for the prompt. Blocks until the backend answers or times out.
    fn generate_text(&self, prompt: &str) -> GenerationResult<String>;

    /// Whether the backend has what it needs to serve requests.
    fn is_configured(&self) -> bool;

    /// Model identifier recorded on every report.
    fn model_identifier(&self) -> &str;
}

/// Settings for an OpenAI-compatible backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiCompatibleSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Chat message in OpenAI wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Blocking client for `/v1/chat/completions`.
pub struct OpenAiCompatibleGenerator {
    settings: OpenAiCompatibleSettings,
    client: reqwest::blocking::Client,
}

impl OpenAiCompatibleGenerator {
    pub fn new(settings: OpenAiCompatibleSettings) -> GenerationResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        let messages = vec![
            ChatMessage {
                role: "system".into(),
                content: SYSTEM_PROMPT.into(),
            },
            ChatMessage {
                role: "user".into(),
                content: prompt.into(),
            },
        ];
        serde_json::json!({
            "model":       self.settings.model,
            "messages":    messages,
            "max_tokens":  self.settings.max_tokens,
            "temperature": self.settings.temperature,
        })
    }
}

impl ReportGenerator for OpenAiCompatibleGenerator {
    fn generate_text(&self, prompt: &str) -> GenerationResult<String> {
        let mut request = self.client.post(self.endpoint()).json(&self.request_body(prompt));
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }

        debug!(model = %self.settings.model, prompt_chars = prompt.len(), "calling AI backend");
        let response = request.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;

        if status >= 400 {
            return Err(GenerationError::Api {
                status,
                message: api_error_message(&body),
            });
        }

        let json: serde_json::Value = serde_json::from_str(&body)?;
        parse_completion(&json)
    }

    fn is_configured(&self) -> bool {
        !self.settings.base_url.trim().is_empty() && !self.settings.model.trim().is_empty()
    }

    fn model_identifier(&self) -> &str {
        &self.settings.model
    }
}

/// Extract the first choice's content from an OpenAI-style response.
fn parse_completion(json: &serde_json::Value) -> GenerationResult<String> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::trim)
        .unwrap_or("");
    if content.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(content.to_string())
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json["error"]["message"]
                .as_str()
                .or_else(|| json["message"].as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

/// Backend used when no AI endpoint is configured.
pub struct UnconfiguredGenerator;

impl ReportGenerator for UnconfiguredGenerator {
    fn generate_text(&self, _prompt: &str) -> GenerationResult<String> {
        Err(GenerationError::NotConfigured)
    }

    fn is_configured(&self) -> bool {
        false
    }

    fn model_identifier(&self) -> &str {
        "unconfigured"
    }
}
