//! Scripted generator for testing without a live AI backend.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::generator::{GenerationError, GenerationResult, ReportGenerator};

/// One scripted outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    Text(String),
    Fail(String),
}

/// Returns queued responses in order, then falls back to a fixed text.
pub struct MockGenerator {
    model: String,
    configured: bool,
    fallback: MockResponse,
    queue: Mutex<VecDeque<MockResponse>>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    /// Always answer with `text`.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(MockResponse::Text(text.into()))
    }

    /// Always fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(MockResponse::Fail(message.into()))
    }

    fn new(fallback: MockResponse) -> Self {
        Self {
            model: "mock-model".into(),
            configured: true,
            fallback,
            queue: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Report itself as unconfigured.
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Queue a one-shot response ahead of the fallback.
    pub fn push(&self, response: MockResponse) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(response);
        }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl ReportGenerator for MockGenerator {
    fn generate_text(&self, prompt: &str) -> GenerationResult<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self
            .queue
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| self.fallback.clone());

        match next {
            MockResponse::Text(text) => Ok(text),
            MockResponse::Fail(message) => Err(GenerationError::Api {
                status: 500,
                message,
            }),
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn model_identifier(&self) -> &str {
        &self.model
    }
}
