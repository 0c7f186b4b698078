//! Completion client abstraction.
//!
//! Every pipeline stage renders one prompt and needs one piece of text back,
//! so a request is a single user message and a response is the generated
//! text plus whatever usage the provider reported.

use serde::{Deserialize, Serialize};
use verirag_core::AppResult;

/// A single-turn completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The fully rendered prompt, sent as the only user message
    pub prompt: String,

    /// Model identifier (e.g., "qwen3-32b")
    pub model: String,

    /// Upper bound on generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Caller tag carried into provider logs, usually the prompt id
    #[serde(skip)]
    pub label: Option<String>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            max_tokens: None,
            temperature: None,
            label: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Tag the request for logging.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The label, or `"-"` when untagged.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("-")
    }
}

/// Generated text and reported usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,

    /// Model that generated the response, as reported by the provider
    pub model: String,

    pub usage: LlmUsage,
}

/// Token usage. Providers that report nothing leave every count at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LlmUsage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A completion backend: Ollama, an OpenAI-compatible service, or a
/// scripted fake in tests.
///
/// Transport failures, non-2xx statuses and undecodable provider envelopes
/// are all `AppError::Llm`. Whether the *content* is usable is the caller's
/// concern.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider name (e.g., "ollama", "openai").
    fn provider_name(&self) -> &str;

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}
