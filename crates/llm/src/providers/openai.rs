//! OpenAI-compatible chat completions provider.
//!
//! Works against any service exposing `POST {base}/chat/completions`
//! (OpenAI, vLLM, hosted Qwen gateways). The pipeline sends one user message
//! per request. Responses are accepted either as the standard
//! `choices[0].message.content` envelope or as the model's text directly.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use verirag_core::{AppError, AppResult};

/// Default API base.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Response body shapes accepted from a completion service.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CompletionBody {
    Choices(ChatResponse),
    Direct(String),
}

/// OpenAI-compatible LLM client.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client for `base_url` authenticated with `api_key`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    fn to_chat_request(&self, request: &LlmRequest) -> ChatRequest {
        ChatRequest {
            model: request.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(request.prompt.clone()),
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

/// Turn a raw response body into an `LlmResponse`.
///
/// Anything other than a `choices` envelope is the generated text itself:
/// a JSON string literal is unwrapped, any other body is taken verbatim.
/// The model is asked for JSON, so an array or object body is normal output.
fn parse_completion_body(body: &str, requested_model: &str) -> AppResult<LlmResponse> {
    match serde_json::from_str::<CompletionBody>(body) {
        Ok(CompletionBody::Choices(chat)) => {
            let content = chat
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| AppError::Llm("Completion response has no choices".to_string()))?
                .message
                .content
                .unwrap_or_default();

            let usage = chat
                .usage
                .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
                .unwrap_or_default();

            Ok(LlmResponse {
                content,
                model: chat.model.unwrap_or_else(|| requested_model.to_string()),
                usage,
            })
        }
        Ok(CompletionBody::Direct(content)) => Ok(LlmResponse {
            content,
            model: requested_model.to_string(),
            usage: LlmUsage::default(),
        }),
        Err(e) => match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value) if value.get("choices").is_some() => Err(AppError::Llm(format!(
                "Malformed completion envelope: {}",
                e
            ))),
            _ => Ok(LlmResponse {
                content: body.trim().to_string(),
                model: requested_model.to_string(),
                usage: LlmUsage::default(),
            }),
        },
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(
            label = request.label(),
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "Sending chat completion request"
        );

        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.to_chat_request(request))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send chat completion request: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to read completion response: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::Llm(format!(
                "Chat completion API error ({}): {}",
                status, body
            )));
        }

        let parsed = parse_completion_body(&body, &request.model)?;

        tracing::debug!(
            completion_chars = parsed.content.len(),
            total_tokens = parsed.usage.total_tokens,
            "Received chat completion"
        );

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_is_single_user_message() {
        let client = OpenAiClient::new("https://llm.example.com/v1/", "sk-test");
        assert_eq!(client.base_url, "https://llm.example.com/v1");

        let chat = client.to_chat_request(&LlmRequest::new("rendered prompt", "qwen3-32b"));
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].role, "user");
        assert_eq!(chat.messages[0].content.as_deref(), Some("rendered prompt"));

        let json = serde_json::to_value(&chat).unwrap();
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_parse_choices_envelope() {
        let body = r#"{
            "model": "qwen3-32b",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"answer\": \"ok\"}"}}],
            "usage": {"prompt_tokens": 7, "completion_tokens": 4, "total_tokens": 11}
        }"#;

        let response = parse_completion_body(body, "fallback").unwrap();
        assert_eq!(response.content, r#"{"answer": "ok"}"#);
        assert_eq!(response.model, "qwen3-32b");
        assert_eq!(response.usage.total_tokens, 11);
    }

    #[test]
    fn test_parse_direct_string_body() {
        let response = parse_completion_body(r#""[\"q1\", \"q2\"]""#, "qwen3").unwrap();
        assert_eq!(response.content, r#"["q1", "q2"]"#);
        assert_eq!(response.model, "qwen3");
    }

    #[test]
    fn test_parse_plain_text_body() {
        let response = parse_completion_body("just some text", "qwen3").unwrap();
        assert_eq!(response.content, "just some text");
    }

    #[test]
    fn test_parse_empty_choices_is_error() {
        assert!(parse_completion_body(r#"{"choices": []}"#, "qwen3").is_err());
    }

    #[test]
    fn test_parse_direct_json_array_body() {
        let body = r#"["子问题1", "子问题2"]"#;
        let response = parse_completion_body(body, "qwen3").unwrap();
        assert_eq!(response.content, body);
        assert_eq!(response.model, "qwen3");
    }

    #[test]
    fn test_parse_direct_json_object_body() {
        let body = "{\"answer\": \"x\"}\n";
        let response = parse_completion_body(body, "qwen3").unwrap();
        assert_eq!(response.content, r#"{"answer": "x"}"#);
        assert_eq!(response.usage.total_tokens, 0);
    }

    #[test]
    fn test_parse_malformed_choices_is_error() {
        assert!(parse_completion_body(r#"{"choices": "oops"}"#, "qwen3").is_err());
        assert!(parse_completion_body(r#"{"choices": [{"text": "x"}]}"#, "qwen3").is_err());
    }
}
