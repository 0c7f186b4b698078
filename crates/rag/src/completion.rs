//! Text completion as the pipeline stages consume it.

use std::collections::HashMap;
use std::sync::Arc;
use verirag_core::AppResult;
use verirag_llm::{LlmClient, LlmRequest};
use verirag_prompt::{build_prompt, PromptDefinition};

/// A completion client bound to a model and sampling settings.
#[derive(Clone)]
pub struct Completer {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl Completer {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` as a single user message and return the generated text.
    ///
    /// `label` names the calling stage in provider logs.
    pub async fn complete(&self, label: &str, prompt: &str) -> AppResult<String> {
        let mut request = LlmRequest::new(prompt, &self.model).with_label(label);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.client.complete(&request).await?;

        tracing::trace!(
            label,
            provider = self.client.provider_name(),
            total_tokens = response.usage.total_tokens,
            "completion finished"
        );

        Ok(response.content)
    }
}

/// Render a stage prompt from `(name, value)` pairs.
pub fn render(definition: &PromptDefinition, vars: &[(&str, &str)]) -> AppResult<String> {
    let variables: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    Ok(build_prompt(definition, variables)?.user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fakes::{marker_prompts, FakeLlm};

    #[tokio::test]
    async fn test_complete_returns_content() {
        let llm = Arc::new(FakeLlm::replying("pong"));
        let completer = Completer::new(llm.clone(), "qwen3").with_temperature(Some(0.1));

        assert_eq!(completer.complete("rag.fuse", "ping").await.unwrap(), "pong");
        assert_eq!(llm.prompts(), vec!["ping"]);
        assert_eq!(completer.model(), "qwen3");
    }

    #[test]
    fn test_render_requires_declared_variables() {
        let prompt = marker_prompts().subanswer;
        assert!(render(&prompt, &[("question", "q")]).is_err());

        let rendered = render(&prompt, &[("question", "q"), ("document", "<d & e>")]).unwrap();
        assert_eq!(rendered, "[subanswer]\nQ=q\nD=<d & e>");
    }
}
