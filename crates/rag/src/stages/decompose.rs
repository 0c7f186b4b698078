//! Splitting a complex question into sub-questions.

use crate::completion::{render, Completer};
use crate::json::parse_model_json;
use verirag_core::{AppError, AppResult};
use verirag_prompt::PromptDefinition;

/// Asks the model for a JSON array of independently answerable sub-questions.
pub struct QueryDecomposer {
    completer: Completer,
    prompt: PromptDefinition,
}

impl QueryDecomposer {
    pub fn new(completer: Completer, prompt: PromptDefinition) -> Self {
        Self { completer, prompt }
    }

    /// Decompose `complex_query` into ordered sub-questions.
    ///
    /// Any output that is not a non-empty array of non-blank strings fails
    /// the invocation with `AppError::Decomposition`. No retry.
    pub async fn decompose(&self, complex_query: &str) -> AppResult<Vec<String>> {
        let prompt = render(&self.prompt, &[("complex_query", complex_query)])?;
        let raw = self.completer.complete(&self.prompt.id, &prompt).await?;

        let subquestions = parse_subquestions(&raw)?;
        tracing::info!(count = subquestions.len(), "Decomposed complex query");
        Ok(subquestions)
    }
}

/// Strictly decode decomposition output.
pub fn parse_subquestions(raw: &str) -> AppResult<Vec<String>> {
    let subquestions: Vec<String> = parse_model_json(raw).map_err(|e| {
        AppError::decomposition(format!("expected a JSON array of strings: {}", e), raw)
    })?;

    if subquestions.is_empty() {
        return Err(AppError::decomposition("no sub-questions returned", raw));
    }

    if let Some(pos) = subquestions.iter().position(|q| q.trim().is_empty()) {
        return Err(AppError::decomposition(
            format!("sub-question {} is blank", pos + 1),
            raw,
        ));
    }

    Ok(subquestions)
}
