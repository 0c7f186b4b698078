//! Fusing selected evidence into the final answer.

use crate::completion::{render, Completer};
use crate::json::parse_model_json;
use crate::types::{FinalAnswer, StructuredEvidenceItem};
use verirag_prompt::PromptDefinition;

/// Serialize evidence in order as `子问题{i}: {subquestion}\n{evidence}\n\n`.
pub fn render_evidence(items: &[StructuredEvidenceItem]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "子问题{}: {}\n{}\n\n",
                i + 1,
                item.subquestion,
                item.evidence.render()
            )
        })
        .collect()
}

/// Produces the final answer strictly from structured evidence.
pub struct AnswerFuser {
    completer: Completer,
    prompt: PromptDefinition,
}

impl AnswerFuser {
    pub fn new(completer: Completer, prompt: PromptDefinition) -> Self {
        Self { completer, prompt }
    }

    /// Fuse `evidence` into an answer to `complex_query`.
    ///
    /// Returns the answer together with the rendered prompt. Failures become
    /// diagnostic answers rather than errors.
    pub async fn fuse(
        &self,
        complex_query: &str,
        evidence: &[StructuredEvidenceItem],
    ) -> (FinalAnswer, String) {
        let structured = render_evidence(evidence);
        let prompt = match render(
            &self.prompt,
            &[
                ("complex_query", complex_query),
                ("structured_evidence", &structured),
            ],
        ) {
            Ok(prompt) => prompt,
            Err(e) => return (FinalAnswer::completion_failure(&e.to_string()), String::new()),
        };

        let answer = match self.completer.complete(&self.prompt.id, &prompt).await {
            Ok(raw) => match parse_model_json::<FinalAnswer>(&raw) {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::warn!(error = %e, "Final answer did not decode");
                    FinalAnswer::parse_failure(&raw)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Final answer completion failed");
                FinalAnswer::completion_failure(&e.to_string())
            }
        };

        (answer, prompt)
    }
}
