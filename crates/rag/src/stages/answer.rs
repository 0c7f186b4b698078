//! Grounded answers to individual sub-questions.

use crate::completion::{render, Completer};
use crate::documents::document_block;
use crate::events::{EventReporter, Stage};
use crate::fanout::fan_out;
use crate::json::parse_model_json;
use crate::types::{AnsweredSubQuestion, RetrievedDocument, SubAnswer, SubQuestionDocs};
use verirag_prompt::PromptDefinition;

/// Answers each sub-question from its own documents only.
///
/// Generation never fails the invocation: any call or parse failure yields
/// an empty `SubAnswer`. Its empty reference is vacuously faithful, so it
/// still reaches fusion as an empty answer when the judge accepts the other
/// two flags.
pub struct SubAnswerGenerator {
    completer: Completer,
    prompt: PromptDefinition,
    concurrency: usize,
}

impl SubAnswerGenerator {
    pub fn new(completer: Completer, prompt: PromptDefinition) -> Self {
        Self {
            completer,
            prompt,
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Answer one sub-question.
    pub async fn answer(&self, subquestion: &str, documents: &[RetrievedDocument]) -> SubAnswer {
        match self.try_answer(subquestion, documents).await {
            Ok(subanswer) => subanswer,
            Err(reason) => {
                tracing::warn!(%reason, "Sub-answer generation failed, using empty answer");
                SubAnswer::default()
            }
        }
    }

    async fn try_answer(
        &self,
        subquestion: &str,
        documents: &[RetrievedDocument],
    ) -> Result<SubAnswer, String> {
        let document = document_block(documents);
        let prompt = render(
            &self.prompt,
            &[("question", subquestion), ("document", &document)],
        )
        .map_err(|e| e.to_string())?;

        let raw = self
            .completer
            .complete(&self.prompt.id, &prompt)
            .await
            .map_err(|e| e.to_string())?;

        parse_model_json::<SubAnswer>(&raw).map_err(|e| format!("{}; output: {}", e, raw))
    }

    /// Answer every retrieved sub-question; output order matches input order.
    pub async fn answer_all(
        &self,
        retrieved: Vec<SubQuestionDocs>,
        reporter: &EventReporter,
    ) -> Vec<AnsweredSubQuestion> {
        fan_out(retrieved, self.concurrency, |index, item| async move {
            let subanswer = self.answer(&item.subquestion, &item.documents).await;
            if subanswer.is_empty() {
                reporter.item(Stage::Answer, index, "no usable sub-answer");
            } else {
                reporter.item(Stage::Answer, index, "answered");
            }

            AnsweredSubQuestion {
                subquestion: item.subquestion,
                documents: item.documents,
                subanswer,
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fakes::{field, marker_prompts, FakeLlm};
    use crate::types::NO_DOCUMENTS;
    use std::sync::Arc;

    fn generator(llm: Arc<FakeLlm>) -> SubAnswerGenerator {
        SubAnswerGenerator::new(Completer::new(llm, "m"), marker_prompts().subanswer)
    }

    #[tokio::test]
    async fn test_answer_parses_reference_and_answer() {
        let llm = Arc::new(FakeLlm::replying(
            r#"{"reference": "端口down", "answer": "链路中断导致"}"#,
        ));
        let docs = vec![RetrievedDocument::text("a", "端口down")];

        let out = generator(llm.clone()).answer("为什么中断?", &docs).await;
        assert_eq!(out.reference, "端口down");
        assert_eq!(out.answer, "链路中断导致");

        let prompt = &llm.prompts()[0];
        assert_eq!(field(prompt, "Q"), "为什么中断?");
        assert_eq!(field(prompt, "D"), "文档 1 内容:\n端口down\n");
    }

    #[tokio::test]
    async fn test_no_documents_uses_sentinel() {
        let llm = Arc::new(FakeLlm::replying(r#"{"reference": "", "answer": "无法回答"}"#));
        generator(llm.clone()).answer("q", &[]).await;
        assert_eq!(field(&llm.prompts()[0], "D"), NO_DOCUMENTS);
    }

    #[tokio::test]
    async fn test_parse_failure_yields_empty_answer() {
        let llm = Arc::new(FakeLlm::replying(r#"{"answer": "missing reference"}"#));
        let out = generator(llm).answer("q", &[]).await;
        assert_eq!(out, SubAnswer::default());
    }

    #[tokio::test]
    async fn test_call_failure_yields_empty_answer() {
        let out = generator(Arc::new(FakeLlm::failing())).answer("q", &[]).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_answer_all_preserves_order_with_mixed_failures() {
        let llm = Arc::new(FakeLlm::new(|prompt| {
            let question = field(prompt, "Q").to_string();
            if question == "bad" {
                Ok("garbage".to_string())
            } else {
                Ok(format!(r#"{{"reference": "r-{0}", "answer": "a-{0}"}}"#, question))
            }
        }));
        let retrieved = ["one", "bad", "three"]
            .iter()
            .map(|q| SubQuestionDocs {
                subquestion: q.to_string(),
                documents: vec![],
                used_fallback: false,
                failure: None,
            })
            .collect();

        let out = generator(llm)
            .with_concurrency(3)
            .answer_all(retrieved, &EventReporter::noop())
            .await;

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].subanswer.answer, "a-one");
        assert!(out[1].subanswer.is_empty());
        assert_eq!(out[2].subanswer.answer, "a-three");
        assert_eq!(out[1].subquestion, "bad");
    }
}
