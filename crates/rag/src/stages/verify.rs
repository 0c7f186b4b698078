//! Judging sub-answers for relevance and grounding.

use crate::completion::{render, Completer};
use crate::documents::numbered_texts;
use crate::events::{EventReporter, Stage};
use crate::fanout::fan_out;
use crate::json::parse_model_json;
use crate::types::{AnsweredSubQuestion, RetrievedDocument, SubAnswer, VerificationResult};
use serde::Deserialize;
use verirag_prompt::PromptDefinition;

/// The judge's raw verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct Verdict {
    relevance: bool,
    faithfulness: bool,
    evidence_from_document: bool,
}

impl Verdict {
    const REJECTED: Verdict = Verdict {
        relevance: false,
        faithfulness: false,
        evidence_from_document: false,
    };

    /// Nothing to be unfaithful to, or nothing to have been drawn from.
    fn with_vacuous_rules(mut self, reference_empty: bool, documents_empty: bool) -> Self {
        if reference_empty {
            self.faithfulness = true;
        }
        if documents_empty {
            self.evidence_from_document = true;
        }
        self
    }
}

/// Runs the combined three-flag check on each sub-answer.
///
/// Fails closed: if the judge call fails or its output does not decode, all
/// three flags are `false` and the vacuous rules are not applied.
pub struct FaithfulnessVerifier {
    completer: Completer,
    prompt: PromptDefinition,
    concurrency: usize,
}

impl FaithfulnessVerifier {
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

    /// Verify one sub-answer against its sub-question and documents.
    pub async fn verify(
        &self,
        subquestion: &str,
        documents: &[RetrievedDocument],
        subanswer: &SubAnswer,
    ) -> VerificationResult {
        let texts = numbered_texts(documents);
        let document = texts.join("\n\n");

        let (verdict, failure) = match self.judge(subquestion, subanswer, &document).await {
            Ok(verdict) => (
                verdict.with_vacuous_rules(subanswer.reference.trim().is_empty(), texts.is_empty()),
                None,
            ),
            Err(reason) => {
                tracing::warn!(%reason, "Verification failed, rejecting sub-answer");
                (Verdict::REJECTED, Some(reason))
            }
        };

        VerificationResult {
            subquestion: subquestion.to_string(),
            documents: documents.to_vec(),
            answer: subanswer.answer.clone(),
            reference: subanswer.reference.clone(),
            relevance: verdict.relevance,
            faithfulness: verdict.faithfulness,
            evidence_from_document: verdict.evidence_from_document,
            failure,
        }
    }

    async fn judge(
        &self,
        subquestion: &str,
        subanswer: &SubAnswer,
        document: &str,
    ) -> Result<Verdict, String> {
        let prompt = render(
            &self.prompt,
            &[
                ("subquestion", subquestion),
                ("answer", &subanswer.answer),
                ("evidence", &subanswer.reference),
                ("document", document),
            ],
        )
        .map_err(|e| e.to_string())?;

        let raw = self
            .completer
            .complete(&self.prompt.id, &prompt)
            .await
            .map_err(|e| e.to_string())?;

        parse_model_json::<Verdict>(&raw).map_err(|e| format!("{}; output: {}", e, raw))
    }

    /// Verify every sub-answer; output order matches input order.
    pub async fn verify_all(
        &self,
        answered: Vec<AnsweredSubQuestion>,
        reporter: &EventReporter,
    ) -> Vec<VerificationResult> {
        fan_out(answered, self.concurrency, |index, item| async move {
            let result = self
                .verify(&item.subquestion, &item.documents, &item.subanswer)
                .await;

            let message = match &result.failure {
                Some(_) => "verdict unusable, rejected".to_string(),
                None => format!(
                    "relevance={} faithfulness={} evidence_from_document={}",
                    result.relevance, result.faithfulness, result.evidence_from_document
                ),
            };
            reporter.item(Stage::Verify, index, message);

            result
        })
        .await
    }
}
