//! Per-sub-question retrieval with a single widening retry.

use super::{Retriever, SearchParams, TagSelector};
use crate::events::{EventReporter, Stage};
use crate::fanout::fan_out;
use crate::types::{RetrievalOutcome, SceneTag, SubQuestionDocs};
use std::sync::Arc;
use verirag_core::config::DEFAULT_FALLBACK_TAGS;

/// Retrieves documents for every sub-question.
///
/// Each sub-question is searched under the primary scene tags. A successful
/// search that matched nothing is retried exactly once under the fallback tag
/// set, same province and search parameters. Failures are never retried.
#[derive(Clone)]
pub struct EvidenceRetriever {
    retriever: Arc<dyn Retriever>,
    params: SearchParams,
    fallback_tags: Vec<String>,
    concurrency: usize,
}

impl EvidenceRetriever {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self {
            retriever,
            params: SearchParams::default(),
            fallback_tags: DEFAULT_FALLBACK_TAGS.iter().map(|t| t.to_string()).collect(),
            concurrency: 1,
        }
    }

    pub fn with_params(mut self, params: SearchParams) -> Self {
        self.params = params;
        self
    }

    /// Replace the fallback tag set; an empty set disables the retry.
    pub fn with_fallback_tags(mut self, tags: Vec<String>) -> Self {
        self.fallback_tags = tags;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Retrieve for each sub-question; output order matches input order.
    pub async fn retrieve(
        &self,
        subquestions: &[String],
        scene: &SceneTag,
        province: &str,
        reporter: &EventReporter,
    ) -> Vec<SubQuestionDocs> {
        let primary = TagSelector::for_scene(scene, province);
        let fallback = TagSelector::for_tags(self.fallback_tags.iter().map(String::as_str), province);
        let (primary, fallback) = (&primary, &fallback);

        fan_out(subquestions.to_vec(), self.concurrency, |index, subquestion| async move {
            self.retrieve_one(index, subquestion, primary, fallback, reporter)
                .await
        })
        .await
    }

    async fn retrieve_one(
        &self,
        index: usize,
        subquestion: String,
        primary: &[TagSelector],
        fallback: &[TagSelector],
        reporter: &EventReporter,
    ) -> SubQuestionDocs {
        let mut outcome = self.retriever.search(&subquestion, primary, &self.params).await;
        let mut used_fallback = false;

        if outcome.is_empty_success() && !fallback.is_empty() {
            reporter.item(
                Stage::Retrieve,
                index,
                "no documents under primary tags, retrying with fallback tags",
            );
            outcome = self.retriever.search(&subquestion, fallback, &self.params).await;
            used_fallback = true;
        }

        match outcome {
            RetrievalOutcome::Documents(documents) => {
                reporter.item(
                    Stage::Retrieve,
                    index,
                    format!("{} documents", documents.len()),
                );
                SubQuestionDocs {
                    subquestion,
                    documents,
                    used_fallback,
                    failure: None,
                }
            }
            RetrievalOutcome::Failed(failure) => {
                tracing::warn!(
                    index,
                    status = ?failure.status_code,
                    error = %failure.error,
                    "Retrieval failed for sub-question"
                );
                reporter.item(
                    Stage::Retrieve,
                    index,
                    format!("retrieval failed: {}", failure.error),
                );
                SubQuestionDocs {
                    subquestion,
                    documents: Vec::new(),
                    used_fallback,
                    failure: Some(failure),
                }
            }
        }
    }
}
