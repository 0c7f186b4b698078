//! Choosing what evidence reaches the fuser.

use crate::documents::texts_or_sentinel;
use crate::types::{Evidence, StructuredEvidenceItem, SubQuestionDocs, VerificationResult};

/// A trusted sub-answer stands in for its documents; anything else falls
/// back to the raw numbered document texts.
pub fn select_evidence(result: &VerificationResult) -> StructuredEvidenceItem {
    let evidence = if result.is_trusted() {
        Evidence::Answer(result.answer.clone())
    } else {
        Evidence::Documents(texts_or_sentinel(&result.documents))
    };

    StructuredEvidenceItem {
        subquestion: result.subquestion.clone(),
        evidence,
    }
}

pub fn select(results: &[VerificationResult]) -> Vec<StructuredEvidenceItem> {
    results.iter().map(select_evidence).collect()
}

/// Raw document texts for every sub-question, skipping generation and
/// verification.
pub fn select_baseline(retrieved: &[SubQuestionDocs]) -> Vec<StructuredEvidenceItem> {
    retrieved
        .iter()
        .map(|item| StructuredEvidenceItem {
            subquestion: item.subquestion.clone(),
            evidence: Evidence::Documents(texts_or_sentinel(&item.documents)),
        })
        .collect()
}
