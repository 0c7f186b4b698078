//! Pipeline data model.
//!
//! Each stage creates its own records. Later stages copy and extend earlier
//! records; nothing is mutated after it leaves the stage that built it.

use serde::{Deserialize, Serialize};

/// Sentinel text carried forward when a sub-question has no usable documents.
pub const NO_DOCUMENTS: &str = "无相关文档";

/// Province tag used when none is given.
pub const DEFAULT_PROVINCE: &str = "hq";

/// Domain/category selector: one scene tag or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SceneTag {
    Single(String),
    Many(Vec<String>),
}

impl SceneTag {
    /// The individual tags in order.
    pub fn tags(&self) -> Vec<&str> {
        match self {
            SceneTag::Single(tag) => vec![tag.as_str()],
            SceneTag::Many(tags) => tags.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for SceneTag {
    fn from(tag: &str) -> Self {
        SceneTag::Single(tag.to_string())
    }
}

impl From<String> for SceneTag {
    fn from(tag: String) -> Self {
        SceneTag::Single(tag)
    }
}

impl From<Vec<String>> for SceneTag {
    fn from(tags: Vec<String>) -> Self {
        match tags.len() {
            1 => SceneTag::Single(tags.into_iter().next().unwrap_or_default()),
            _ => SceneTag::Many(tags),
        }
    }
}

/// The question a pipeline invocation answers, with its retrieval scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexQuery {
    query: String,
    scene: SceneTag,
    province: String,
}

impl ComplexQuery {
    /// Create a query scoped to `scene` in the default province.
    pub fn new(query: impl Into<String>, scene: impl Into<SceneTag>) -> Self {
        Self {
            query: query.into(),
            scene: scene.into(),
            province: DEFAULT_PROVINCE.to_string(),
        }
    }

    /// Scope the query to a different province.
    pub fn with_province(mut self, province: impl Into<String>) -> Self {
        self.province = province.into();
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn scene(&self) -> &SceneTag {
        &self.scene
    }

    pub fn province(&self) -> &str {
        &self.province
    }
}

/// A document returned by the retrieval service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Evidence body; some records carry only an image or a link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default)]
    pub doc_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Ranking score assigned by the service; never interpreted here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl RetrievedDocument {
    /// A text-only document, mostly useful for tests and fixtures.
    pub fn text(doc_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            doc_name: doc_name.into(),
            img_url: None,
            url: None,
            score: None,
        }
    }

    /// The evidence body if present and not blank.
    pub fn body(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// A retrieval-service failure, kept as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalFailure {
    pub error: String,
    /// HTTP status when the service answered at all
    pub status_code: Option<u16>,
    /// Response body, empty on transport failure
    pub text: String,
}

/// Result of one search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalOutcome {
    Documents(Vec<RetrievedDocument>),
    Failed(RetrievalFailure),
}

impl RetrievalOutcome {
    /// True for a successful search that matched nothing.
    pub fn is_empty_success(&self) -> bool {
        matches!(self, RetrievalOutcome::Documents(docs) if docs.is_empty())
    }
}

/// A sub-question with the documents retrieved for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQuestionDocs {
    pub subquestion: String,
    pub documents: Vec<RetrievedDocument>,
    /// The widened fallback tag set was queried
    pub used_fallback: bool,
    /// Set when the last search issued for this sub-question failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<RetrievalFailure>,
}

/// A grounded answer to one sub-question.
///
/// Both fields are empty strings when generation or parsing failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubAnswer {
    /// Verbatim excerpt from the sub-question's documents
    pub reference: String,
    /// Conclusion reasoned from the reference
    pub answer: String,
}

impl SubAnswer {
    pub fn is_empty(&self) -> bool {
        self.reference.is_empty() && self.answer.is_empty()
    }
}

/// Generator output: retrieval record extended with its sub-answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnsweredSubQuestion {
    pub subquestion: String,
    pub documents: Vec<RetrievedDocument>,
    pub subanswer: SubAnswer,
}

/// Verifier output: the sub-answer record extended with three trust flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub subquestion: String,
    pub documents: Vec<RetrievedDocument>,
    pub answer: String,
    pub reference: String,
    pub relevance: bool,
    pub faithfulness: bool,
    pub evidence_from_document: bool,
    /// Why the judge's verdict could not be used, when it could not
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl VerificationResult {
    /// All three flags hold.
    pub fn is_trusted(&self) -> bool {
        self.relevance && self.faithfulness && self.evidence_from_document
    }
}

/// Evidence carried into fusion for one sub-question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Evidence {
    /// A verified sub-answer
    Answer(String),
    /// Raw numbered document texts
    Documents(Vec<String>),
}

impl Evidence {
    /// Text form used inside the fusion prompt.
    pub fn render(&self) -> String {
        match self {
            Evidence::Answer(answer) => answer.clone(),
            Evidence::Documents(texts) => texts.join("\n\n"),
        }
    }
}

/// One sub-question with the evidence selected for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredEvidenceItem {
    pub subquestion: String,
    pub evidence: Evidence,
}

/// The answer to the complex question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FinalAnswer {
    pub answer: String,
}

impl FinalAnswer {
    /// Diagnostic answer embedding model output that did not parse.
    pub fn parse_failure(raw: &str) -> Self {
        Self {
            answer: format!("final answer parsing failed, content: {}", raw),
        }
    }

    /// Diagnostic answer for a completion call that failed outright.
    pub fn completion_failure(error: &str) -> Self {
        Self {
            answer: format!("final answer completion failed: {}", error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_tag_accepts_string_or_list() {
        let single: SceneTag = serde_json::from_str(r#""wlyh""#).unwrap();
        assert_eq!(single.tags(), vec!["wlyh"]);

        let many: SceneTag = serde_json::from_str(r#"["wlyh", "xczc"]"#).unwrap();
        assert_eq!(many.tags(), vec!["wlyh", "xczc"]);

        assert_eq!(SceneTag::from(vec!["a".to_string()]), SceneTag::Single("a".into()));
    }

    #[test]
    fn test_complex_query_defaults_to_hq() {
        let q = ComplexQuery::new("why?", "wlyh");
        assert_eq!(q.province(), "hq");
        assert_eq!(q.with_province("wh").province(), "wh");
    }

    #[test]
    fn test_retrieved_document_tolerates_missing_fields() {
        let doc: RetrievedDocument =
            serde_json::from_str(r#"{"doc_name": "a.pdf", "img_url": "http://x/1.png"}"#).unwrap();
        assert_eq!(doc.text, None);
        assert_eq!(doc.body(), None);

        let blank = RetrievedDocument::text("b", "   ");
        assert_eq!(blank.body(), None);
    }

    #[test]
    fn test_sub_answer_is_strict() {
        let ok: SubAnswer = serde_json::from_str(r#"{"reference": "r", "answer": "a"}"#).unwrap();
        assert_eq!(ok.answer, "a");

        assert!(serde_json::from_str::<SubAnswer>(r#"{"answer": "a"}"#).is_err());
        assert!(serde_json::from_str::<SubAnswer>(
            r#"{"reference": "r", "answer": "a", "note": "x"}"#
        )
        .is_err());
        assert!(SubAnswer::default().is_empty());
    }

    #[test]
    fn test_evidence_serializes_as_string_or_list() {
        let answer = serde_json::to_value(Evidence::Answer("a".into())).unwrap();
        assert_eq!(answer, serde_json::json!("a"));

        let docs = serde_json::to_value(Evidence::Documents(vec!["d1".into()])).unwrap();
        assert_eq!(docs, serde_json::json!(["d1"]));
    }

    #[test]
    fn test_evidence_render() {
        let docs = Evidence::Documents(vec!["one".into(), "two".into()]);
        assert_eq!(docs.render(), "one\n\ntwo");
        assert_eq!(Evidence::Answer("x".into()).render(), "x");
    }

    #[test]
    fn test_final_answer_diagnostics_embed_raw_text() {
        let answer = FinalAnswer::parse_failure("<<garbage>>");
        assert!(answer.answer.contains("<<garbage>>"));
        assert!(answer.answer.starts_with("final answer parsing failed"));
    }
}
