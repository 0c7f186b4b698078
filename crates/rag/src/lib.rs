//! Verified decomposition RAG.
//!
//! Answers a complex question by splitting it into sub-questions, retrieving
//! evidence for each, generating grounded sub-answers, verifying them, and
//! fusing the trusted answers (or the raw documents where trust fails) into
//! one final answer.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use verirag_llm::OllamaClient;
//! use verirag_prompt::StagePrompts;
//! use verirag_rag::{ComplexQuery, Completer, HttpRetriever, Pipeline, PipelineOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let completer = Completer::new(Arc::new(OllamaClient::new()), "qwen3");
//! let retriever = Arc::new(HttpRetriever::new("http://localhost:8000/search"));
//! let pipeline = Pipeline::new(
//!     completer,
//!     retriever,
//!     StagePrompts::builtin()?,
//!     PipelineOptions::default(),
//! )?;
//!
//! let run = pipeline.run(&ComplexQuery::new("为什么基站频繁掉线?", "wlyh")).await?;
//! println!("{}", run.final_answer.answer);
//! # Ok(())
//! # }
//! ```

pub mod completion;
mod documents;
pub mod events;
mod fanout;
mod json;
pub mod pipeline;
pub mod retrieval;
pub mod stages;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use completion::Completer;
pub use events::{EventCallback, EventReporter, PipelineEvent, Stage, StageTiming};
pub use pipeline::{Pipeline, PipelineMode, PipelineOptions, PipelineRun};
pub use retrieval::{EvidenceRetriever, HttpRetriever, Retriever, SearchParams, TagSelector};
pub use types::{
    AnsweredSubQuestion, ComplexQuery, Evidence, FinalAnswer, RetrievalFailure,
    RetrievalOutcome, RetrievedDocument, SceneTag, StructuredEvidenceItem, SubAnswer,
    SubQuestionDocs, VerificationResult, NO_DOCUMENTS,
};
