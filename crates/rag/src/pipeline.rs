//! Pipeline orchestration.
//!
//! A `Pipeline` wires the stages together once and can then serve any number
//! of invocations. Each invocation gets its own run id, event scope and
//! timing record, and returns the full intermediate trace.

use crate::completion::{render, Completer};
use crate::events::{EventReporter, Stage, StageTimer, StageTiming};
use crate::retrieval::{EvidenceRetriever, Retriever, SearchParams};
use crate::stages::{
    select, select_baseline, AnswerFuser, FaithfulnessVerifier, QueryDecomposer,
    SubAnswerGenerator,
};
use crate::types::{
    AnsweredSubQuestion, ComplexQuery, Evidence, FinalAnswer, StructuredEvidenceItem,
    SubQuestionDocs, VerificationResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;
use verirag_core::{AppConfig, AppError, AppResult};
use verirag_prompt::{PromptDefinition, StagePrompts};

/// Which flavour of the pipeline produced a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Decompose, retrieve, answer, verify, select, fuse
    Full,
    /// Decompose, retrieve, fuse raw documents
    Baseline,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::Full => "full",
            PipelineMode::Baseline => "baseline",
        }
    }
}

/// Knobs that shape a pipeline, independent of its collaborators.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Maximum in-flight per-sub-question calls within one stage
    pub concurrency: usize,
    pub search: SearchParams,
    /// Tags for the single widening retry; empty disables it
    pub fallback_tags: Vec<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            search: SearchParams::default(),
            fallback_tags: verirag_core::config::DEFAULT_FALLBACK_TAGS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            concurrency: config.pipeline.concurrency,
            search: SearchParams {
                top_k: config.retrieval.top_k,
                score_threshold: config.retrieval.score_threshold,
                show_image: config.retrieval.show_image,
            },
            fallback_tags: config.retrieval.fallback_tags.clone(),
        }
    }
}

/// Everything one invocation produced, stage by stage.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub mode: PipelineMode,
    pub started_at: DateTime<Utc>,
    pub complex_query: ComplexQuery,
    pub subquestions: Vec<String>,
    pub retrievals: Vec<SubQuestionDocs>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<AnsweredSubQuestion>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub verifications: Vec<VerificationResult>,
    pub evidence: Vec<StructuredEvidenceItem>,
    pub final_answer: FinalAnswer,
    /// The prompt sent to the fuser
    pub final_prompt: String,
    pub timings: Vec<StageTiming>,
}

impl PipelineRun {
    /// Sub-questions whose verified answer was carried into fusion.
    pub fn trusted_count(&self) -> usize {
        self.evidence
            .iter()
            .filter(|item| matches!(item.evidence, Evidence::Answer(_)))
            .count()
    }

    pub fn total_secs(&self) -> f64 {
        self.timings.iter().map(|t| t.secs).sum()
    }
}

/// The verified decomposition pipeline.
pub struct Pipeline {
    decomposer: QueryDecomposer,
    retriever: EvidenceRetriever,
    generator: SubAnswerGenerator,
    verifier: FaithfulnessVerifier,
    fuser: AnswerFuser,
    reporter: EventReporter,
}

impl Pipeline {
    /// Wire the stages.
    ///
    /// Fails if a stage prompt needs a variable its stage does not supply or
    /// its template does not render.
    pub fn new(
        completer: Completer,
        retriever: Arc<dyn Retriever>,
        prompts: StagePrompts,
        options: PipelineOptions,
    ) -> AppResult<Self> {
        check_stage_prompt(&prompts.decompose, Stage::Decompose, &["complex_query"])?;
        check_stage_prompt(&prompts.subanswer, Stage::Answer, &["question", "document"])?;
        check_stage_prompt(
            &prompts.verify,
            Stage::Verify,
            &["subquestion", "answer", "evidence", "document"],
        )?;
        check_stage_prompt(
            &prompts.fuse,
            Stage::Fuse,
            &["complex_query", "structured_evidence"],
        )?;

        let concurrency = options.concurrency.max(1);

        Ok(Self {
            decomposer: QueryDecomposer::new(completer.clone(), prompts.decompose),
            retriever: EvidenceRetriever::new(retriever)
                .with_params(options.search)
                .with_fallback_tags(options.fallback_tags)
                .with_concurrency(concurrency),
            generator: SubAnswerGenerator::new(completer.clone(), prompts.subanswer)
                .with_concurrency(concurrency),
            verifier: FaithfulnessVerifier::new(completer.clone(), prompts.verify)
                .with_concurrency(concurrency),
            fuser: AnswerFuser::new(completer, prompts.fuse),
            reporter: EventReporter::noop(),
        })
    }

    /// Send invocation events to `reporter`.
    pub fn with_reporter(mut self, reporter: EventReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Run the full pipeline. Only decomposition failure is an error.
    pub async fn run(&self, query: &ComplexQuery) -> AppResult<PipelineRun> {
        self.invoke(query, PipelineMode::Full).await
    }

    /// Run the baseline: raw retrieved documents go straight to fusion.
    pub async fn run_baseline(&self, query: &ComplexQuery) -> AppResult<PipelineRun> {
        self.invoke(query, PipelineMode::Baseline).await
    }

    async fn invoke(&self, query: &ComplexQuery, mode: PipelineMode) -> AppResult<PipelineRun> {
        let reporter = self.reporter.begin_run();
        let span = tracing::info_span!(
            "pipeline",
            run_id = %reporter.run_id(),
            mode = mode.as_str()
        );

        self.execute(query, mode, reporter).instrument(span).await
    }

    async fn execute(
        &self,
        query: &ComplexQuery,
        mode: PipelineMode,
        reporter: EventReporter,
    ) -> AppResult<PipelineRun> {
        let started_at = Utc::now();
        let mut timer = StageTimer::new();

        tracing::info!(province = query.province(), "Starting pipeline run");

        let started = Instant::now();
        let subquestions = self.decomposer.decompose(query.query()).await?;
        timer.record(Stage::Decompose, started);
        reporter.stage(
            Stage::Decompose,
            format!("{} sub-questions", subquestions.len()),
        );

        let started = Instant::now();
        let retrievals = self
            .retriever
            .retrieve(&subquestions, query.scene(), query.province(), &reporter)
            .await;
        timer.record(Stage::Retrieve, started);
        reporter.stage(Stage::Retrieve, summarize_retrieval(&retrievals));

        let (answers, verifications, evidence) = match mode {
            PipelineMode::Full => {
                let started = Instant::now();
                let answers = self.generator.answer_all(retrievals.clone(), &reporter).await;
                timer.record(Stage::Answer, started);

                let started = Instant::now();
                let verifications = self.verifier.verify_all(answers.clone(), &reporter).await;
                timer.record(Stage::Verify, started);

                let started = Instant::now();
                let evidence = select(&verifications);
                timer.record(Stage::Select, started);

                (answers, verifications, evidence)
            }
            PipelineMode::Baseline => {
                let started = Instant::now();
                let evidence = select_baseline(&retrievals);
                timer.record(Stage::Select, started);

                (Vec::new(), Vec::new(), evidence)
            }
        };

        let trusted = evidence
            .iter()
            .filter(|item| matches!(item.evidence, Evidence::Answer(_)))
            .count();
        reporter.stage(
            Stage::Select,
            format!("{}/{} sub-answers trusted", trusted, evidence.len()),
        );

        let started = Instant::now();
        let (final_answer, final_prompt) = self.fuser.fuse(query.query(), &evidence).await;
        timer.record(Stage::Fuse, started);
        reporter.stage(Stage::Fuse, "final answer ready");

        let timings = timer.finish();
        tracing::info!(
            subquestions = subquestions.len(),
            trusted,
            total_secs = timings.iter().map(|t| t.secs).sum::<f64>(),
            "Pipeline run finished"
        );

        Ok(PipelineRun {
            run_id: reporter.run_id(),
            mode,
            started_at,
            complex_query: query.clone(),
            subquestions,
            retrievals,
            answers,
            verifications,
            evidence,
            final_answer,
            final_prompt,
            timings,
        })
    }
}

/// Render a stage prompt with blank values for everything the stage supplies.
fn check_stage_prompt(
    definition: &PromptDefinition,
    stage: Stage,
    supplied: &[&str],
) -> AppResult<()> {
    let blanks: Vec<(&str, &str)> = supplied.iter().map(|name| (*name, "")).collect();
    render(definition, &blanks).map(|_| ()).map_err(|e| {
        AppError::Prompt(format!(
            "Prompt '{}' cannot be used for the {} stage: {}",
            definition.id, stage, e
        ))
    })
}

fn summarize_retrieval(retrievals: &[SubQuestionDocs]) -> String {
    let failed = retrievals.iter().filter(|r| r.failure.is_some()).count();
    let fallback = retrievals.iter().filter(|r| r.used_fallback).count();
    let documents: usize = retrievals.iter().map(|r| r.documents.len()).sum();
    format!(
        "{} documents, {} fallback searches, {} failures",
        documents, fallback, failed
    )
}
