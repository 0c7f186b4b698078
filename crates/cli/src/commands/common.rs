//! Arguments and wiring shared by the pipeline commands.

use clap::Args;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use verirag_core::{config::AppConfig, AppError, AppResult};
use verirag_llm::create_client;
use verirag_prompt::StagePrompts;
use verirag_rag::{
    ComplexQuery, Completer, EventReporter, HttpRetriever, Pipeline, PipelineEvent, PipelineOptions,
    PipelineRun, SceneTag,
};

/// The question and the knobs that scope one pipeline invocation.
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// The complex question to answer
    pub question: String,

    /// Scene tag(s) scoping retrieval (repeat or comma-separate for several)
    #[arg(short, long = "scene", required = true, value_delimiter = ',')]
    pub scene: Vec<String>,

    /// Province tag (default: pipeline.defaultProvince)
    #[arg(long)]
    pub province: Option<String>,

    /// Documents requested per search
    #[arg(long)]
    pub top_k: Option<u32>,

    /// Minimum retrieval score (0.0-1.0)
    #[arg(long)]
    pub score_threshold: Option<f32>,

    /// Maximum in-flight calls per stage
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Abort the whole invocation after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl QueryArgs {
    /// A copy of `config` with this invocation's overrides applied.
    pub fn apply(&self, config: &AppConfig) -> AppConfig {
        let mut config = config.clone();

        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = top_k;
        }
        if let Some(threshold) = self.score_threshold {
            config.retrieval.score_threshold = threshold;
        }
        if let Some(concurrency) = self.concurrency {
            config.pipeline.concurrency = concurrency;
        }

        config
    }

    pub fn complex_query(&self, config: &AppConfig) -> ComplexQuery {
        let province = self
            .province
            .clone()
            .unwrap_or_else(|| config.pipeline.default_province.clone());

        ComplexQuery::new(self.question.clone(), SceneTag::from(self.scene.clone()))
            .with_province(province)
    }
}

/// Build a pipeline from validated configuration.
pub fn build_pipeline(config: &AppConfig, reporter: EventReporter) -> AppResult<Pipeline> {
    config.validate()?;

    let provider_config = config.get_provider_config(&config.provider);
    let endpoint = provider_config.and_then(|pc| pc.endpoint());
    let timeout = provider_config
        .and_then(|pc| pc.timeout())
        .map(Duration::from_secs);
    let api_key = config.resolve_api_key(&config.provider);

    let client = create_client(&config.provider, endpoint, api_key.as_deref(), timeout)
        .map_err(AppError::Config)?;
    let completer = Completer::new(client, &config.model)
        .with_temperature(config.pipeline.temperature)
        .with_max_tokens(config.pipeline.max_tokens);

    let retriever = Arc::new(HttpRetriever::from_config(&config.retrieval)?);
    let prompts = StagePrompts::load(&config.workspace)?;

    tracing::debug!(
        provider = %config.provider,
        model = %config.model,
        concurrency = config.pipeline.concurrency,
        "Pipeline configured"
    );

    Ok(Pipeline::new(
        completer,
        retriever,
        prompts,
        PipelineOptions::from_config(config),
    )?
    .with_reporter(reporter))
}

/// Progress lines on stderr when verbose, otherwise log-only events.
pub fn progress_reporter(verbose: bool) -> EventReporter {
    if verbose {
        EventReporter::new(Arc::new(|event: PipelineEvent| eprintln!("{}", event.format_simple())))
    } else {
        EventReporter::noop()
    }
}

/// Await `fut`, giving up after `timeout_secs` when set.
pub async fn with_deadline<T, F>(timeout_secs: Option<u64>, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), fut)
            .await
            .map_err(|_| AppError::Timeout(secs))?,
        None => fut.await,
    }
}

/// Per-stage timings as aligned lines.
pub fn format_timings(run: &PipelineRun) -> String {
    let mut lines: Vec<String> = run
        .timings
        .iter()
        .map(|t| format!("  {:<10} {:>8.2}s", t.stage.as_str(), t.secs))
        .collect();
    lines.push(format!("  {:<10} {:>8.2}s", "total", run.total_secs()));
    lines.join("\n")
}

/// Pretty JSON for stdout.
pub fn to_json<T: serde::Serialize>(value: &T) -> AppResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> QueryArgs {
        QueryArgs {
            question: "why?".into(),
            scene: vec!["wlyh".into(), "xczc".into()],
            province: None,
            top_k: Some(8),
            score_threshold: None,
            concurrency: Some(1),
            timeout_secs: None,
        }
    }

    #[test]
    fn test_apply_overrides_only_given_values() {
        let config = AppConfig::default();
        let applied = args().apply(&config);

        assert_eq!(applied.retrieval.top_k, 8);
        assert_eq!(applied.retrieval.score_threshold, config.retrieval.score_threshold);
        assert_eq!(applied.pipeline.concurrency, 1);
    }

    #[test]
    fn test_complex_query_uses_default_province() {
        let mut config = AppConfig::default();
        config.pipeline.default_province = "gd".into();

        let query = args().complex_query(&config);
        assert_eq!(query.province(), "gd");
        assert_eq!(query.scene().tags(), vec!["wlyh", "xczc"]);

        let mut explicit = args();
        explicit.province = Some("wh".into());
        assert_eq!(explicit.complex_query(&config).province(), "wh");
    }

    #[tokio::test]
    async fn test_deadline_maps_to_timeout_error() {
        let result: AppResult<()> = with_deadline(Some(0), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(AppError::Timeout(0))));

        let result = with_deadline(None, async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_build_pipeline_requires_retrieval_endpoint() {
        let config = AppConfig::default();
        assert!(build_pipeline(&config, EventReporter::noop()).is_err());
    }
}
