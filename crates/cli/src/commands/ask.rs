//! Ask command handler.
//!
//! Runs the verified pipeline (or the baseline) on one complex question.

use super::common::{
    build_pipeline, format_timings, progress_reporter, to_json, with_deadline, QueryArgs,
};
use clap::Args;
use verirag_core::{config::AppConfig, AppResult};
use verirag_rag::{Evidence, PipelineRun};

/// Answer a complex question
#[derive(Args, Debug)]
pub struct AskCommand {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Skip sub-answer generation and verification; fuse raw documents
    #[arg(long)]
    pub baseline: bool,

    /// Output the whole run trace as JSON
    #[arg(long)]
    pub json: bool,

    /// Also print the prompt sent to the fuser
    #[arg(long)]
    pub show_prompt: bool,

    /// Also print per-stage timings
    #[arg(long)]
    pub timings: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let config = self.query.apply(config);
        let pipeline = build_pipeline(&config, progress_reporter(config.verbose))?;
        let query = self.query.complex_query(&config);

        let run = with_deadline(self.query.timeout_secs, async {
            if self.baseline {
                pipeline.run_baseline(&query).await
            } else {
                pipeline.run(&query).await
            }
        })
        .await?;

        if self.json {
            println!("{}", to_json(&run)?);
            return Ok(());
        }

        println!("{}", run.final_answer.answer);

        if config.verbose {
            print_evidence_summary(&run);
        }

        if self.show_prompt {
            println!("\n--- fusion prompt ---\n{}", run.final_prompt);
        }

        if self.timings {
            println!("\n--- timings ({}) ---\n{}", run.mode.as_str(), format_timings(&run));
        }

        Ok(())
    }
}

/// Which sub-questions were answered from verified sub-answers.
fn print_evidence_summary(run: &PipelineRun) {
    eprintln!();
    for (i, item) in run.evidence.iter().enumerate() {
        let source = match item.evidence {
            Evidence::Answer(_) => "verified answer",
            Evidence::Documents(_) => "raw documents",
        };
        eprintln!("  {}. {} [{}]", i + 1, item.subquestion, source);
    }
}
