//! Compare command handler.
//!
//! Runs the baseline and the verified pipeline on the same question so the
//! effect of generation and verification can be judged side by side.

use super::common::{
    build_pipeline, format_timings, progress_reporter, to_json, with_deadline, QueryArgs,
};
use clap::Args;
use verirag_core::{config::AppConfig, AppError, AppResult};

/// Run the baseline and the verified pipeline on the same question
#[derive(Args, Debug)]
pub struct CompareCommand {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Output both run traces as JSON
    #[arg(long)]
    pub json: bool,
}

impl CompareCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing compare command");

        let config = self.query.apply(config);
        let pipeline = build_pipeline(&config, progress_reporter(config.verbose))?;
        let query = self.query.complex_query(&config);

        let (baseline, full) = with_deadline(self.query.timeout_secs, async {
            let baseline = pipeline.run_baseline(&query).await?;
            let full = pipeline.run(&query).await?;
            Ok::<_, AppError>((baseline, full))
        })
        .await?;

        if self.json {
            let output = serde_json::json!({
                "baseline": baseline,
                "full": full,
            });
            println!("{}", to_json(&output)?);
            return Ok(());
        }

        println!("=== baseline ===");
        println!("{}", baseline.final_answer.answer);
        println!("{}", format_timings(&baseline));

        println!();
        println!("=== verified ===");
        println!("{}", full.final_answer.answer);
        println!(
            "  {}/{} sub-answers trusted",
            full.trusted_count(),
            full.evidence.len()
        );
        println!("{}", format_timings(&full));

        Ok(())
    }
}
