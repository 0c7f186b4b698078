//! Prompts command handler.

use clap::Args;
use verirag_core::{config::AppConfig, AppResult};
use verirag_prompt::{list_prompts, load_prompt, PromptSource};

/// List stage prompts and workspace overrides
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Print the resolved template of one prompt
    #[arg(long)]
    pub show: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing prompts command");

        if let Some(id) = &self.show {
            let (definition, source) = load_prompt(&config.workspace, id)?;
            if self.json {
                println!("{}", super::common::to_json(&definition)?);
            } else {
                println!("# {} ({}, {})", definition.id, definition.title, source_label(source));
                println!("{}", definition.template);
            }
            return Ok(());
        }

        let prompts = list_prompts(&config.workspace)?;

        if self.json {
            let output: Vec<_> = prompts
                .iter()
                .map(|(id, source)| serde_json::json!({ "id": id, "source": source }))
                .collect();
            println!("{}", super::common::to_json(&output)?);
        } else {
            for (id, source) in &prompts {
                println!("{:<16} {}", id, source_label(*source));
            }
        }

        Ok(())
    }
}

fn source_label(source: PromptSource) -> &'static str {
    match source {
        PromptSource::Builtin => "builtin",
        PromptSource::Workspace => "workspace override",
    }
}
