//! Prompt system for verirag.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions (built in, overridable per workspace)
//! - Handlebars template rendering
//! - The stage prompt set used by the pipeline

pub mod builder;
pub mod library;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use library::StagePrompts;
pub use loader::{list_prompts, load_builtin, load_prompt};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptInputSpec, PromptOutputSpec,
    PromptSource,
};
