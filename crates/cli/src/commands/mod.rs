//! Command handlers for the verirag CLI.

pub mod ask;
pub mod common;
pub mod compare;
pub mod prompts;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use compare::CompareCommand;
pub use prompts::PromptsCommand;
