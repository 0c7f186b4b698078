//! The set of prompts one pipeline invocation renders.

use crate::loader::{load_builtin, load_prompt};
use crate::types::PromptDefinition;
use std::path::Path;
use verirag_core::AppResult;

pub const DECOMPOSE_PROMPT_ID: &str = "rag.decompose";
pub const SUBANSWER_PROMPT_ID: &str = "rag.subanswer";
pub const VERIFY_PROMPT_ID: &str = "rag.verify";
pub const FUSE_PROMPT_ID: &str = "rag.fuse";

/// One prompt definition per model-backed pipeline stage.
#[derive(Debug, Clone)]
pub struct StagePrompts {
    pub decompose: PromptDefinition,
    pub subanswer: PromptDefinition,
    pub verify: PromptDefinition,
    pub fuse: PromptDefinition,
}

impl StagePrompts {
    /// Built-in prompts only.
    pub fn builtin() -> AppResult<Self> {
        Ok(Self {
            decompose: load_builtin(DECOMPOSE_PROMPT_ID)?,
            subanswer: load_builtin(SUBANSWER_PROMPT_ID)?,
            verify: load_builtin(VERIFY_PROMPT_ID)?,
            fuse: load_builtin(FUSE_PROMPT_ID)?,
        })
    }

    /// Built-in prompts with any workspace overrides applied.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        Ok(Self {
            decompose: load_prompt(workspace_path, DECOMPOSE_PROMPT_ID)?.0,
            subanswer: load_prompt(workspace_path, SUBANSWER_PROMPT_ID)?.0,
            verify: load_prompt(workspace_path, VERIFY_PROMPT_ID)?.0,
            fuse: load_prompt(workspace_path, FUSE_PROMPT_ID)?.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_stage_prompts() {
        let prompts = StagePrompts::builtin().unwrap();
        assert_eq!(prompts.decompose.id, DECOMPOSE_PROMPT_ID);
        assert_eq!(prompts.subanswer.id, SUBANSWER_PROMPT_ID);
        assert_eq!(prompts.verify.id, VERIFY_PROMPT_ID);
        assert_eq!(prompts.fuse.id, FUSE_PROMPT_ID);
    }

    #[test]
    fn test_load_without_overrides_matches_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let prompts = StagePrompts::load(temp_dir.path()).unwrap();
        let builtin = StagePrompts::builtin().unwrap();
        assert_eq!(prompts.fuse.template, builtin.fuse.template);
    }
}
