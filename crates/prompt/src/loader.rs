//! Prompt loader for built-in and workspace prompt definitions.
//!
//! Every stage prompt ships compiled into the binary. A workspace can replace
//! any of them by dropping `<id>.yml` into `.verirag/prompts/`.

use crate::types::{PromptDefinition, PromptSource};
use std::path::{Path, PathBuf};
use verirag_core::{AppError, AppResult};

/// Built-in prompt definitions as `(id, yaml)` pairs.
const BUILTIN_PROMPTS: [(&str, &str); 4] = [
    ("rag.decompose", include_str!("../prompts/rag.decompose.yml")),
    ("rag.subanswer", include_str!("../prompts/rag.subanswer.yml")),
    ("rag.verify", include_str!("../prompts/rag.verify.yml")),
    ("rag.fuse", include_str!("../prompts/rag.fuse.yml")),
];

/// Directory holding workspace prompt overrides.
pub fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".verirag/prompts")
}

/// Load a built-in prompt definition by ID.
pub fn load_builtin(prompt_id: &str) -> AppResult<PromptDefinition> {
    let (_, yaml) = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown built-in prompt: {}", prompt_id)))?;

    let definition: PromptDefinition = serde_yaml::from_str(yaml).map_err(|e| {
        AppError::Prompt(format!("Failed to parse built-in prompt {}: {}", prompt_id, e))
    })?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Load a prompt definition by ID, preferring a workspace override.
///
/// Looks for `.verirag/prompts/<id>.yml` first and falls back to the
/// built-in definition of the same ID.
///
/// # Example
/// ```no_run
/// use verirag_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (prompt, source) = load_prompt(Path::new("."), "rag.fuse")?;
/// println!("Loaded prompt: {} ({:?})", prompt.title, source);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(
    workspace_path: &Path,
    prompt_id: &str,
) -> AppResult<(PromptDefinition, PromptSource)> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        tracing::debug!("Using built-in prompt: {}", prompt_id);
        return Ok((load_builtin(prompt_id)?, PromptSource::Builtin));
    }

    tracing::debug!("Loading prompt override from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file {:?} declares id '{}', expected '{}'",
            prompt_file, definition.id, prompt_id
        )));
    }

    tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);

    Ok((definition, PromptSource::Workspace))
}

/// List all available prompt IDs with where each one resolves from.
///
/// Built-ins come first in pipeline order, followed by any extra workspace
/// prompts sorted by ID.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<(String, PromptSource)>> {
    let overrides = workspace_prompt_ids(workspace_path);

    let mut listing: Vec<(String, PromptSource)> = BUILTIN_PROMPTS
        .iter()
        .map(|(id, _)| {
            let source = if overrides.iter().any(|o| o == id) {
                PromptSource::Workspace
            } else {
                PromptSource::Builtin
            };
            (id.to_string(), source)
        })
        .collect();

    let mut extra: Vec<String> = overrides
        .into_iter()
        .filter(|id| !BUILTIN_PROMPTS.iter().any(|(b, _)| b == id))
        .collect();
    extra.sort();

    listing.extend(extra.into_iter().map(|id| (id, PromptSource::Workspace)));
    Ok(listing)
}

fn workspace_prompt_ids(workspace_path: &Path) -> Vec<String> {
    let dir = prompts_dir(workspace_path);
    if !dir.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("yml"))
        .filter_map(|e| {
            e.path()
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .collect()
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    for var in &def.input.variables {
        if !def.template.contains(&format!("{{{{{}}}}}", var)) {
            return Err(AppError::Prompt(format!(
                "Prompt '{}' declares variable '{}' but its template never uses it",
                def.id, var
            )));
        }
    }

    Ok(())
}
