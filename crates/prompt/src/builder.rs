//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use std::collections::HashMap;
use verirag_core::{AppError, AppResult};

/// Build a prompt from a definition and input variables.
///
/// This function:
/// 1. Checks that every variable declared in `input.variables` is supplied
/// 2. Renders the template using Handlebars with HTML escaping disabled
/// 3. Returns a `BuiltPrompt` ready for LLM execution
///
/// # Example
/// ```no_run
/// use verirag_prompt::{build_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("complex_query".to_string(), "What changed and why?".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::trace!("Building prompt: {}", definition.id);

    let missing: Vec<&str> = definition
        .input
        .variables
        .iter()
        .filter(|name| !variables.contains_key(name.as_str()))
        .map(String::as_str)
        .collect();

    if !missing.is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' is missing variables: {}",
            definition.id,
            missing.join(", ")
        )));
    }

    let rendered = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(rendered, definition.id.clone(), variables))
}

/// Render a Handlebars template with variables.
pub(crate) fn render_template(
    template: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PromptInputSpec, PromptOutputSpec};

    fn create_test_definition(template: &str, variables: &[&str]) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            input: PromptInputSpec {
                variables: variables.iter().map(|v| v.to_string()).collect(),
            },
            template: template.to_string(),
            output: PromptOutputSpec {
                format: "json".to_string(),
                schema: None,
            },
        }
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Hello, world!".to_string());

        let result = render_template("Question: {{question}}", &vars).unwrap();
        assert_eq!(result, "Question: Hello, world!");
    }

    #[test]
    fn test_render_does_not_escape() {
        let mut vars = HashMap::new();
        vars.insert("document".to_string(), "a < b && \"c\"".to_string());

        let result = render_template("{{document}}", &vars).unwrap();
        assert_eq!(result, "a < b && \"c\"");
    }

    #[test]
    fn test_build_prompt_records_metadata() {
        let def = create_test_definition("Q: {{question}}\nD: {{document}}", &["question", "document"]);
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "why?".to_string());
        vars.insert("document".to_string(), "because".to_string());

        let built = build_prompt(&def, vars).unwrap();
        assert_eq!(built.user, "Q: why?\nD: because");
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
        assert_eq!(built.metadata.resolved_variables.len(), 2);
    }

    #[test]
    fn test_build_prompt_missing_declared_variable() {
        let def = create_test_definition("Q: {{question}}", &["question"]);
        let err = build_prompt(&def, HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("missing variables: question"));
    }

    #[test]
    fn test_render_template_missing_undeclared_variable() {
        let vars = HashMap::new();
        let result = render_template("Question: {{missing}}", &vars);
        // Handlebars renders missing variables as empty string
        assert_eq!(result.unwrap(), "Question: ");
    }

    #[test]
    fn test_render_json_braces_survive() {
        let vars = HashMap::new();
        let result = render_template(r#"{"answer": "x"}"#, &vars).unwrap();
        assert_eq!(result, r#"{"answer": "x"}"#);
    }
}
