//! Configuration management for verirag.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config files (.verirag/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Precedence grows in that order: CLI flags win over environment variables,
//! which win over the YAML file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Scene tags used when a sub-question's primary retrieval comes back empty.
pub const DEFAULT_FALLBACK_TAGS: [&str; 5] = ["wlyh", "wxwy", "xczc", "yyjc", "xczhw"];

/// Providers understood by the LLM factory.
pub const KNOWN_PROVIDERS: [&str; 2] = ["openai", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .verirag/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Completion provider ("openai" or "ollama")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log format ("pretty" or "json")
    pub log_format: String,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Retrieval service settings
    pub retrieval: RetrievalConfig,

    /// Pipeline tuning
    pub pipeline: PipelineConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    /// Any OpenAI-compatible chat completions endpoint
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        timeout: Option<u64>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenAI { model, .. } => model,
            ProviderConfig::Ollama { model, .. } => model,
        }
    }

    /// Endpoint configured for this provider, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }

    /// Request timeout in seconds, if configured.
    pub fn timeout(&self) -> Option<u64> {
        match self {
            ProviderConfig::OpenAI { timeout, .. } | ProviderConfig::Ollama { timeout, .. } => {
                *timeout
            }
        }
    }
}

/// Retrieval service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Full URL of the tag-scoped search endpoint
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the `X-APP-ID` header value
    #[serde(rename = "appIdEnv", default)]
    pub app_id_env: Option<String>,

    /// Environment variable holding the `X-APP-KEY` header value
    #[serde(rename = "appKeyEnv", default)]
    pub app_key_env: Option<String>,

    /// Documents requested per search
    #[serde(rename = "topK", default = "default_top_k")]
    pub top_k: u32,

    /// Minimum relevance score applied by the service
    #[serde(rename = "scoreThreshold", default = "default_score_threshold")]
    pub score_threshold: f32,

    /// Ask the service to include image links
    #[serde(rename = "showImage", default = "default_true")]
    pub show_image: bool,

    /// Scene tags used for the single widening retry
    #[serde(rename = "fallbackTags", default = "default_fallback_tags")]
    pub fallback_tags: Vec<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            app_id_env: None,
            app_key_env: None,
            top_k: default_top_k(),
            score_threshold: default_score_threshold(),
            show_image: true,
            fallback_tags: default_fallback_tags(),
            timeout: default_timeout_secs(),
        }
    }
}

impl RetrievalConfig {
    /// Resolve the `(X-APP-ID, X-APP-KEY)` header values from the environment.
    pub fn resolve_credentials(&self) -> (Option<String>, Option<String>) {
        let read = |name: &Option<String>| name.as_ref().and_then(|n| std::env::var(n).ok());
        (read(&self.app_id_env), read(&self.app_key_env))
    }
}

/// Pipeline tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum in-flight per-sub-question calls within one stage
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Province tag used when the caller does not give one
    #[serde(rename = "defaultProvince", default = "default_province")]
    pub default_province: String,

    /// Sampling temperature passed to every completion
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Token limit passed to every completion
    #[serde(rename = "maxTokens", default)]
    pub max_tokens: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            default_province: default_province(),
            temperature: None,
            max_tokens: None,
        }
    }
}

fn default_top_k() -> u32 {
    5
}

fn default_score_threshold() -> f32 {
    0.5
}

fn default_true() -> bool {
    true
}

fn default_fallback_tags() -> Vec<String> {
    DEFAULT_FALLBACK_TAGS.iter().map(|t| t.to_string()).collect()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_concurrency() -> usize {
    4
}

fn default_province() -> String {
    "hq".to_string()
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    retrieval: Option<RetrievalConfig>,
    pipeline: Option<PipelineConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "qwen3".to_string(),
            api_key: None,
            log_level: None,
            log_format: "pretty".to_string(),
            verbose: false,
            no_color: false,
            llm: None,
            retrieval: RetrievalConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and environment variables.
    ///
    /// Environment variables:
    /// - `VERIRAG_WORKSPACE`: Override workspace path
    /// - `VERIRAG_CONFIG`: Path to config file
    /// - `VERIRAG_PROVIDER`: LLM provider
    /// - `VERIRAG_MODEL`: Model identifier
    /// - `VERIRAG_API_KEY`: API key
    /// - `VERIRAG_RETRIEVAL_ENDPOINT`: Retrieval service URL
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use verirag_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration for an explicitly chosen workspace and config file.
    ///
    /// `workspace` and `config_file` win over `VERIRAG_WORKSPACE` and
    /// `VERIRAG_CONFIG`. The YAML file is `config_file` when given, otherwise
    /// `<workspace>/.verirag/config.yaml`. Environment variables are applied
    /// after the YAML file either way.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var("VERIRAG_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("VERIRAG_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.verirag_dir().join("config.yaml"));

        if config.config_file.is_some() || config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("VERIRAG_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("VERIRAG_MODEL") {
            config.model = model;
        }

        if let Ok(endpoint) = std::env::var("VERIRAG_RETRIEVAL_ENDPOINT") {
            config.retrieval.endpoint = Some(endpoint);
        }

        config.api_key = std::env::var("VERIRAG_API_KEY").ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into a copy of this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(pipeline) = config_file.pipeline {
            result.pipeline = pipeline;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the YAML file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .verirag directory.
    pub fn verirag_dir(&self) -> PathBuf {
        self.workspace.join(".verirag")
    }

    /// Get the configuration of a named provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Resolve API key from `VERIRAG_API_KEY` or the provider's `apiKeyEnv`.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => std::env::var(api_key_env).ok(),
            _ => None,
        }
    }

    /// Validate configuration for the active provider and the retrieval service.
    pub fn validate(&self) -> AppResult<()> {
        let provider = &self.provider;

        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if let Some(ProviderConfig::OpenAI { api_key_env, .. }) = self.get_provider_config(provider)
        {
            if self.api_key.is_none() && std::env::var(api_key_env).is_err() {
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    api_key_env
                )));
            }
        }

        if self.retrieval.endpoint.is_none() {
            return Err(AppError::Config(
                "No retrieval endpoint configured (retrieval.endpoint or VERIRAG_RETRIEVAL_ENDPOINT)"
                    .to_string(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("retrieval.topK must be at least 1".to_string()));
        }

        if !(0.0..=1.0).contains(&self.retrieval.score_threshold) {
            return Err(AppError::Config(format!(
                "retrieval.scoreThreshold must be within [0, 1], got {}",
                self.retrieval.score_threshold
            )));
        }

        if self.pipeline.concurrency == 0 {
            return Err(AppError::Config(
                "pipeline.concurrency must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn with_endpoint() -> AppConfig {
        let mut config = AppConfig::default();
        config.retrieval.endpoint = Some("http://localhost:9000/query".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.score_threshold, 0.5);
        assert_eq!(config.retrieval.fallback_tags.len(), 5);
        assert_eq!(config.pipeline.default_province, "hq");
        assert!(!config.verbose);
    }

    #[test]
    fn test_verirag_dir() {
        let config = AppConfig::default();
        assert!(config.verirag_dir().ends_with(".verirag"));
    }

    #[test]
    fn test_with_overrides() {
        let overridden = AppConfig::default().with_overrides(
            None,
            None,
            Some("openai".to_string()),
            Some("qwen3-32b".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "openai");
        assert_eq!(overridden.model, "qwen3-32b");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  activeProvider: openai
  providers:
    openai:
      apiKeyEnv: VERIRAG_TEST_KEY_UNSET
      model: qwen3-32b
      endpoint: https://llm.example.com/v1
    ollama:
      endpoint: http://localhost:11434
      model: qwen3
retrieval:
  endpoint: http://search.example.com/bm/query
  topK: 8
  fallbackTags: [a, b]
pipeline:
  concurrency: 2
logging:
  level: warn
  format: json
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.provider, "openai");
        assert_eq!(merged.model, "qwen3-32b");
        assert_eq!(merged.retrieval.top_k, 8);
        assert_eq!(merged.retrieval.score_threshold, 0.5);
        assert_eq!(merged.retrieval.fallback_tags, vec!["a", "b"]);
        assert_eq!(merged.pipeline.concurrency, 2);
        assert_eq!(merged.pipeline.default_province, "hq");
        assert_eq!(merged.log_level, Some("warn".to_string()));
        assert_eq!(merged.log_format, "json");

        let openai = merged.get_provider_config("openai").unwrap();
        assert_eq!(openai.endpoint(), Some("https://llm.example.com/v1"));
        assert!(matches!(
            merged.get_provider_config("ollama"),
            Some(ProviderConfig::Ollama { .. })
        ));
    }

    #[test]
    fn test_load_from_reads_chosen_workspace() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".verirag");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.yaml"),
            "retrieval:\n  endpoint: http://search.example.com/bm/query\n  topK: 7\npipeline:\n  concurrency: 3\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.workspace, temp.path());
        assert_eq!(config.retrieval.top_k, 7);
        assert_eq!(config.pipeline.concurrency, 3);
        assert!(config.retrieval.endpoint.is_some());
    }

    #[test]
    fn test_load_from_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.yaml");
        std::fs::write(&path, "retrieval:\n  topK: 9\n").unwrap();

        let config =
            AppConfig::load_from(Some(temp.path().to_path_buf()), Some(path.clone())).unwrap();
        assert_eq!(config.config_file, Some(path));
        assert_eq!(config.retrieval.top_k, 9);

        let missing = temp.path().join("absent.yaml");
        assert!(AppConfig::load_from(Some(temp.path().to_path_buf()), Some(missing)).is_err());
    }

    #[test]
    fn test_load_from_missing_workspace() {
        let temp = TempDir::new().unwrap();
        let gone = temp.path().join("nope");
        assert!(AppConfig::load_from(Some(gone), None).is_err());
    }

    #[test]
    fn test_merge_yaml_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "retrieval: [not, a, map]").unwrap();
        assert!(AppConfig::default().merge_yaml(&path).is_err());
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = with_endpoint();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_retrieval_endpoint() {
        let config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retrieval endpoint"));
        assert!(with_endpoint().validate().is_ok());
    }

    #[test]
    fn test_validate_ranges() {
        let mut config = with_endpoint();
        config.retrieval.score_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = with_endpoint();
        config.pipeline.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = with_endpoint();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-test".to_string());
        assert_eq!(config.resolve_api_key("openai"), Some("sk-test".to_string()));
    }
}
