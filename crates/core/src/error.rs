//! Error types for verirag.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application, including configuration, I/O, LLM, retrieval, prompt,
//! and decomposition errors.

use thiserror::Error;

/// Unified error type for verirag.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// Per-sub-question failures are turned into data by the pipeline stages;
/// only invocation-fatal conditions surface as an `AppError`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Retrieval service errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// The decomposition output did not match the expected JSON array schema.
    ///
    /// Carries the raw model output so the failure stays observable.
    #[error("Decomposition failed ({reason}); model output: {raw}")]
    Decomposition { reason: String, raw: String },

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An invocation exceeded its deadline
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Build a decomposition error from a reason and the raw model output.
    pub fn decomposition(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        AppError::Decomposition {
            reason: reason.into(),
            raw: raw.into(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decomposition_error_carries_raw_output() {
        let err = AppError::decomposition("expected a JSON array", "not json at all");
        let msg = err.to_string();
        assert!(msg.contains("expected a JSON array"));
        assert!(msg.contains("not json at all"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let err: AppError = serde_json::from_str::<Vec<String>>("{").unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
