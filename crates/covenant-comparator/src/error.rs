//! Error types for the Metric Comparator

use thiserror::Error;

/// Errors that can occur while comparing a metric
#[derive(Error, Debug)]
pub enum ComparatorError {
    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Model reply failed validation
    #[error("Malformed output: {0}")]
    MalformedOutput(String),

    /// Reading or target cannot be compared
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ComparatorError {
    fn from(e: serde_json::Error) -> Self {
        ComparatorError::MalformedOutput(e.to_string())
    }
}
