//! Error types for the extraction pipeline

use covenant_domain::ManifestError;
use thiserror::Error;

/// Errors that can occur during preprocessing and extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Missing or unreadable input document
    #[error("Input error: {0}")]
    Input(String),

    /// Schema manifest could not be loaded
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Document text could not be extracted
    #[error("Failed to load document '{path}': {reason}")]
    Load {
        /// Document path
        path: String,
        /// Why loading failed
        reason: String,
    },

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding backend error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector store error
    #[error("Store error: {0}")]
    Store(String),

    /// Retrieval found no passages for the field
    #[error("No context retrieved for field '{0}'")]
    NoContext(String),

    /// Model reply failed validation
    #[error("Malformed output: {0}")]
    MalformedOutput(String),

    /// A field task panicked or was cancelled
    #[error("Field task failed: {0}")]
    Task(String),

    /// Extraction timeout
    #[error("Extraction timeout")]
    Timeout,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExtractorError {
    pub(crate) fn llm(e: impl std::fmt::Display) -> Self {
        ExtractorError::Llm(e.to_string())
    }

    pub(crate) fn embedding(e: impl std::fmt::Display) -> Self {
        ExtractorError::Embedding(e.to_string())
    }

    pub(crate) fn store(e: impl std::fmt::Display) -> Self {
        ExtractorError::Store(e.to_string())
    }
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::MalformedOutput(e.to_string())
    }
}
