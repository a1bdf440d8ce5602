//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Extraction error
    #[error(transparent)]
    Extractor(#[from] covenant_extractor::ExtractorError),

    /// Comparison error
    #[error(transparent)]
    Comparator(#[from] covenant_comparator::ComparatorError),

    /// Manifest error
    #[error("Manifest error: {0}")]
    Manifest(#[from] covenant_domain::ManifestError),

    /// Vector store error
    #[error("Store error: {0}")]
    Store(#[from] covenant_store::StoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
