//! Covenant LLM Provider Layer
//!
//! Chat-completion providers implementing the `LlmProvider` trait from
//! `covenant-domain`, plus helpers for pulling structured JSON out of model
//! replies.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic scripted provider for testing
//! - `OpenAiProvider`: OpenAI-compatible `/v1/chat/completions` with tool calling and JSON mode
//! - `OllamaProvider`: Local Ollama `/api/chat` integration
//!
//! # Examples
//!
//! ```
//! use covenant_domain::traits::LlmProvider;
//! use covenant_domain::{CompletionRequest, Message};
//! use covenant_llm::MockProvider;
//!
//! # tokio_test_block_on(async {
//! let provider = MockProvider::new("Hello from LLM!");
//! let reply = provider
//!     .complete(CompletionRequest::new(vec![Message::user("test prompt")]))
//!     .await
//!     .unwrap();
//! assert_eq!(reply.answer(), Some("Hello from LLM!"));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

#![warn(missing_docs)]

pub mod mock;
pub mod ollama;
pub mod openai;
pub mod structured;

use thiserror::Error;

pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use structured::{extract_json, parse_structured};

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Credentials rejected by the provider
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Map a non-success HTTP status to an error
    pub(crate) fn from_status(status: reqwest::StatusCode, body: String, model: &str) -> Self {
        match status {
            reqwest::StatusCode::NOT_FOUND => LlmError::ModelNotAvailable(model.to_string()),
            reqwest::StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimitExceeded,
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                LlmError::Authentication(format!("HTTP {}", status))
            }
            _ => LlmError::Communication(format!("HTTP {}: {}", status, body)),
        }
    }

    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Communication(_) | LlmError::RateLimitExceeded)
    }
}
