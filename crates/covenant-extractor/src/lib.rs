//! Covenant Extractor
//!
//! Turns vendor contracts into structured SLA targets.
//!
//! # Architecture
//!
//! ```text
//! Document → Preprocessor → chunks → VectorStore
//!                                        │
//! Manifest → ExtractionEngine → (per field) Summarizer ⇄ retrieve
//!                                           ↓
//!                                       SchemaFormatter → ExtractedDocument
//! ```
//!
//! The [`DocumentPreprocessor`] runs once per uploaded contract. The
//! [`ExtractionEngine`] then runs every manifest field through the
//! [`FieldSummarizer`] and [`SchemaFormatter`], concurrently and with
//! per-field failure isolation.
//!
//! # Example Usage
//!
//! ```no_run
//! use covenant_extractor::{DocumentPreprocessor, ExtractionEngine, ExtractorConfig};
//! use covenant_llm::MockProvider;
//! use covenant_store::{HashEmbedder, MemoryStore};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExtractorConfig::default();
//! let embedder = Arc::new(HashEmbedder::new(256));
//! let store = Arc::new(MemoryStore::default());
//!
//! let preprocessor = DocumentPreprocessor::new(
//!     Arc::clone(&embedder),
//!     Arc::clone(&store),
//!     config.chunking.clone(),
//! )?;
//! preprocessor
//!     .process(Path::new("contract.pdf"), "contract-1", "_acme")
//!     .await?;
//!
//! let llm = Arc::new(MockProvider::default());
//! let engine = ExtractionEngine::new("manifest.json", llm, embedder, store, config)?;
//! let outcome = engine.extract("contract-1", "_acme").await?;
//!
//! println!("{}", serde_json::to_string_pretty(&outcome.document)?);
//! println!("Failed fields: {}", outcome.failures.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod chunking;
mod config;
mod engine;
mod error;
mod formatter;
mod loader;
pub mod parser;
mod preprocess;
pub mod prompt;
mod summarizer;
mod types;

#[cfg(test)]
mod tests;

pub use chunking::{split_sentences, SemanticChunker};
pub use config::{ChunkingConfig, ExtractorConfig};
pub use engine::ExtractionEngine;
pub use error::ExtractorError;
pub use formatter::{SchemaFormatter, MAX_FORMAT_ATTEMPTS};
pub use loader::{load_document, DocumentFormat};
pub use preprocess::DocumentPreprocessor;
pub use summarizer::FieldSummarizer;
pub use types::{
    ExtractionMetadata, ExtractionOutcome, FieldFailure, FieldSummary, FormattedRecord,
    PreprocessReport,
};
