//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::chunk::{Chunk, SearchHit};
use crate::conversation::{CompletionReply, CompletionRequest};
use async_trait::async_trait;

/// Chat-completion backend
///
/// Implemented by the infrastructure layer (covenant-llm)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Error type for LLM operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run one completion round
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionReply, Self::Error>;

    /// Model identifier, for logging and outcome metadata
    fn model_name(&self) -> &str;
}

/// Text embedding backend
///
/// Implemented by the infrastructure layer (covenant-store)
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Error type for embedding operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Embed a batch of passages, one vector per input in order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Self::Error>;

    /// Embed a single search query
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, Self::Error>;

    /// Width of produced vectors
    fn dimension(&self) -> usize;
}

/// Per-vendor chunk collection with similarity and full-text search
///
/// Implemented by the infrastructure layer (covenant-store)
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Error type for store operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create the collection if it does not exist yet
    async fn ensure_collection(&self, collection: &str, dimension: usize)
        -> Result<(), Self::Error>;

    /// Append chunks, returning how many were stored
    async fn insert(&self, collection: &str, chunks: Vec<Chunk>) -> Result<usize, Self::Error>;

    /// Nearest chunks to `vector`, restricted to `document_ids` (empty: all)
    async fn search_by_vector(
        &self,
        collection: &str,
        vector: &[f32],
        document_ids: &[String],
        limit: usize,
    ) -> Result<Vec<SearchHit>, Self::Error>;

    /// Lexical (BM25) search, restricted to `document_ids` (empty: all)
    async fn search_full_text(
        &self,
        collection: &str,
        query: &str,
        document_ids: &[String],
        limit: usize,
    ) -> Result<Vec<SearchHit>, Self::Error>;

    /// Whether [`VectorStore::search_full_text`] is available
    fn supports_full_text(&self) -> bool;
}
