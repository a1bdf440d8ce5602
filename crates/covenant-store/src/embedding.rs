//! Embedding Models for Text Vectorization
//!
//! # Architecture
//!
//! - **OpenAiEmbedder**: Remote embeddings via an OpenAI-compatible `/v1/embeddings` endpoint
//! - **HashEmbedder**: Deterministic hashed bag-of-words embeddings for tests and offline runs
//!
//! # Examples
//!
//! ```rust
//! use covenant_store::embedding::HashEmbedder;
//!
//! let model = HashEmbedder::new(64);
//! let a = model.embed_text("uptime must remain above 99.9 percent").unwrap();
//! let b = model.embed_text("uptime must remain above 99.9 percent").unwrap();
//! assert_eq!(a, b);
//! assert_eq!(a.len(), 64);
//! ```

use async_trait::async_trait;
use covenant_domain::traits::Embedder;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Invalid input text
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Response could not be decoded or was incomplete
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Returned vectors do not have the configured width
    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension
        expected: usize,
        /// Returned dimension
        actual: usize,
    },
}

/// Deterministic embedder based on hashed word features
///
/// Each lowercase word is hashed into a bucket with a hashed sign, and the
/// result is normalized to unit length. Texts sharing vocabulary get a high
/// cosine similarity, which is enough for retrieval and chunk-boundary tests.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create a new hash embedder
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn hash_with_seed(token: &str, seed: u64) -> u64 {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        seed.hash(&mut hasher);
        hasher.finish()
    }

    /// Embed a single text synchronously
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Empty text cannot be embedded".to_string(),
            ));
        }
        if self.dimension == 0 {
            return Err(EmbeddingError::InvalidInput(
                "Embedding dimension must be greater than 0".to_string(),
            ));
        }

        let mut embedding = vec![0.0f32; self.dimension];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        for token in tokens {
            let bucket = (Self::hash_with_seed(&token, 0) % self.dimension as u64) as usize;
            let sign = if Self::hash_with_seed(&token, 1) % 2 == 0 {
                1.0
            } else {
                -1.0
            };
            embedding[bucket] += sign;
        }

        // Text made only of punctuation still gets a stable vector
        if embedding.iter().all(|v| *v == 0.0) {
            let bucket = (Self::hash_with_seed(text, 2) % self.dimension as u64) as usize;
            embedding[bucket] = 1.0;
        }

        // Normalize to unit length for cosine similarity
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        for value in &mut embedding {
            *value /= magnitude;
        }
        Ok(embedding)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    type Error = EmbeddingError;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Self::Error> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, Self::Error> {
        self.embed_text(text)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Width of [`DEFAULT_EMBEDDING_MODEL`] vectors
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

/// Embedder backed by an OpenAI-compatible `/v1/embeddings` endpoint
pub struct OpenAiEmbedder {
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl OpenAiEmbedder {
    /// Create an embedder
    ///
    /// `dimension` must match what `model` returns; it sizes new collections.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimension,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Model identifier
    pub fn model(&self) -> &str {
        &self.model
    }

    fn order_and_check(
        &self,
        mut data: Vec<EmbeddingDatum>,
        expected: usize,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if data.len() != expected {
            return Err(EmbeddingError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                expected,
                data.len()
            )));
        }
        data.sort_by_key(|d| d.index);
        data.into_iter()
            .map(|d| {
                if d.embedding.len() != self.dimension {
                    Err(EmbeddingError::DimensionMismatch {
                        expected: self.dimension,
                        actual: d.embedding.len(),
                    })
                } else {
                    Ok(d.embedding)
                }
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    type Error = EmbeddingError;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Self::Error> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(model = %self.model, inputs = texts.len(), "Requesting embeddings");

        let url = format!("{}/v1/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EmbeddingError::Communication(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            EmbeddingError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;
        self.order_and_check(parsed.data, texts.len())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, Self::Error> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding returned".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Calculate cosine similarity between two embedding vectors
///
/// Returns 0.0 when the lengths differ or either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
