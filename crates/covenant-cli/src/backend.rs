//! Runtime selection of provider, embedder and store.
//!
//! The pipeline crates are generic over their seams; these enums pick one
//! implementation per seam from the configuration.

use crate::config::{api_key_from_env, AppConfig, EmbeddingBackend, LlmBackend, StoreBackend};
use crate::error::Result;
use async_trait::async_trait;
use covenant_domain::traits::{Embedder, LlmProvider, VectorStore};
use covenant_domain::{Chunk, CompletionReply, CompletionRequest, SearchHit};
use covenant_llm::{LlmError, MockProvider, OllamaProvider, OpenAiProvider};
use covenant_store::{
    EmbeddingError, HashEmbedder, MemoryStore, MilvusStore, OpenAiEmbedder, StoreError,
};
use std::time::Duration;
use tracing::debug;

/// Configured completion provider.
pub enum Provider {
    /// OpenAI-compatible endpoint
    OpenAi(OpenAiProvider),
    /// Ollama server
    Ollama(OllamaProvider),
    /// Canned replies
    Mock(MockProvider),
}

impl Provider {
    /// Build the provider named in `[llm]`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let settings = &config.llm;
        let timeout = Duration::from_secs(settings.timeout_secs);
        let provider = match settings.provider {
            LlmBackend::OpenAi => {
                let api_key = api_key_from_env(&settings.api_key_env)?;
                let base_url = settings
                    .base_url
                    .clone()
                    .unwrap_or_else(|| covenant_llm::openai::DEFAULT_BASE_URL.to_string());
                Provider::OpenAi(
                    OpenAiProvider::new(base_url, api_key, settings.model.clone())
                        .with_timeout(timeout)
                        .with_max_retries(settings.max_retries),
                )
            }
            LlmBackend::Ollama => {
                let endpoint = settings
                    .base_url
                    .clone()
                    .unwrap_or_else(|| covenant_llm::ollama::DEFAULT_ENDPOINT.to_string());
                Provider::Ollama(
                    OllamaProvider::new(endpoint, settings.model.clone())
                        .with_timeout(timeout)
                        .with_max_retries(settings.max_retries),
                )
            }
            LlmBackend::Mock => Provider::Mock(MockProvider::default()),
        };
        debug!("Using completion model {}", provider.model_name());
        Ok(provider)
    }
}

#[async_trait]
impl LlmProvider for Provider {
    type Error = LlmError;

    async fn complete(&self, request: CompletionRequest) -> std::result::Result<CompletionReply, LlmError> {
        match self {
            Provider::OpenAi(p) => p.complete(request).await,
            Provider::Ollama(p) => p.complete(request).await,
            Provider::Mock(p) => p.complete(request).await,
        }
    }

    fn model_name(&self) -> &str {
        match self {
            Provider::OpenAi(p) => p.model_name(),
            Provider::Ollama(p) => p.model_name(),
            Provider::Mock(p) => p.model_name(),
        }
    }
}

/// Configured embedding backend.
pub enum AnyEmbedder {
    /// OpenAI-compatible endpoint
    OpenAi(OpenAiEmbedder),
    /// Deterministic local embeddings
    Hash(HashEmbedder),
}

impl AnyEmbedder {
    /// Build the embedder named in `[embedding]`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let settings = &config.embedding;
        Ok(match settings.provider {
            EmbeddingBackend::OpenAi => {
                let api_key = api_key_from_env(&settings.api_key_env)?;
                let base_url = settings
                    .base_url
                    .clone()
                    .unwrap_or_else(|| covenant_llm::openai::DEFAULT_BASE_URL.to_string());
                AnyEmbedder::OpenAi(OpenAiEmbedder::new(
                    base_url,
                    api_key,
                    settings.model.clone(),
                    settings.dimension,
                ))
            }
            EmbeddingBackend::Hash => AnyEmbedder::Hash(HashEmbedder::new(settings.dimension)),
        })
    }
}

#[async_trait]
impl Embedder for AnyEmbedder {
    type Error = EmbeddingError;

    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
        match self {
            AnyEmbedder::OpenAi(e) => e.embed(texts).await,
            AnyEmbedder::Hash(e) => e.embed(texts).await,
        }
    }

    async fn embed_query(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
        match self {
            AnyEmbedder::OpenAi(e) => e.embed_query(text).await,
            AnyEmbedder::Hash(e) => e.embed_query(text).await,
        }
    }

    fn dimension(&self) -> usize {
        match self {
            AnyEmbedder::OpenAi(e) => e.dimension(),
            AnyEmbedder::Hash(e) => e.dimension(),
        }
    }
}

/// Configured vector store.
pub enum AnyStore {
    /// In-process store
    Memory(MemoryStore),
    /// Milvus server
    Milvus(MilvusStore),
}

impl AnyStore {
    /// Open the store named in `[store]`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let settings = &config.store;
        Ok(match settings.backend {
            StoreBackend::Memory => {
                AnyStore::Memory(MemoryStore::open(settings.memory.clone())?)
            }
            StoreBackend::Milvus => AnyStore::Milvus(MilvusStore::new(settings.milvus.clone())),
        })
    }
}

#[async_trait]
impl VectorStore for AnyStore {
    type Error = StoreError;

    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> std::result::Result<(), StoreError> {
        match self {
            AnyStore::Memory(s) => s.ensure_collection(collection, dimension).await,
            AnyStore::Milvus(s) => s.ensure_collection(collection, dimension).await,
        }
    }

    async fn insert(&self, collection: &str, chunks: Vec<Chunk>) -> std::result::Result<usize, StoreError> {
        match self {
            AnyStore::Memory(s) => s.insert(collection, chunks).await,
            AnyStore::Milvus(s) => s.insert(collection, chunks).await,
        }
    }

    async fn search_by_vector(
        &self,
        collection: &str,
        vector: &[f32],
        document_ids: &[String],
        limit: usize,
    ) -> std::result::Result<Vec<SearchHit>, StoreError> {
        match self {
            AnyStore::Memory(s) => {
                s.search_by_vector(collection, vector, document_ids, limit).await
            }
            AnyStore::Milvus(s) => {
                s.search_by_vector(collection, vector, document_ids, limit).await
            }
        }
    }

    async fn search_full_text(
        &self,
        collection: &str,
        query: &str,
        document_ids: &[String],
        limit: usize,
    ) -> std::result::Result<Vec<SearchHit>, StoreError> {
        match self {
            AnyStore::Memory(s) => {
                s.search_full_text(collection, query, document_ids, limit).await
            }
            AnyStore::Milvus(s) => {
                s.search_full_text(collection, query, document_ids, limit).await
            }
        }
    }

    fn supports_full_text(&self) -> bool {
        match self {
            AnyStore::Memory(s) => s.supports_full_text(),
            AnyStore::Milvus(s) => s.supports_full_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreSettings;
    use covenant_store::MemoryStoreConfig;

    fn offline_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.llm.provider = LlmBackend::Mock;
        config.embedding.provider = EmbeddingBackend::Hash;
        config.embedding.dimension = 64;
        config.store = StoreSettings {
            memory: MemoryStoreConfig::default(),
            ..StoreSettings::default()
        };
        config
    }

    #[tokio::test]
    async fn test_offline_backends() {
        let config = offline_config();
        let provider = Provider::from_config(&config).unwrap();
        let reply = provider
            .complete(CompletionRequest::new(vec![covenant_domain::Message::user("hi")]))
            .await
            .unwrap();
        assert_eq!(reply.answer(), Some("Default mock response"));

        let embedder = AnyEmbedder::from_config(&config).unwrap();
        assert_eq!(embedder.dimension(), 64);
        let vector = embedder.embed_query("uptime 99.9%").await.unwrap();
        assert_eq!(vector.len(), 64);

        let store = AnyStore::from_config(&config).unwrap();
        store.ensure_collection("_acme", 64).await.unwrap();
        let chunk = Chunk::new("uptime 99.9%", vector.clone(), "doc-1");
        assert_eq!(store.insert("_acme", vec![chunk]).await.unwrap(), 1);
        let hits = store.search_by_vector("_acme", &vector, &[], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(store.supports_full_text());
    }

    #[test]
    fn test_openai_requires_key() {
        let mut config = offline_config();
        config.llm.api_key_env = "COVENANT_TEST_MISSING_KEY".to_string();
        config.llm.provider = LlmBackend::OpenAi;
        assert!(Provider::from_config(&config).is_err());
    }
}
