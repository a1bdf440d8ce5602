//! Document preprocessing: load, chunk, embed and store

use crate::chunking::{embed_batched, SemanticChunker};
use crate::config::ChunkingConfig;
use crate::error::ExtractorError;
use crate::loader::load_document;
use crate::types::PreprocessReport;
use covenant_domain::traits::{Embedder, VectorStore};
use covenant_domain::Chunk;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Turns a contract document into searchable chunks
pub struct DocumentPreprocessor<E, S> {
    embedder: Arc<E>,
    store: Arc<S>,
    chunker: SemanticChunker<E>,
    config: ChunkingConfig,
}

impl<E, S> DocumentPreprocessor<E, S>
where
    E: Embedder,
    S: VectorStore,
{
    /// Create a new preprocessor, rejecting an invalid chunking config
    pub fn new(
        embedder: Arc<E>,
        store: Arc<S>,
        config: ChunkingConfig,
    ) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        Ok(Self {
            chunker: SemanticChunker::new(Arc::clone(&embedder), config.clone()),
            embedder,
            store,
            config,
        })
    }

    /// Load, chunk, embed and insert `document_path` into `collection_name`
    ///
    /// Every chunk is tagged with `document_id`. A missing document fails
    /// before any embedding or store call is made.
    pub async fn process(
        &self,
        document_path: &Path,
        document_id: &str,
        collection_name: &str,
    ) -> Result<PreprocessReport, ExtractorError> {
        if document_id.trim().is_empty() {
            return Err(ExtractorError::Input("document_id must not be empty".to_string()));
        }
        let start = Instant::now();
        let text = load_document(document_path).await?;
        info!(
            "Preprocessing '{}' as document {} ({} chars)",
            document_path.display(),
            document_id,
            text.chars().count()
        );

        let contents = self.chunker.chunk(&text).await?;
        let vectors =
            embed_batched(&*self.embedder, &contents, self.config.embedding_batch_size).await?;
        debug!("Embedded {} chunks", vectors.len());

        let source = document_path.display().to_string();
        let chunks: Vec<Chunk> = contents
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (content, vector))| {
                Chunk::new(content, vector, document_id)
                    .with_metadata("source", source.clone())
                    .with_metadata("chunk_index", i)
            })
            .collect();

        self.store
            .ensure_collection(collection_name, self.embedder.dimension())
            .await
            .map_err(ExtractorError::store)?;
        let chunk_count = self
            .store
            .insert(collection_name, chunks)
            .await
            .map_err(ExtractorError::store)?;

        info!(
            "Stored {} chunks for document {} in '{}' in {}ms",
            chunk_count,
            document_id,
            collection_name,
            start.elapsed().as_millis()
        );

        Ok(PreprocessReport {
            document_id: document_id.to_string(),
            collection_name: collection_name.to_string(),
            chunk_count,
            char_count: text.chars().count(),
        })
    }
}
