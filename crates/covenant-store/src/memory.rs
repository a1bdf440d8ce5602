//! In-process vector store
//!
//! Each collection keeps its chunks in insertion order alongside an HNSW
//! vector index and a BM25 lexical index. Small filtered candidate sets are
//! scored exactly; larger ones go through HNSW with over-fetching.
//!
//! With a `snapshot_path` configured the store loads the snapshot on open and
//! rewrites it after every insert, so separate CLI invocations share data.

use crate::bm25::Bm25Index;
use crate::embedding::cosine_similarity;
use crate::vector_index::{IndexParams, VectorIndex, VectorIndexError};
use crate::StoreError;
use async_trait::async_trait;
use covenant_domain::traits::VectorStore;
use covenant_domain::{Chunk, SearchHit};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Configuration for [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStoreConfig {
    /// HNSW links per node
    pub m: usize,
    /// HNSW construction candidate list size
    pub ef_construction: usize,
    /// HNSW query candidate list size
    pub ef_search: usize,
    /// Capacity hint per collection
    pub max_elements: usize,
    /// Filtered candidate sets up to this size are scored exactly
    pub exact_search_threshold: usize,
    /// JSON snapshot file; `None` keeps everything in memory
    pub snapshot_path: Option<PathBuf>,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            m: 8,
            ef_construction: 64,
            ef_search: 64,
            max_elements: 100_000,
            exact_search_threshold: 1_000,
            snapshot_path: None,
        }
    }
}

impl MemoryStoreConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.m == 0 {
            return Err("m must be greater than 0".to_string());
        }
        if self.ef_construction == 0 || self.ef_search == 0 {
            return Err("ef_construction and ef_search must be greater than 0".to_string());
        }
        if self.max_elements == 0 {
            return Err("max_elements must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }

    fn index_params(&self) -> IndexParams {
        IndexParams {
            m: self.m,
            ef_construction: self.ef_construction,
            max_elements: self.max_elements,
        }
    }
}

struct Collection {
    dimension: usize,
    chunks: Vec<Chunk>,
    index: VectorIndex,
    lexical: Bm25Index,
}

impl Collection {
    fn new(dimension: usize, params: IndexParams) -> Self {
        Self {
            dimension,
            chunks: Vec::new(),
            index: VectorIndex::new(dimension, params),
            lexical: Bm25Index::new(),
        }
    }

    fn push(&mut self, chunk: Chunk) -> Result<(), StoreError> {
        if chunk.vector.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: chunk.vector.len(),
            });
        }
        let id = self.chunks.len();
        self.index.add(id, &chunk.vector)?;
        self.lexical.add(&chunk.content);
        self.chunks.push(chunk);
        Ok(())
    }

    fn hit(&self, id: usize, score: f32) -> SearchHit {
        let chunk = &self.chunks[id];
        SearchHit {
            content: chunk.content.clone(),
            metadata: chunk.metadata.clone(),
            score,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    collections: BTreeMap<String, SnapshotCollection>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotCollection {
    dimension: usize,
    chunks: Vec<Chunk>,
}

/// In-memory [`VectorStore`] with HNSW and BM25 search
pub struct MemoryStore {
    config: MemoryStoreConfig,
    collections: Mutex<HashMap<String, Collection>>,
}

impl MemoryStore {
    /// Create an empty store (the snapshot, if configured, is not read)
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self {
            config,
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// Create a store, loading the configured snapshot when it exists
    pub fn open(config: MemoryStoreConfig) -> Result<Self, StoreError> {
        let store = Self::new(config);
        if let Some(path) = store.config.snapshot_path.clone() {
            if path.exists() {
                store.load_snapshot(&path)?;
            }
        }
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Collection>>, StoreError> {
        self.collections.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Names of all collections, sorted
    pub fn collection_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.lock()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Number of chunks stored in `collection`
    pub fn chunk_count(&self, collection: &str) -> Result<usize, StoreError> {
        self.lock()?
            .get(collection)
            .map(|c| c.chunks.len())
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))
    }

    /// Replace the store contents with a snapshot file
    pub fn load_snapshot(&self, path: &Path) -> Result<(), StoreError> {
        let text = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&text)?;
        let params = self.config.index_params();

        let mut rebuilt = HashMap::new();
        for (name, stored) in snapshot.collections {
            let mut collection = Collection::new(stored.dimension, params);
            for chunk in stored.chunks {
                collection.push(chunk)?;
            }
            rebuilt.insert(name, collection);
        }
        info!(path = %path.display(), collections = rebuilt.len(), "Loaded store snapshot");
        *self.lock()? = rebuilt;
        Ok(())
    }

    fn snapshot_json(&self) -> Result<String, StoreError> {
        let guard = self.lock()?;
        let collections = guard
            .iter()
            .map(|(name, c)| {
                (
                    name.clone(),
                    SnapshotCollection {
                        dimension: c.dimension,
                        chunks: c.chunks.clone(),
                    },
                )
            })
            .collect();
        Ok(serde_json::to_string(&Snapshot { collections })?)
    }

    /// Write the store contents to `path`
    pub async fn save_snapshot(&self, path: &Path) -> Result<(), StoreError> {
        let json = self.snapshot_json()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, json).await?;
        debug!(path = %path.display(), "Wrote store snapshot");
        Ok(())
    }

    async fn persist(&self) -> Result<(), StoreError> {
        match &self.config.snapshot_path {
            Some(path) => self.save_snapshot(path).await,
            None => Ok(()),
        }
    }

    fn vector_hits(
        &self,
        collection: &str,
        vector: &[f32],
        document_ids: &[String],
        limit: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let guard = self.lock()?;
        let coll = guard
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        if vector.len() != coll.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: coll.dimension,
                actual: vector.len(),
            });
        }

        let candidates: Vec<usize> = (0..coll.chunks.len())
            .filter(|id| coll.chunks[*id].belongs_to(document_ids))
            .collect();
        if candidates.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let scored = if candidates.len() <= self.config.exact_search_threshold {
            exact_scores(coll, &candidates, vector)
        } else {
            // Over-fetch so the document filter still leaves `limit` hits
            let fetch = (limit * 4).max(self.config.ef_search).min(coll.chunks.len());
            let approximate: Vec<(usize, f32)> = coll
                .index
                .search(vector, fetch, self.config.ef_search)?
                .into_iter()
                .filter(|(id, _)| coll.chunks[*id].belongs_to(document_ids))
                .collect();
            if approximate.len() >= limit {
                approximate
            } else {
                exact_scores(coll, &candidates, vector)
            }
        };

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(id, score)| coll.hit(id, score))
            .collect())
    }
}

fn exact_scores(coll: &Collection, candidates: &[usize], vector: &[f32]) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = candidates
        .iter()
        .map(|id| (*id, cosine_similarity(&coll.chunks[*id].vector, vector)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryStoreConfig::default())
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    type Error = StoreError;

    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<(), Self::Error> {
        let created = {
            let mut guard = self.lock()?;
            match guard.get(collection) {
                Some(existing) if existing.dimension != dimension => {
                    return Err(StoreError::DimensionMismatch {
                        expected: existing.dimension,
                        actual: dimension,
                    });
                }
                Some(_) => false,
                None => {
                    guard.insert(
                        collection.to_string(),
                        Collection::new(dimension, self.config.index_params()),
                    );
                    true
                }
            }
        };
        if created {
            info!(collection, dimension, "Created collection");
            self.persist().await?;
        }
        Ok(())
    }

    async fn insert(&self, collection: &str, chunks: Vec<Chunk>) -> Result<usize, Self::Error> {
        let count = chunks.len();
        {
            let mut guard = self.lock()?;
            let coll = guard
                .get_mut(collection)
                .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
            // Validate the whole batch before touching the indexes
            if let Some(bad) = chunks.iter().find(|c| c.vector.len() != coll.dimension) {
                return Err(StoreError::DimensionMismatch {
                    expected: coll.dimension,
                    actual: bad.vector.len(),
                });
            }
            if chunks.iter().any(|c| c.vector.iter().all(|v| *v == 0.0)) {
                return Err(VectorIndexError::ZeroVector.into());
            }
            for chunk in chunks {
                coll.push(chunk)?;
            }
        }
        debug!(collection, count, "Inserted chunks");
        self.persist().await?;
        Ok(count)
    }

    async fn search_by_vector(
        &self,
        collection: &str,
        vector: &[f32],
        document_ids: &[String],
        limit: usize,
    ) -> Result<Vec<SearchHit>, Self::Error> {
        self.vector_hits(collection, vector, document_ids, limit)
    }

    async fn search_full_text(
        &self,
        collection: &str,
        query: &str,
        document_ids: &[String],
        limit: usize,
    ) -> Result<Vec<SearchHit>, Self::Error> {
        let guard = self.lock()?;
        let coll = guard
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        Ok(coll
            .lexical
            .search(query, |id| coll.chunks[id].belongs_to(document_ids), limit)
            .into_iter()
            .map(|(id, score)| coll.hit(id, score))
            .collect())
    }

    fn supports_full_text(&self) -> bool {
        true
    }
}
