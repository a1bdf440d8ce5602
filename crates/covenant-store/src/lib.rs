//! Covenant Storage Layer
//!
//! Vector retrieval for contract chunks. Implements the `VectorStore` and
//! `Embedder` traits from `covenant-domain`.
//!
//! # Architecture
//!
//! - `MilvusStore`: Milvus REST (v2) client; one collection per vendor, dense
//!   vectors with an HNSW/IP index and an optional BM25 sparse field for
//!   full-text search
//! - `MemoryStore`: in-process store with an HNSW vector index, a BM25 lexical
//!   index and an optional JSON snapshot on disk
//! - `OpenAiEmbedder` / `HashEmbedder`: remote and deterministic embeddings
//!
//! # Examples
//!
//! ```
//! use covenant_store::{MemoryStore, MemoryStoreConfig};
//!
//! let store = MemoryStore::new(MemoryStoreConfig::default());
//! assert!(store.collection_names().unwrap().is_empty());
//! ```

#![warn(missing_docs)]

pub mod bm25;
pub mod embedding;
pub mod memory;
pub mod milvus;
pub mod vector_index;

use thiserror::Error;

pub use embedding::{cosine_similarity, EmbeddingError, HashEmbedder, OpenAiEmbedder};
pub use memory::{MemoryStore, MemoryStoreConfig};
pub use milvus::{MilvusConfig, MilvusStore};
pub use vector_index::{VectorIndex, VectorIndexError};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Network error talking to the vector database
    #[error("Communication error: {0}")]
    Communication(String),

    /// Vector database rejected the request
    #[error("Milvus error {code}: {message}")]
    Milvus {
        /// Server error code
        code: i64,
        /// Server message
        message: String,
    },

    /// Collection has not been created
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Vector width does not match the collection
    #[error("Dimension mismatch: collection expects {expected}, got {actual}")]
    DimensionMismatch {
        /// Collection dimension
        expected: usize,
        /// Provided dimension
        actual: usize,
    },

    /// Full-text search requested on a store without it
    #[error("Full-text search is not enabled for this store")]
    FullTextUnsupported,

    /// Vector index failure
    #[error(transparent)]
    VectorIndex(#[from] VectorIndexError),

    /// Snapshot file I/O
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot or response (de)serialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed data from the server or snapshot
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A previous writer panicked while holding the store lock
    #[error("Store lock poisoned")]
    LockPoisoned,
}
