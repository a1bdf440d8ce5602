//! HNSW Vector Index for chunk similarity search
//!
//! Wraps `hnsw_rs` with cosine distance. Points are identified by the
//! caller's chunk position, so the index needs no id table of its own.
//!
//! # HNSW Parameters
//!
//! - **M**: Number of bi-directional links per node (default: 8)
//! - **efConstruction**: Candidate list size while building (default: 64)
//! - **efSearch**: Candidate list size while querying, passed per search

use hnsw_rs::prelude::*;
use thiserror::Error;

/// Default links per node
pub const DEFAULT_M: usize = 8;
/// Default construction candidate list size
pub const DEFAULT_EF_CONSTRUCTION: usize = 64;
/// Default capacity hint
pub const DEFAULT_MAX_ELEMENTS: usize = 100_000;

/// Errors that can occur during vector index operations
#[derive(Error, Debug)]
pub enum VectorIndexError {
    /// Invalid embedding dimension
    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        actual: usize,
    },

    /// Vector with zero magnitude has no direction to compare
    #[error("Zero-magnitude vector cannot be indexed")]
    ZeroVector,
}

/// HNSW construction parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexParams {
    /// Links per node
    pub m: usize,
    /// Construction candidate list size
    pub ef_construction: usize,
    /// Capacity hint used to size the layer count
    pub max_elements: usize,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            m: DEFAULT_M,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            max_elements: DEFAULT_MAX_ELEMENTS,
        }
    }
}

/// Approximate nearest-neighbour index over chunk embeddings
///
/// # Examples
///
/// ```
/// use covenant_store::vector_index::{IndexParams, VectorIndex};
///
/// let mut index = VectorIndex::new(3, IndexParams::default());
/// index.add(0, &[1.0, 0.0, 0.0]).unwrap();
/// index.add(1, &[0.0, 1.0, 0.0]).unwrap();
///
/// let results = index.search(&[1.0, 0.1, 0.0], 1, 64).unwrap();
/// assert_eq!(results[0].0, 0);
/// ```
pub struct VectorIndex {
    dimension: usize,
    hnsw: Hnsw<'static, f32, DistCosine>,
    len: usize,
}

impl VectorIndex {
    /// Create an empty index for vectors of `dimension`
    pub fn new(dimension: usize, params: IndexParams) -> Self {
        // Layer count grows with the log of the expected size
        let nb_layer = 16.min((params.max_elements.max(2) as f32).ln().trunc() as usize);
        let hnsw = Hnsw::<'static, f32, DistCosine>::new(
            params.m,
            params.max_elements,
            nb_layer,
            params.ef_construction,
            DistCosine {},
        );
        Self {
            dimension,
            hnsw,
            len: 0,
        }
    }

    /// Index dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check(&self, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if vector.iter().all(|v| *v == 0.0) {
            return Err(VectorIndexError::ZeroVector);
        }
        Ok(())
    }

    /// Add the embedding of chunk `id`
    pub fn add(&mut self, id: usize, embedding: &[f32]) -> Result<(), VectorIndexError> {
        self.check(embedding)?;
        self.hnsw.insert((embedding, id));
        self.len += 1;
        Ok(())
    }

    /// The `k` nearest chunk ids with cosine similarity, best first
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<(usize, f32)>, VectorIndexError> {
        self.check(query)?;
        if self.len == 0 || k == 0 {
            return Ok(Vec::new());
        }
        let mut results: Vec<(usize, f32)> = self
            .hnsw
            .search(query, k, ef_search.max(k))
            .into_iter()
            // HNSW returns cosine distance; similarity is 1 - distance
            .map(|neighbour| (neighbour.d_id, 1.0 - neighbour.distance))
            .collect();
        results.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(results)
    }

    /// Number of indexed vectors
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(vectors: &[Vec<f32>]) -> VectorIndex {
        let mut index = VectorIndex::new(vectors[0].len(), IndexParams::default());
        for (id, v) in vectors.iter().enumerate() {
            index.add(id, v).unwrap();
        }
        index
    }

    #[test]
    fn test_vector_index_creation() {
        let index = VectorIndex::new(384, IndexParams::default());
        assert_eq!(index.dimension(), 384);
        assert!(index.is_empty());
        assert!(index.search(&vec![0.1; 384], 3, 64).unwrap().is_empty());
    }

    #[test]
    fn test_add_and_search() {
        let embedding1: Vec<f32> = (0..384).map(|i| (i as f32 + 1.0) / 384.0).collect();
        let mut embedding2 = embedding1.clone();
        embedding2[0] = 5.0;
        let index = index_with(&[embedding1.clone(), embedding2]);

        assert_eq!(index.len(), 2);
        let results = index.search(&embedding1, 2, 64).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 0);
        assert!(results[0].1 > 0.99);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = VectorIndex::new(384, IndexParams::default());
        let result = index.add(0, &[0.1; 128]);
        assert!(matches!(
            result,
            Err(VectorIndexError::DimensionMismatch {
                expected: 384,
                actual: 128
            })
        ));
    }

    #[test]
    fn test_zero_vector_rejected() {
        let mut index = VectorIndex::new(3, IndexParams::default());
        assert!(matches!(
            index.add(0, &[0.0, 0.0, 0.0]),
            Err(VectorIndexError::ZeroVector)
        ));
    }

    #[test]
    fn test_cosine_ordering() {
        let index = index_with(&[
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.7071, 0.7071, 0.0],
        ]);

        let results = index.search(&[1.0, 0.0, 0.0], 3, 64).unwrap();
        assert_eq!(results[0].0, 0);
        assert!(results[0].1 > 0.99);
        assert_eq!(results[1].0, 2);
        assert!(results[1].1 > 0.5);
        assert_eq!(results[2].0, 1);
        assert!(results[2].1 < 0.1);
    }
}
