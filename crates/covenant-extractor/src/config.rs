//! Configuration for preprocessing and extraction

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Semantic chunking parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Sentences of context on each side of a sentence when embedding it
    pub buffer_size: usize,

    /// Percentile of neighbour distances above which a chunk boundary is placed
    pub breakpoint_percentile: f64,

    /// Upper bound on a chunk's length (characters)
    pub max_chunk_chars: usize,

    /// Passages per embedding call
    pub embedding_batch_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1,
            breakpoint_percentile: 95.0,
            max_chunk_chars: 4_000,
            embedding_batch_size: 64,
        }
    }
}

impl ChunkingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.breakpoint_percentile) {
            return Err("breakpoint_percentile must be between 0 and 100".to_string());
        }
        if self.max_chunk_chars == 0 {
            return Err("max_chunk_chars must be greater than 0".to_string());
        }
        if self.embedding_batch_size == 0 {
            return Err("embedding_batch_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Configuration for field extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Retrieval tool rounds allowed before the model must answer
    pub max_tool_iterations: usize,

    /// Passages taken from vector similarity search
    pub vector_top_k: usize,

    /// Passages taken from full-text search, when the store supports it
    pub full_text_top_k: usize,

    /// Fields processed at the same time
    pub max_concurrency: usize,

    /// Maximum time for a whole document extraction (seconds)
    pub extraction_timeout_secs: u64,

    /// Sampling temperature for formatting calls
    pub temperature: f32,

    /// Chunking used by the preprocessor
    pub chunking: ChunkingConfig,
}

impl Default for ExtractorConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            max_tool_iterations: 4,
            vector_top_k: 3,
            full_text_top_k: 4,
            max_concurrency: 4,
            extraction_timeout_secs: 600,
            temperature: 0.0,
            chunking: ChunkingConfig::default(),
        }
    }
}

impl ExtractorConfig {
    /// Get the extraction timeout as a Duration
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.vector_top_k == 0 {
            return Err("vector_top_k must be greater than 0".to_string());
        }
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be greater than 0".to_string());
        }
        if self.extraction_timeout_secs == 0 {
            return Err("extraction_timeout_secs must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("temperature must be between 0 and 2".to_string());
        }
        self.chunking.validate()
    }

    /// Aggressive preset: fewer tool rounds and a short deadline
    pub fn aggressive() -> Self {
        Self {
            max_tool_iterations: 1,
            max_concurrency: 8,
            extraction_timeout_secs: 180,
            chunking: ChunkingConfig {
                max_chunk_chars: 2_000,
                ..ChunkingConfig::default()
            },
            ..Self::default()
        }
    }

    /// Lenient preset: more retrieval, more time, larger chunks
    pub fn lenient() -> Self {
        Self {
            max_tool_iterations: 8,
            vector_top_k: 5,
            full_text_top_k: 6,
            max_concurrency: 2,
            extraction_timeout_secs: 1_800,
            chunking: ChunkingConfig {
                breakpoint_percentile: 90.0,
                max_chunk_chars: 8_000,
                ..ChunkingConfig::default()
            },
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(ExtractorConfig::default().validate().is_ok());
        assert!(ExtractorConfig::aggressive().validate().is_ok());
        assert!(ExtractorConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_defaults_match_retrieval_limits() {
        let config = ExtractorConfig::default();
        assert_eq!(config.vector_top_k, 3);
        assert_eq!(config.full_text_top_k, 4);
        assert_eq!(config.max_tool_iterations, 4);
        assert_eq!(config.chunking.breakpoint_percentile, 95.0);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = ExtractorConfig::default();
        config.max_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = ExtractorConfig::default();
        config.chunking.breakpoint_percentile = 120.0;
        assert!(config.validate().is_err());

        let mut config = ExtractorConfig::default();
        config.extraction_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::lenient();
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractorConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = ExtractorConfig::from_toml("max_concurrency = 2\n[chunking]\nbuffer_size = 2\n")
            .unwrap();
        assert_eq!(parsed.max_concurrency, 2);
        assert_eq!(parsed.chunking.buffer_size, 2);
        assert_eq!(parsed.vector_top_k, 3);
        assert_eq!(parsed.chunking.max_chunk_chars, 4_000);
    }
}
