//! Configuration management for the CLI.
//!
//! The file is TOML with one section per component:
//!
//! ```toml
//! [llm]
//! provider = "openai"
//! model = "gpt-4o-mini"
//!
//! [store]
//! backend = "milvus"
//!
//! [store.milvus]
//! uri = "http://localhost:19530"
//!
//! [extraction]
//! max_concurrency = 8
//! ```

use crate::error::{CliError, Result};
use covenant_comparator::ComparatorConfig;
use covenant_extractor::ExtractorConfig;
use covenant_store::{MemoryStoreConfig, MilvusConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Completion provider
    pub llm: LlmSettings,

    /// Embedding provider
    pub embedding: EmbeddingSettings,

    /// Vector store backend
    pub store: StoreSettings,

    /// Field extraction
    pub extraction: ExtractorConfig,

    /// Metric comparison
    pub comparison: ComparatorConfig,

    /// Log filter
    pub logging: LoggingSettings,

    /// Output defaults
    pub output: OutputSettings,
}

/// Completion backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// OpenAI-compatible chat completions
    OpenAi,
    /// Local Ollama server
    Ollama,
    /// Canned replies, no network
    Mock,
}

/// Completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Backend to use
    pub provider: LlmBackend,

    /// Model identifier
    pub model: String,

    /// API root; the backend default when unset
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Retries after a transient failure
    pub max_retries: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmBackend::OpenAi,
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 120,
            max_retries: 0,
        }
    }
}

/// Embedding backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI-compatible embeddings endpoint
    OpenAi,
    /// Deterministic hashed bag of words, no network
    Hash,
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Backend to use
    pub provider: EmbeddingBackend,

    /// Model identifier
    pub model: String,

    /// API root; the backend default when unset
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Vector width
    pub dimension: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::OpenAi,
            model: covenant_store::embedding::DEFAULT_EMBEDDING_MODEL.to_string(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            dimension: covenant_store::embedding::DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

/// Vector store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store persisted to a snapshot file
    Memory,
    /// Milvus server
    Milvus,
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Backend to use
    pub backend: StoreBackend,

    /// In-process store options
    pub memory: MemoryStoreConfig,

    /// Milvus options
    pub milvus: MilvusConfig,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            memory: MemoryStoreConfig {
                snapshot_path: AppConfig::home_dir().map(|dir| dir.join("store.json")),
                ..MemoryStoreConfig::default()
            },
            milvus: MilvusConfig::default(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Enable colored output
    pub color: bool,

    /// Default output format
    pub format: OutputFormat,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl AppConfig {
    /// Directory holding the config file and the default store snapshot.
    pub fn home_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".covenant"))
    }

    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        Self::home_dir()
            .map(|dir| dir.join("config.toml"))
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))
    }

    /// Load configuration from `path`, or the default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_toml(&fs::read_to_string(path)?)?
            }
            None => {
                let path = Self::path()?;
                if path.exists() {
                    Self::from_toml(&fs::read_to_string(&path)?)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Validate every component section.
    pub fn validate(&self) -> Result<()> {
        let section = |name: &str, result: std::result::Result<(), String>| {
            result.map_err(|e| CliError::Config(format!("[{}] {}", name, e)))
        };
        section("extraction", self.extraction.validate())?;
        section("comparison", self.comparison.validate())?;
        section("store.memory", self.store.memory.validate())?;
        if self.store.backend == StoreBackend::Milvus {
            section("store.milvus", self.store.milvus.validate())?;
        }
        if self.embedding.dimension == 0 {
            return Err(CliError::Config(
                "[embedding] dimension must be greater than 0".into(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(CliError::Config("[llm] model must not be empty".into()));
        }
        Ok(())
    }
}

/// Read an API key from the named environment variable.
pub fn api_key_from_env(var: &str) -> Result<String> {
    std::env::var(var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| CliError::Config(format!("Environment variable {} is not set", var)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, LlmBackend::OpenAi);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.output.format, OutputFormat::Table);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [llm]
            provider = "ollama"
            model = "llama3.1"

            [extraction]
            max_concurrency = 8

            [comparison]
            enforce_literal_evaluation = false
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.provider, LlmBackend::Ollama);
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.extraction.max_concurrency, 8);
        assert_eq!(config.extraction.vector_top_k, ExtractorConfig::default().vector_top_k);
        assert!(!config.comparison.enforce_literal_evaluation);
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("covenant.toml");
        fs::write(&path, "[store]\nbackend = \"milvus\"\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Milvus);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            AppConfig::load(Some(&missing)),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_section_is_named() {
        let config = AppConfig::from_toml("[comparison]\nmax_attempts = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("[comparison]"));
    }

    #[test]
    fn test_roundtrip_toml() {
        let mut config = AppConfig::default();
        config.llm.model = "gpt-4o".to_string();
        let parsed = AppConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.llm.model, "gpt-4o");
    }

    #[test]
    fn test_missing_api_key() {
        let err = api_key_from_env("COVENANT_TEST_UNSET_KEY").unwrap_err();
        assert!(err.to_string().contains("COVENANT_TEST_UNSET_KEY"));
    }
}
