//! Embedded contract passages and search hits

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key every chunk carries
pub const DOCUMENT_ID_KEY: &str = "document_id";

/// A passage of a contract together with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Passage text
    pub content: String,
    /// Embedding vector
    pub vector: Vec<f32>,
    /// Source metadata; always includes `document_id`
    pub metadata: Map<String, Value>,
}

impl Chunk {
    /// Create a chunk tagged with its owning document
    pub fn new(content: impl Into<String>, vector: Vec<f32>, document_id: &str) -> Self {
        let mut metadata = Map::new();
        metadata.insert(DOCUMENT_ID_KEY.to_string(), Value::String(document_id.to_string()));
        Self {
            content: content.into(),
            vector,
            metadata,
        }
    }

    /// Attach an additional metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Owning document id
    pub fn document_id(&self) -> Option<&str> {
        self.metadata.get(DOCUMENT_ID_KEY).and_then(Value::as_str)
    }

    /// Whether this chunk belongs to one of `document_ids` (empty slice matches all)
    pub fn belongs_to(&self, document_ids: &[String]) -> bool {
        document_ids.is_empty()
            || self
                .document_id()
                .is_some_and(|id| document_ids.iter().any(|d| d == id))
    }
}

/// Passage returned by a similarity or full-text search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Passage text
    pub content: String,
    /// Source metadata
    pub metadata: Map<String, Value>,
    /// Relevance score; higher is better
    pub score: f32,
}

/// Vector collection name for a vendor
///
/// Collection names must start with a letter or underscore and contain only
/// alphanumerics and underscores.
///
/// ```
/// use covenant_domain::collection_name_for;
///
/// assert_eq!(collection_name_for("acme-corp.eu"), "_acme_corp_eu");
/// ```
pub fn collection_name_for(vendor_id: &str) -> String {
    let sanitized: String = vendor_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("_{}", sanitized)
}

/// Fresh time-ordered document id
pub fn new_document_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
