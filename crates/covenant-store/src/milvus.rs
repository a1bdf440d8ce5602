//! Milvus REST client
//!
//! Uses the v2 RESTful API (`/v2/vectordb/...`). Each vendor gets its own
//! collection with this schema:
//!
//! | field           | type                | notes                                  |
//! |-----------------|---------------------|----------------------------------------|
//! | `primary_key`   | Int64               | primary, auto id                       |
//! | `metadata`      | JSON                | carries `document_id`                  |
//! | `content`       | VarChar(65535)      | analyzer enabled when full text is on  |
//! | `vector`        | FloatVector(dim)    | HNSW, IP metric, M=8, efConstruction=64 |
//! | `sparse_vector` | SparseFloatVector   | BM25 function over `content`           |
//!
//! Full-text search needs Milvus 2.5 or newer. With `full_text = true` the
//! BM25 field is requested at creation and dropped when the server rejects
//! it; existing collections are described to see whether they carry
//! `sparse_vector`. `full_text = false` never asks for it.

use crate::StoreError;
use async_trait::async_trait;
use covenant_domain::traits::VectorStore;
use covenant_domain::{Chunk, SearchHit};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

const PRIMARY_KEY: &str = "primary_key";
const METADATA: &str = "metadata";
const CONTENT: &str = "content";
const VECTOR: &str = "vector";
const SPARSE_VECTOR: &str = "sparse_vector";
const MAX_VARCHAR: usize = 65_535;

/// Connection settings for [`MilvusStore`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MilvusConfig {
    /// Server URI, e.g. `http://localhost:19530`
    pub uri: String,
    /// Bearer token (`user:password` or an API key)
    pub token: Option<String>,
    /// Database name; the server default when unset
    pub database: Option<String>,
    /// Ask for the BM25 sparse field and full-text search when the server
    /// supports it
    pub full_text: bool,
    /// Consistency level for new collections
    pub consistency_level: String,
    /// HNSW links per node
    pub hnsw_m: usize,
    /// HNSW construction candidate list size
    pub hnsw_ef_construction: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for MilvusConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:19530".to_string(),
            token: None,
            database: None,
            full_text: true,
            consistency_level: "Session".to_string(),
            hnsw_m: 8,
            hnsw_ef_construction: 64,
            timeout_secs: 30,
        }
    }
}

impl MilvusConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.uri.starts_with("http://") || self.uri.starts_with("https://")) {
            return Err(format!("uri must be an http(s) URL, got '{}'", self.uri));
        }
        if self.hnsw_m == 0 || self.hnsw_ef_construction == 0 {
            return Err("hnsw_m and hnsw_ef_construction must be greater than 0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
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
}

/// Response envelope shared by every v2 endpoint
#[derive(Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct HasCollection {
    has: bool,
}

#[derive(Deserialize)]
struct CollectionDescription {
    #[serde(default)]
    fields: Vec<FieldDescription>,
}

#[derive(Deserialize)]
struct FieldDescription {
    name: String,
}

impl CollectionDescription {
    fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

#[derive(Deserialize)]
struct InsertResult {
    #[serde(rename = "insertCount", default)]
    insert_count: usize,
}

/// [`VectorStore`] backed by a Milvus server
pub struct MilvusStore {
    config: MilvusConfig,
    base_url: String,
    client: reqwest::Client,
    /// Whether the server side has the BM25 field, once known
    full_text_available: OnceLock<bool>,
}

/// Filter expression restricting results to the given documents
pub fn document_filter(document_ids: &[String]) -> Option<String> {
    if document_ids.is_empty() {
        return None;
    }
    let quoted: Vec<String> = document_ids
        .iter()
        .map(|id| Value::String(id.clone()).to_string())
        .collect();
    Some(format!(
        "{}[\"document_id\"] in [{}]",
        METADATA,
        quoted.join(", ")
    ))
}

impl MilvusStore {
    /// Create a client; no request is made until first use
    pub fn new(config: MilvusConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: config.uri.trim_end_matches('/').to_string(),
            config,
            client,
            full_text_available: OnceLock::new(),
        }
    }

    fn with_database(&self, mut body: Value) -> Value {
        if let (Some(db), Some(obj)) = (&self.config.database, body.as_object_mut()) {
            obj.insert("dbName".to_string(), Value::String(db.clone()));
        }
        body
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<Option<T>, StoreError> {
        let url = format!("{}/v2/vectordb/{}", self.base_url, path);
        let mut request = self.client.post(&url).json(&self.with_database(body));
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Communication(format!("Request to {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StoreError::Communication(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidData(format!("Failed to parse {} response: {}", path, e)))?;
        if envelope.code != 0 {
            return Err(StoreError::Milvus {
                code: envelope.code,
                message: envelope.message.unwrap_or_default(),
            });
        }
        Ok(envelope.data)
    }

    /// Whether `collection` exists
    pub async fn has_collection(&self, collection: &str) -> Result<bool, StoreError> {
        let data: Option<HasCollection> = self
            .post("collections/has", json!({ "collectionName": collection }))
            .await?;
        Ok(data.map(|d| d.has).unwrap_or(false))
    }

    /// Field names of an existing collection
    async fn describe_collection(&self, collection: &str) -> Result<CollectionDescription, StoreError> {
        let data: Option<CollectionDescription> = self
            .post("collections/describe", json!({ "collectionName": collection }))
            .await?;
        Ok(data.unwrap_or(CollectionDescription { fields: Vec::new() }))
    }

    /// Resolve full-text availability for `collection`, describing it if needed
    async fn full_text_for(&self, collection: &str) -> Result<bool, StoreError> {
        if !self.config.full_text {
            return Ok(false);
        }
        if let Some(available) = self.full_text_available.get() {
            return Ok(*available);
        }
        let available = self.describe_collection(collection).await?.has_field(SPARSE_VECTOR);
        if !available {
            warn!(collection, "Collection has no BM25 field; full-text search disabled");
        }
        Ok(*self.full_text_available.get_or_init(|| available))
    }

    fn create_body(&self, collection: &str, dimension: usize, full_text: bool) -> Value {
        let mut fields = vec![
            json!({"fieldName": PRIMARY_KEY, "dataType": "Int64", "isPrimary": true}),
            json!({"fieldName": METADATA, "dataType": "JSON"}),
            json!({
                "fieldName": CONTENT,
                "dataType": "VarChar",
                "elementTypeParams": {
                    "max_length": MAX_VARCHAR,
                    "enable_analyzer": full_text
                }
            }),
            json!({
                "fieldName": VECTOR,
                "dataType": "FloatVector",
                "elementTypeParams": {"dim": dimension}
            }),
        ];
        let mut index_params = vec![json!({
            "fieldName": VECTOR,
            "indexName": VECTOR,
            "metricType": "IP",
            "params": {
                "index_type": "HNSW",
                "M": self.config.hnsw_m,
                "efConstruction": self.config.hnsw_ef_construction
            }
        })];
        let mut schema = json!({
            "autoId": true,
            "enableDynamicField": false,
        });

        if full_text {
            fields.push(json!({"fieldName": SPARSE_VECTOR, "dataType": "SparseFloatVector"}));
            index_params.push(json!({
                "fieldName": SPARSE_VECTOR,
                "indexName": SPARSE_VECTOR,
                "metricType": "BM25",
                "params": {"index_type": "AUTOINDEX"}
            }));
            schema["functions"] = json!([{
                "name": "text_bm25_emb",
                "type": "BM25",
                "inputFieldNames": [CONTENT],
                "outputFieldNames": [SPARSE_VECTOR],
                "params": {}
            }]);
        }
        schema["fields"] = Value::Array(fields);

        json!({
            "collectionName": collection,
            "schema": schema,
            "indexParams": index_params,
            "params": {"consistencyLevel": self.config.consistency_level},
        })
    }

    fn search_body(
        &self,
        collection: &str,
        data: Value,
        anns_field: &str,
        document_ids: &[String],
        limit: usize,
    ) -> Value {
        let mut body = json!({
            "collectionName": collection,
            "data": [data],
            "annsField": anns_field,
            "limit": limit,
            "outputFields": [CONTENT, METADATA],
        });
        if let Some(filter) = document_filter(document_ids) {
            body["filter"] = Value::String(filter);
        }
        body
    }

    async fn search(&self, body: Value) -> Result<Vec<SearchHit>, StoreError> {
        let rows: Option<Vec<Map<String, Value>>> = self.post("entities/search", body).await?;
        rows.unwrap_or_default().into_iter().map(parse_hit).collect()
    }
}

fn parse_hit(mut row: Map<String, Value>) -> Result<SearchHit, StoreError> {
    let content = match row.remove(CONTENT) {
        Some(Value::String(s)) => s,
        _ => return Err(StoreError::InvalidData("Search hit without content".to_string())),
    };
    // Older servers return JSON fields as strings
    let metadata = match row.remove(METADATA) {
        Some(Value::Object(map)) => map,
        Some(Value::String(raw)) => serde_json::from_str(&raw)?,
        _ => Map::new(),
    };
    let score = row.get("distance").and_then(Value::as_f64).unwrap_or(0.0) as f32;
    Ok(SearchHit {
        content,
        metadata,
        score,
    })
}

#[async_trait]
impl VectorStore for MilvusStore {
    type Error = StoreError;

    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<(), Self::Error> {
        if self.has_collection(collection).await? {
            self.full_text_for(collection).await?;
            return Ok(());
        }

        let mut full_text = self.config.full_text;
        if full_text {
            let created: Result<Option<Value>, StoreError> = self
                .post("collections/create", self.create_body(collection, dimension, true))
                .await;
            match created {
                Ok(_) => {}
                // Servers before 2.5 reject the BM25 function and analyzer params
                Err(StoreError::Milvus { code, message }) => {
                    warn!(
                        collection,
                        code,
                        "Server rejected the BM25 schema ({}); creating without full-text search",
                        message
                    );
                    full_text = false;
                }
                Err(e) => return Err(e),
            }
        }
        if !full_text {
            let _: Option<Value> = self
                .post("collections/create", self.create_body(collection, dimension, false))
                .await?;
        }
        if self.config.full_text {
            let _ = self.full_text_available.set(full_text);
        }
        info!(collection, dimension, full_text, "Created Milvus collection");
        Ok(())
    }

    async fn insert(&self, collection: &str, chunks: Vec<Chunk>) -> Result<usize, Self::Error> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let rows: Vec<Value> = chunks
            .into_iter()
            .map(|chunk| {
                json!({
                    CONTENT: chunk.content,
                    VECTOR: chunk.vector,
                    METADATA: chunk.metadata,
                })
            })
            .collect();
        let expected = rows.len();
        let result: Option<InsertResult> = self
            .post(
                "entities/insert",
                json!({ "collectionName": collection, "data": rows }),
            )
            .await?;
        let inserted = result.map(|r| r.insert_count).unwrap_or(expected);
        debug!(collection, inserted, "Inserted chunks into Milvus");
        Ok(inserted)
    }

    async fn search_by_vector(
        &self,
        collection: &str,
        vector: &[f32],
        document_ids: &[String],
        limit: usize,
    ) -> Result<Vec<SearchHit>, Self::Error> {
        let body = self.search_body(collection, json!(vector), VECTOR, document_ids, limit);
        self.search(body).await
    }

    async fn search_full_text(
        &self,
        collection: &str,
        query: &str,
        document_ids: &[String],
        limit: usize,
    ) -> Result<Vec<SearchHit>, Self::Error> {
        if !self.config.full_text {
            return Err(StoreError::FullTextUnsupported);
        }
        if !self.full_text_for(collection).await? {
            return Ok(Vec::new());
        }
        let body = self.search_body(collection, json!(query), SPARSE_VECTOR, document_ids, limit);
        self.search(body).await
    }

    fn supports_full_text(&self) -> bool {
        self.config.full_text && self.full_text_available.get().copied().unwrap_or(true)
    }
}
