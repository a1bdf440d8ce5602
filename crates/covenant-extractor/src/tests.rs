//! End-to-end tests for preprocessing and extraction
//!
//! These run the real chunker, store and engine against the mock provider
//! and the deterministic hash embedder.

#[cfg(test)]
mod tests {
    use crate::prompt::BUDGET_EXHAUSTED_NOTICE;
    use crate::*;
    use async_trait::async_trait;
    use covenant_domain::traits::{LlmProvider, VectorStore};
    use covenant_domain::{
        CompletionReply, CompletionRequest, Condition, FieldKind, FieldRecord, FieldSpec,
        MetricValue, Role, SchemaManifest,
    };
    use covenant_llm::{LlmError, MockProvider};
    use covenant_store::{HashEmbedder, MemoryStore};
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    const CONTRACT: &str = "MASTER SERVICES AGREEMENT between Acme Hosting Ltd and Globex Corp. \
        The effective date of this agreement is March 1, 2024.\n\n\
        The Provider shall ensure system uptime of at least 99.9% measured monthly. \
        Scheduled maintenance is excluded from uptime.\n\n\
        Severity 1 incidents must receive a response within 30 minutes. \
        Invoices are payable within thirty days of receipt.";

    const COLLECTION: &str = "_acme";
    const DOCUMENT: &str = "contract-1";

    const UPTIME_JSON: &str = r#"{"metric_value": {"min_value": 99.9, "max_value": null, "data_type": "%"},
        "condition": ">=", "frequency": "monthly", "description": "system uptime"}"#;

    struct Fixture {
        _dir: TempDir,
        path: PathBuf,
        embedder: Arc<HashEmbedder>,
        store: Arc<MemoryStore>,
    }

    async fn preprocessed() -> Fixture {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("msa.txt");
        std::fs::write(&path, CONTRACT).unwrap();
        let embedder = Arc::new(HashEmbedder::new(256));
        let store = Arc::new(MemoryStore::default());

        let preprocessor = DocumentPreprocessor::new(
            Arc::clone(&embedder),
            Arc::clone(&store),
            ChunkingConfig::default(),
        )
        .unwrap();
        preprocessor.process(&path, DOCUMENT, COLLECTION).await.unwrap();

        Fixture {
            _dir: dir,
            path,
            embedder,
            store,
        }
    }

    fn manifest() -> SchemaManifest {
        SchemaManifest::new(
            [("vendor_name", "Service provider"), ("effective_date", "Start date")],
            [("uptime", "Monthly availability"), ("response_time", "Severity 1 response")],
        )
        .unwrap()
    }

    fn engine(
        fixture: &Fixture,
        llm: Arc<MockProvider>,
        config: ExtractorConfig,
    ) -> ExtractionEngine<MockProvider, HashEmbedder, MemoryStore> {
        ExtractionEngine::with_manifest(
            manifest(),
            llm,
            Arc::clone(&fixture.embedder),
            Arc::clone(&fixture.store),
            config,
        )
        .unwrap()
    }

    fn metric_field(name: &str) -> FieldSpec {
        FieldSpec {
            name: name.to_string(),
            description: "Monthly availability".to_string(),
            kind: FieldKind::Metric,
        }
    }

    /// Mock answering every summarizer and formatter prompt of [`manifest`]
    fn scripted_llm() -> Arc<MockProvider> {
        let llm = MockProvider::default();
        llm.add_response("the field \"vendor_name\"", "The vendor is Acme Hosting Ltd.");
        llm.add_response("the field \"effective_date\"", "Effective March 1, 2024.");
        llm.add_response(
            "the field \"uptime\"",
            "Minimum value: 99.9. Maximum value: not found. Data type: %. \
             Condition: at least. Frequency: monthly. Description: system uptime.",
        );
        llm.add_response("the field \"response_time\"", "Maximum value: 30 minutes.");
        llm.add_response(
            "summary of \"vendor_name\"",
            r#"{"name": "vendor_name", "value": "Acme Hosting Ltd"}"#,
        );
        llm.add_response(
            "summary of \"effective_date\"",
            r#"{"name": "effective_date", "value": "March 1, 2024"}"#,
        );
        llm.add_response("summary of \"uptime\"", UPTIME_JSON);
        llm.add_response(
            "summary of \"response_time\"",
            r#"{"metric_value": {"min_value": null, "max_value": "30 minutes", "data_type": "minutes"},
                "condition": "within", "frequency": null, "description": "severity 1 response"}"#,
        );
        Arc::new(llm)
    }

    #[tokio::test]
    async fn test_preprocess_stores_tagged_chunks() {
        let fixture = preprocessed().await;
        let count = fixture.store.chunk_count(COLLECTION).unwrap();
        assert!(count >= 1);

        let query = vec![1.0 / 16.0f32.sqrt(); 256];
        let hits = fixture
            .store
            .search_by_vector(COLLECTION, &query, &[DOCUMENT.to_string()], 100)
            .await
            .unwrap();
        assert_eq!(hits.len(), count);
        for hit in &hits {
            assert_eq!(hit.metadata["document_id"], DOCUMENT);
            assert_eq!(hit.metadata["source"], fixture.path.display().to_string());
            assert!(hit.metadata.contains_key("chunk_index"));
        }
        let stored: String = hits.iter().map(|h| h.content.as_str()).collect();
        assert!(stored.contains("99.9%"));
    }

    #[tokio::test]
    async fn test_preprocess_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("msa.md");
        std::fs::write(&path, CONTRACT).unwrap();
        let store = Arc::new(MemoryStore::default());
        let preprocessor = DocumentPreprocessor::new(
            Arc::new(HashEmbedder::new(64)),
            Arc::clone(&store),
            ChunkingConfig::default(),
        )
        .unwrap();

        let report = preprocessor.process(&path, "doc-9", "_vendor").await.unwrap();
        assert_eq!(report.document_id, "doc-9");
        assert_eq!(report.collection_name, "_vendor");
        assert_eq!(report.char_count, CONTRACT.chars().count());
        assert_eq!(report.chunk_count, store.chunk_count("_vendor").unwrap());
    }

    #[test]
    fn test_preprocessor_rejects_invalid_chunking() {
        let config = ChunkingConfig {
            max_chunk_chars: 0,
            ..ChunkingConfig::default()
        };
        let result = DocumentPreprocessor::new(
            Arc::new(HashEmbedder::new(64)),
            Arc::new(MemoryStore::default()),
            config,
        );
        assert!(matches!(result, Err(ExtractorError::Config(_))));
    }

    #[tokio::test]
    async fn test_preprocess_missing_document_touches_nothing() {
        let store = Arc::new(MemoryStore::default());
        let preprocessor = DocumentPreprocessor::new(
            Arc::new(HashEmbedder::new(64)),
            Arc::clone(&store),
            ChunkingConfig::default(),
        )
        .unwrap();

        let result = preprocessor
            .process(std::path::Path::new("/no/such/contract.pdf"), "doc", "_vendor")
            .await;
        assert!(matches!(result, Err(ExtractorError::Input(_))));
        assert!(store.collection_names().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_full_extraction_in_manifest_order() {
        let fixture = preprocessed().await;
        let llm = scripted_llm();
        let outcome = engine(&fixture, Arc::clone(&llm), ExtractorConfig::default())
            .extract(DOCUMENT, COLLECTION)
            .await
            .unwrap();

        assert!(outcome.is_complete(), "failures: {:?}", outcome.failures);
        let names: Vec<&str> = outcome.document.names().collect();
        assert_eq!(names, vec!["vendor_name", "effective_date", "uptime", "response_time"]);

        let uptime = outcome.document.get("uptime").unwrap().as_metric().unwrap();
        assert_eq!(uptime.metric_value, MetricValue::at_least(99.9, "%"));
        assert_eq!(uptime.condition, Condition::GreaterOrEqual);
        assert_eq!(uptime.frequency.as_deref(), Some("monthly"));
        assert_eq!(uptime.description.as_deref(), Some("system uptime"));

        let response = outcome.document.get("response_time").unwrap().as_metric().unwrap();
        assert_eq!(response.metric_value.max_value, Some(30.0));
        assert_eq!(response.condition, Condition::LessOrEqual);

        let json = serde_json::to_value(&outcome.document).unwrap();
        assert_eq!(json["effective_date"], json!({"name": "effective_date", "value": "2024-03-01"}));
        assert_eq!(json["vendor_name"]["value"], "Acme Hosting Ltd");

        assert_eq!(outcome.metadata.fields_attempted, 4);
        assert_eq!(outcome.metadata.model_name, "mock");
        assert_eq!(outcome.metadata.document_id, DOCUMENT);
        // One summary call and one format call per field
        assert_eq!(llm.call_count(), 8);
    }

    #[tokio::test]
    async fn test_failed_fields_are_omitted_not_fatal() {
        let fixture = preprocessed().await;
        let llm = Arc::new(MockProvider::default());
        llm.add_error("the field \"effective_date\"");
        llm.add_response("summary of \"uptime\"", "I could not format this.");
        llm.add_response("the field", "Summary of what the contract says.");
        llm.add_response("summary of \"vendor_name\"", r#"{"value": "Acme Hosting Ltd"}"#);
        llm.add_response(
            "summary of \"response_time\"",
            r#"{"metric_value": {"min_value": null, "max_value": 30, "data_type": "minutes"}, "condition": "<="}"#,
        );

        let outcome = engine(&fixture, Arc::clone(&llm), ExtractorConfig::default())
            .extract(DOCUMENT, COLLECTION)
            .await
            .unwrap();

        let names: Vec<&str> = outcome.document.names().collect();
        assert_eq!(names, vec!["vendor_name", "response_time"]);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.failures[0].field_name, "effective_date");
        assert!(outcome.failures[0].reason.contains("LLM error"));
        assert_eq!(outcome.failures[1].field_name, "uptime");
        assert!(outcome.failures[1].reason.contains("Malformed output"));
    }

    #[tokio::test]
    async fn test_unknown_document_yields_no_context_failures() {
        let fixture = preprocessed().await;
        let llm = scripted_llm();
        let outcome = engine(&fixture, Arc::clone(&llm), ExtractorConfig::default())
            .extract("other-contract", COLLECTION)
            .await
            .unwrap();

        assert!(outcome.document.is_empty());
        assert_eq!(outcome.failures.len(), 4);
        assert!(outcome
            .failures
            .iter()
            .all(|f| f.reason.starts_with("No context retrieved")));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_metric_without_thresholds_is_null() {
        let fixture = preprocessed().await;
        let llm = MockProvider::default();
        llm.add_response(
            "summary of \"response_time\"",
            r#"{"metric_value": {"min_value": "not found", "max_value": null, "data_type": null},
                "condition": null, "frequency": null, "description": null}"#,
        );
        llm.add_response("summary of \"uptime\"", UPTIME_JSON);
        llm.add_response("summary of", r#"{"value": null}"#);
        let config = ExtractorConfig {
            max_concurrency: 1,
            ..ExtractorConfig::default()
        };

        let outcome = engine(&fixture, Arc::new(llm), config)
            .extract(DOCUMENT, COLLECTION)
            .await
            .unwrap();
        assert_eq!(outcome.document.len(), 4);
        assert_eq!(outcome.document.get("response_time"), Some(&FieldRecord::NotFound));

        let json = serde_json::to_value(&outcome.document).unwrap();
        assert!(json["response_time"].is_null());
        assert!(json["vendor_name"]["value"].is_null());
    }

    #[tokio::test]
    async fn test_tool_loop_is_bounded() {
        let fixture = preprocessed().await;
        let llm = Arc::new(MockProvider::default());
        llm.push_tool_call("call_1", "retrieve", json!({"query": "service credits"}));
        llm.push_tool_call("call_2", "retrieve", json!({"query": "maintenance windows"}));
        llm.push_text("Minimum value: 99.9. Condition: at least.");

        let config = ExtractorConfig {
            max_tool_iterations: 2,
            ..ExtractorConfig::default()
        };
        let summarizer = FieldSummarizer::new(
            Arc::clone(&llm),
            Arc::clone(&fixture.embedder),
            Arc::clone(&fixture.store),
            config,
        );

        let summary = summarizer
            .summarize(&metric_field("uptime"), DOCUMENT, COLLECTION)
            .await
            .unwrap();
        // Two tool rounds, then one call without tools
        assert_eq!(llm.call_count(), 3);
        assert_eq!(summary.summary_text, "Minimum value: 99.9. Condition: at least.");
        assert_eq!(summary.kind, FieldKind::Metric);

        let requests = llm.requests();
        assert!(!requests[0].tools.is_empty());
        assert!(!requests[1].tools.is_empty());
        assert!(requests[2].tools.is_empty());
        let last = requests[2].messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, BUDGET_EXHAUSTED_NOTICE);

        // Tool results are answered with numbered passages
        let tool_messages: Vec<_> = requests[2]
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();
        assert_eq!(tool_messages.len(), 2);
        assert_eq!(tool_messages[0].tool_call_id.as_deref(), Some("call_1"));
        assert!(tool_messages[0].content.starts_with("[1]"));
    }

    #[tokio::test]
    async fn test_summarizer_stops_at_first_answer() {
        let fixture = preprocessed().await;
        let llm = Arc::new(MockProvider::default());
        llm.push_tool_call("call_1", "search_web", json!({"query": "uptime"}));
        llm.push_text("Minimum value: 99.9. Frequency: monthly.");

        let summarizer = FieldSummarizer::new(
            Arc::clone(&llm),
            Arc::clone(&fixture.embedder),
            Arc::clone(&fixture.store),
            ExtractorConfig::default(),
        );
        let summary = summarizer
            .summarize(&metric_field("uptime"), DOCUMENT, COLLECTION)
            .await
            .unwrap();

        assert_eq!(summary.summary_text, "Minimum value: 99.9. Frequency: monthly.");
        assert_eq!(llm.call_count(), 2);
        let tool_reply = llm.requests()[1]
            .messages
            .iter()
            .find(|m| m.role == Role::Tool)
            .cloned()
            .unwrap();
        assert!(tool_reply.content.starts_with("Unknown tool 'search_web'"));
    }

    #[tokio::test]
    async fn test_empty_answer_is_malformed() {
        let fixture = preprocessed().await;
        let llm = Arc::new(MockProvider::default());
        llm.push_reply(CompletionReply::text("   "));

        let summarizer = FieldSummarizer::new(
            Arc::clone(&llm),
            Arc::clone(&fixture.embedder),
            Arc::clone(&fixture.store),
            ExtractorConfig::default(),
        );
        let result = summarizer
            .summarize(&metric_field("uptime"), DOCUMENT, COLLECTION)
            .await;
        assert!(matches!(result, Err(ExtractorError::MalformedOutput(_))));
    }

    #[tokio::test]
    async fn test_seed_retrieval_merges_vector_and_full_text() {
        let fixture = preprocessed().await;
        let summarizer = FieldSummarizer::new(
            Arc::new(MockProvider::default()),
            Arc::clone(&fixture.embedder),
            Arc::clone(&fixture.store),
            ExtractorConfig::default(),
        );

        let hits = summarizer.retrieve("uptime", DOCUMENT, COLLECTION).await.unwrap();
        assert!(!hits.is_empty());
        let mut contents: Vec<&str> = hits.iter().map(|h| h.content.as_str()).collect();
        let before = contents.len();
        contents.sort();
        contents.dedup();
        assert_eq!(contents.len(), before);
        assert!(hits.iter().any(|h| h.content.contains("uptime")));
    }

    #[tokio::test]
    async fn test_missing_manifest_fails_fast() {
        let fixture = preprocessed().await;
        let result = ExtractionEngine::new(
            "/no/such/manifest.json",
            scripted_llm(),
            Arc::clone(&fixture.embedder),
            Arc::clone(&fixture.store),
            ExtractorConfig::default(),
        );
        assert!(matches!(result, Err(ExtractorError::Input(_))));
    }

    #[tokio::test]
    async fn test_manifest_loaded_from_file() {
        let fixture = preprocessed().await;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(
            &path,
            r#"{"base_fields": {"vendor_name": "Service provider"}, "metrics": {"uptime": "Availability"}}"#,
        )
        .unwrap();

        let engine = ExtractionEngine::new(
            &path,
            scripted_llm(),
            Arc::clone(&fixture.embedder),
            Arc::clone(&fixture.store),
            ExtractorConfig::default(),
        )
        .unwrap();
        assert_eq!(engine.manifest().len(), 2);
        let outcome = engine.extract(DOCUMENT, COLLECTION).await.unwrap();
        assert_eq!(outcome.document.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let fixture = preprocessed().await;
        let config = ExtractorConfig {
            max_concurrency: 0,
            ..ExtractorConfig::default()
        };
        let result = ExtractionEngine::with_manifest(
            manifest(),
            scripted_llm(),
            Arc::clone(&fixture.embedder),
            Arc::clone(&fixture.store),
            config,
        );
        assert!(matches!(result, Err(ExtractorError::Config(_))));
    }

    /// Provider that never answers within the deadline
    struct StalledProvider;

    #[async_trait]
    impl LlmProvider for StalledProvider {
        type Error = LlmError;

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionReply, LlmError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(CompletionReply::text("too late"))
        }

        fn model_name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_extraction_timeout() {
        let fixture = preprocessed().await;
        let config = ExtractorConfig {
            extraction_timeout_secs: 1,
            ..ExtractorConfig::default()
        };
        let engine = ExtractionEngine::with_manifest(
            manifest(),
            Arc::new(StalledProvider),
            Arc::clone(&fixture.embedder),
            Arc::clone(&fixture.store),
            config,
        )
        .unwrap();

        let result = engine.extract(DOCUMENT, COLLECTION).await;
        assert!(matches!(result, Err(ExtractorError::Timeout)));
    }
}
