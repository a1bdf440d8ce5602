//! Extraction engine: every manifest field, summarized and formatted

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::formatter::SchemaFormatter;
use crate::summarizer::FieldSummarizer;
use crate::types::{ExtractionMetadata, ExtractionOutcome, FieldFailure, FormattedRecord};
use chrono::Utc;
use covenant_domain::traits::{Embedder, LlmProvider, VectorStore};
use covenant_domain::{ExtractedDocument, FieldSpec, SchemaManifest};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{info, warn};

type FieldResult = Result<FormattedRecord, ExtractorError>;

/// Extracts a target-metrics document from a preprocessed contract
pub struct ExtractionEngine<L, E, S> {
    manifest: Arc<SchemaManifest>,
    summarizer: Arc<FieldSummarizer<L, E, S>>,
    formatter: Arc<SchemaFormatter<L>>,
    config: ExtractorConfig,
    model_name: String,
}

impl<L, E, S> ExtractionEngine<L, E, S>
where
    L: LlmProvider + 'static,
    E: Embedder + 'static,
    S: VectorStore + 'static,
{
    /// Create an engine, loading the manifest from `manifest_path`
    pub fn new(
        manifest_path: impl AsRef<Path>,
        llm: Arc<L>,
        embedder: Arc<E>,
        store: Arc<S>,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractorError> {
        let path = manifest_path.as_ref();
        if !path.exists() {
            return Err(ExtractorError::Input(format!(
                "Manifest not found: {}",
                path.display()
            )));
        }
        let manifest = SchemaManifest::from_file(path)?;
        Self::with_manifest(manifest, llm, embedder, store, config)
    }

    /// Create an engine from an already loaded manifest
    pub fn with_manifest(
        manifest: SchemaManifest,
        llm: Arc<L>,
        embedder: Arc<E>,
        store: Arc<S>,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        let model_name = llm.model_name().to_string();
        Ok(Self {
            manifest: Arc::new(manifest),
            formatter: Arc::new(SchemaFormatter::new(Arc::clone(&llm), config.temperature)),
            summarizer: Arc::new(FieldSummarizer::new(llm, embedder, store, config.clone())),
            config,
            model_name,
        })
    }

    /// The manifest fields are extracted from
    pub fn manifest(&self) -> &SchemaManifest {
        &self.manifest
    }

    /// Extract every manifest field of `document_id` from `collection`
    ///
    /// Failed fields are left out of the document and listed in
    /// [`ExtractionOutcome::failures`]; they never fail the run. Only the
    /// overall deadline does.
    pub async fn extract(
        &self,
        document_id: &str,
        collection: &str,
    ) -> Result<ExtractionOutcome, ExtractorError> {
        let started_at = Utc::now();
        let start = Instant::now();
        info!(
            "Starting extraction of {} fields for document {} in '{}'",
            self.manifest.len(),
            document_id,
            collection
        );

        let results = timeout(
            self.config.extraction_timeout(),
            self.run_fields(document_id, collection),
        )
        .await
        .map_err(|_| ExtractorError::Timeout)?;

        let mut document = ExtractedDocument::new();
        let mut failures = Vec::new();
        for (field, result) in self.manifest.fields().zip(results) {
            match result {
                Ok(formatted) => document.insert(formatted.field_name, formatted.record),
                Err(e) => {
                    warn!("Skipping field '{}': {}", field.name, e);
                    failures.push(FieldFailure {
                        field_name: field.name.clone(),
                        kind: field.kind,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Extracted {}/{} fields for document {} in {}ms",
            document.len(),
            self.manifest.len(),
            document_id,
            processing_time_ms
        );

        Ok(ExtractionOutcome {
            document,
            failures,
            metadata: ExtractionMetadata {
                document_id: document_id.to_string(),
                collection: collection.to_string(),
                model_name: self.model_name.clone(),
                fields_attempted: self.manifest.len(),
                started_at,
                processing_time_ms,
            },
        })
    }

    /// Run all fields with bounded parallelism; results follow manifest order
    async fn run_fields(&self, document_id: &str, collection: &str) -> Vec<FieldResult> {
        let fields: Vec<FieldSpec> = self.manifest.fields().cloned().collect();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, field) in fields.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let summarizer = Arc::clone(&self.summarizer);
            let formatter = Arc::clone(&self.formatter);
            let document_id = document_id.to_string();
            let collection = collection.to_string();

            tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                let result =
                    run_field(&summarizer, &formatter, &field, &document_id, &collection).await;
                (index, result)
            });
        }

        let mut results: Vec<Option<FieldResult>> = fields.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => warn!("Field task ended abnormally: {}", e),
            }
        }

        results
            .into_iter()
            .map(|result| {
                result.unwrap_or_else(|| {
                    Err(ExtractorError::Task("field task did not complete".to_string()))
                })
            })
            .collect()
    }
}

async fn run_field<L, E, S>(
    summarizer: &FieldSummarizer<L, E, S>,
    formatter: &SchemaFormatter<L>,
    field: &FieldSpec,
    document_id: &str,
    collection: &str,
) -> FieldResult
where
    L: LlmProvider,
    E: Embedder,
    S: VectorStore,
{
    let summary = summarizer.summarize(field, document_id, collection).await?;
    formatter.format(&summary).await
}
