//! Ingest command implementation.

use crate::backend::{AnyEmbedder, AnyStore};
use crate::cli::IngestArgs;
use crate::config::AppConfig;
use crate::error::Result;
use crate::output::Formatter;
use covenant_domain::{collection_name_for, new_document_id};
use covenant_extractor::DocumentPreprocessor;
use std::sync::Arc;

/// Execute the ingest command.
pub async fn execute_ingest(args: IngestArgs, config: &AppConfig, formatter: &Formatter) -> Result<()> {
    let embedder = Arc::new(AnyEmbedder::from_config(config)?);
    let store = Arc::new(AnyStore::from_config(config)?);
    let preprocessor =
        DocumentPreprocessor::new(embedder, store, config.extraction.chunking.clone())?;

    let document_id = args.document_id.unwrap_or_else(new_document_id);
    let collection = collection_name_for(&args.vendor);
    let report = preprocessor
        .process(&args.document, &document_id, &collection)
        .await?;

    println!("{}", formatter.format_preprocess(&report)?);
    Ok(())
}
