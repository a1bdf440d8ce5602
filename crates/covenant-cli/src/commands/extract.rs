//! Extract command implementation.

use super::write_output;
use crate::backend::{AnyEmbedder, AnyStore, Provider};
use crate::cli::ExtractArgs;
use crate::config::AppConfig;
use crate::error::Result;
use crate::output::Formatter;
use covenant_domain::collection_name_for;
use covenant_extractor::ExtractionEngine;
use std::sync::Arc;

/// Execute the extract command.
pub async fn execute_extract(args: ExtractArgs, config: &AppConfig, formatter: &Formatter) -> Result<()> {
    let engine = ExtractionEngine::new(
        &args.manifest,
        Arc::new(Provider::from_config(config)?),
        Arc::new(AnyEmbedder::from_config(config)?),
        Arc::new(AnyStore::from_config(config)?),
        config.extraction.clone(),
    )?;

    let collection = collection_name_for(&args.vendor);
    let outcome = engine.extract(&args.document_id, &collection).await?;

    if let Some(path) = &args.output {
        write_output(path, &serde_json::to_string_pretty(&outcome.document)?)?;
        eprintln!(
            "{}",
            formatter.success(&format!("Wrote target metrics to {}", path.display()))
        );
    }
    for failure in &outcome.failures {
        eprintln!(
            "{}",
            formatter.warning(&format!("{}: {}", failure.field_name, failure.reason))
        );
    }

    println!("{}", formatter.format_extraction(&outcome)?);
    Ok(())
}
