//! Compare command implementation.

use super::write_output;
use crate::backend::Provider;
use crate::cli::CompareArgs;
use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use covenant_comparator::{pair_metrics, parse_actuals, MetricComparator};
use covenant_domain::ExtractedDocument;
use std::fs;
use std::sync::Arc;

/// Execute the compare command.
pub async fn execute_compare(args: CompareArgs, config: &AppConfig, formatter: &Formatter) -> Result<()> {
    let targets = ExtractedDocument::from_json(&fs::read_to_string(&args.targets)?)?;
    let actuals = parse_actuals(&fs::read_to_string(&args.actuals)?)?;

    let (inputs, unmatched) = pair_metrics(&targets, &actuals);
    for metric in &unmatched {
        eprintln!(
            "{}",
            formatter.warning(&format!("No actual reading for '{}'", metric))
        );
    }
    if inputs.is_empty() {
        return Err(CliError::InvalidInput(
            "No target metric has a matching actual reading".to_string(),
        ));
    }

    let comparator = MetricComparator::new(
        Arc::new(Provider::from_config(config)?),
        config.comparison.clone(),
    )?;
    let report = comparator.compare_batch(inputs).await;

    if let Some(path) = &args.output {
        write_output(path, &serde_json::to_string_pretty(&report)?)?;
        eprintln!(
            "{}",
            formatter.success(&format!("Wrote compliance report to {}", path.display()))
        );
    }

    println!("{}", formatter.format_report(&report)?);
    Ok(())
}
