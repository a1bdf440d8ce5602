//! Manifest command implementation.

use crate::cli::ManifestArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use covenant_domain::SchemaManifest;

/// Execute the manifest command.
pub fn execute_manifest(args: ManifestArgs, formatter: &Formatter) -> Result<()> {
    if !args.path.exists() {
        return Err(CliError::InvalidInput(format!(
            "Manifest not found: {}",
            args.path.display()
        )));
    }
    let manifest = SchemaManifest::from_file(&args.path)?;
    println!("{}", formatter.format_manifest(&manifest)?);
    eprintln!(
        "{}",
        formatter.success(&format!(
            "{} base field(s), {} metric(s)",
            manifest.base_fields().len(),
            manifest.metrics().len()
        ))
    );
    Ok(())
}
