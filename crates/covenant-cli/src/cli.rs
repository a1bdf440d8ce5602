//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Covenant CLI - Extract SLA targets from contracts and check compliance.
#[derive(Debug, Parser)]
#[command(name = "covenant")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "COVENANT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (names and ids only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Chunk a contract and store it in the vendor's collection
    Ingest(IngestArgs),

    /// Extract the target-metrics document from an ingested contract
    Extract(ExtractArgs),

    /// Compare actual readings with extracted targets
    Compare(CompareArgs),

    /// Validate and list a schema manifest
    Manifest(ManifestArgs),
}

/// Arguments for the ingest command.
#[derive(Debug, Parser)]
pub struct IngestArgs {
    /// Contract file (PDF or plain text)
    pub document: PathBuf,

    /// Vendor the contract belongs to
    #[arg(short, long)]
    pub vendor: String,

    /// Document id to tag chunks with (generated when omitted)
    #[arg(short, long)]
    pub document_id: Option<String>,
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Document id returned by ingest
    pub document_id: String,

    /// Vendor the contract belongs to
    #[arg(short, long)]
    pub vendor: String,

    /// Schema manifest (JSON)
    #[arg(short, long)]
    pub manifest: PathBuf,

    /// Write the extracted document to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the compare command.
#[derive(Debug, Parser)]
pub struct CompareArgs {
    /// Extracted target-metrics document (JSON)
    #[arg(short, long)]
    pub targets: PathBuf,

    /// Actual readings: {"metric": {"value": .., "data_type": ..}}
    #[arg(short, long)]
    pub actuals: PathBuf,

    /// Write the compliance report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the manifest command.
#[derive(Debug, Parser)]
pub struct ManifestArgs {
    /// Schema manifest (JSON)
    pub path: PathBuf,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
