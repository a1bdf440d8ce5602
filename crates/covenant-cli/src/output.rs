//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use covenant_comparator::{ComparisonOutcome, ComplianceReport};
use covenant_domain::{fmt_num, Condition, FieldKind, FieldRecord, MetricValue, SchemaManifest, TargetMetric};
use covenant_extractor::{ExtractionOutcome, PreprocessReport};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the result of ingesting a contract.
    pub fn format_preprocess(&self, report: &PreprocessReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Quiet => Ok(report.document_id.clone()),
            OutputFormat::Table => Ok(format!(
                "{}\n  document id: {}\n  collection:  {}\n  characters:  {}",
                self.success(&format!("Stored {} chunk(s)", report.chunk_count)),
                report.document_id,
                report.collection_name,
                report.char_count
            )),
        }
    }

    /// Format an extraction outcome.
    ///
    /// JSON output is the target-metrics document alone, so it can be fed
    /// straight back into `compare`.
    pub fn format_extraction(&self, outcome: &ExtractionOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&outcome.document)?),
            OutputFormat::Quiet => Ok(outcome
                .document
                .iter()
                .filter(|(_, record)| record.is_found())
                .map(|(name, _)| name.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => self.format_extraction_table(outcome),
        }
    }

    fn format_extraction_table(&self, outcome: &ExtractionOutcome) -> Result<String> {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (name, record) in outcome.document.iter() {
            builder.push_record([name.to_string(), describe_record(record)]);
        }
        for failure in &outcome.failures {
            builder.push_record([
                failure.field_name.clone(),
                self.colorize(&format!("failed: {}", failure.reason), "red"),
            ]);
        }

        let mut lines = vec![styled(builder)];
        lines.push(self.info(&format!(
            "{} of {} field(s) extracted in {}ms with {}",
            outcome.document.len(),
            outcome.metadata.fields_attempted,
            outcome.metadata.processing_time_ms,
            outcome.metadata.model_name
        )));
        Ok(lines.join("\n"))
    }

    /// Format a compliance report.
    pub fn format_report(&self, report: &ComplianceReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Quiet => Ok(report
                .records
                .iter()
                .map(|record| {
                    let status = match &record.outcome {
                        ComparisonOutcome::Compared(r) if r.is_compliant => "compliant",
                        ComparisonOutcome::Compared(_) => "non_compliant",
                        ComparisonOutcome::Failed { .. } => "failed",
                    };
                    format!("{}\t{}", record.metric, status)
                })
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => self.format_report_table(report),
        }
    }

    fn format_report_table(&self, report: &ComplianceReport) -> Result<String> {
        if report.records.is_empty() {
            return Ok(self.colorize("No metrics to compare.", "yellow"));
        }

        let mut builder = Builder::default();
        builder.push_record(["Metric", "Actual", "Target", "Compliant", "Remark", "Reason"]);
        for record in &report.records {
            let actual = format!("{} {}", fmt_num(record.actual.value), record.actual.data_type);
            let target = describe_target(&record.target);
            let row = match &record.outcome {
                ComparisonOutcome::Compared(result) => {
                    let compliant = if result.is_compliant {
                        self.colorize("yes", "green")
                    } else {
                        self.colorize("no", "red")
                    };
                    [
                        record.metric.clone(),
                        actual,
                        target,
                        compliant,
                        result.remark.to_string(),
                        result.reason.clone().unwrap_or_default(),
                    ]
                }
                ComparisonOutcome::Failed { reason } => [
                    record.metric.clone(),
                    actual,
                    target,
                    self.colorize("error", "yellow"),
                    String::new(),
                    reason.clone(),
                ],
            };
            builder.push_record(row);
        }

        let summary = format!(
            "{} compliant, {} non-compliant, {} failed",
            report.compliant_count(),
            report.non_compliant_count(),
            report.failed_count()
        );
        Ok(format!("{}\n{}", styled(builder), self.info(&summary)))
    }

    /// Format a schema manifest.
    pub fn format_manifest(&self, manifest: &SchemaManifest) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(manifest.to_json()),
            OutputFormat::Quiet => Ok(manifest
                .fields()
                .map(|f| f.name.clone())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Field", "Kind", "Description"]);
                for field in manifest.fields() {
                    let kind = match field.kind {
                        FieldKind::Base => "base",
                        FieldKind::Metric => "metric",
                    };
                    builder.push_record([field.name.clone(), kind.to_string(), field.description.clone()]);
                }
                Ok(styled(builder))
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn styled(builder: Builder) -> String {
    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

fn describe_bounds(value: &MetricValue) -> String {
    match (value.min_value, value.max_value) {
        (Some(min), Some(max)) => format!("{}..{} {}", fmt_num(min), fmt_num(max), value.data_type),
        (Some(min), None) => format!("min {} {}", fmt_num(min), value.data_type),
        (None, Some(max)) => format!("max {} {}", fmt_num(max), value.data_type),
        (None, None) => format!("- {}", value.data_type),
    }
}

/// One-line rendering of a target, e.g. `>= min 99.9 % (monthly)`.
pub fn describe_target(target: &TargetMetric) -> String {
    let mut text = match target.condition {
        Condition::NotApplied => describe_bounds(&target.metric_value),
        condition => format!("{} {}", condition, describe_bounds(&target.metric_value)),
    };
    if let Some(frequency) = &target.frequency {
        text.push_str(&format!(" ({})", frequency));
    }
    text
}

/// One-line rendering of an extracted record.
pub fn describe_record(record: &FieldRecord) -> String {
    match record {
        FieldRecord::Base(base) => base.value.clone().unwrap_or_else(|| "-".to_string()),
        FieldRecord::Metric(target) => describe_target(target),
        FieldRecord::NotFound => "not found".to_string(),
    }
}
