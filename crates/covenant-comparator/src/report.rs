//! Batch comparison inputs and compliance reports

use crate::error::ComparatorError;
use chrono::{DateTime, Utc};
use covenant_domain::{ActualMetric, ComparisonResult, ExtractedDocument, TargetMetric};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One metric to compare
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonInput {
    /// Metric name
    pub metric: String,
    /// Observed reading
    pub actual: ActualMetric,
    /// Contractual target
    pub target: TargetMetric,
}

/// Observed readings by metric name, in file order
pub type Actuals = Vec<(String, ActualMetric)>;

/// Parse an actuals file: `{"metric": {"value": 99.85, "data_type": "%"}, ...}`
pub fn parse_actuals(text: &str) -> Result<Actuals, ComparatorError> {
    let raw: Map<String, Value> = serde_json::from_str(text)
        .map_err(|e| ComparatorError::InvalidInput(format!("actuals file: {}", e)))?;
    raw.into_iter()
        .map(|(name, value)| {
            serde_json::from_value::<ActualMetric>(value)
                .map(|actual| (name.clone(), actual))
                .map_err(|e| ComparatorError::InvalidInput(format!("actual '{}': {}", name, e)))
        })
        .collect()
}

/// Pair extracted targets with readings
///
/// Returns the comparison inputs in document order and the names of target
/// metrics that have no reading.
pub fn pair_metrics(
    document: &ExtractedDocument,
    actuals: &[(String, ActualMetric)],
) -> (Vec<ComparisonInput>, Vec<String>) {
    let mut inputs = Vec::new();
    let mut unmatched = Vec::new();
    for (name, target) in document.target_metrics() {
        match actuals.iter().find(|(metric, _)| metric == name) {
            Some((_, actual)) => inputs.push(ComparisonInput {
                metric: name.to_string(),
                actual: actual.clone(),
                target: target.clone(),
            }),
            None => unmatched.push(name.to_string()),
        }
    }
    (inputs, unmatched)
}

/// What happened to one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    /// The workflow produced a verdict
    Compared(ComparisonResult),
    /// The workflow failed for this metric
    Failed {
        /// Why it failed
        reason: String,
    },
}

/// Outcome for one metric in a reporting period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceRecord {
    /// Metric name
    pub metric: String,
    /// Observed reading
    pub actual: ActualMetric,
    /// Contractual target
    pub target: TargetMetric,
    /// Verdict or failure
    pub outcome: ComparisonOutcome,
}

impl ComplianceRecord {
    /// The verdict, if the workflow succeeded
    pub fn result(&self) -> Option<&ComparisonResult> {
        match &self.outcome {
            ComparisonOutcome::Compared(result) => Some(result),
            ComparisonOutcome::Failed { .. } => None,
        }
    }
}

/// Compliance records for a batch of metrics, in input order
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceReport {
    /// One record per input
    pub records: Vec<ComplianceRecord>,
    /// When the batch finished
    pub generated_at: DateTime<Utc>,
}

impl ComplianceReport {
    /// Metrics that met their target
    pub fn compliant_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.result().is_some_and(|res| res.is_compliant))
            .count()
    }

    /// Metrics that missed their target
    pub fn non_compliant_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.result().is_some_and(|res| !res.is_compliant))
            .count()
    }

    /// Metrics whose comparison failed
    pub fn failed_count(&self) -> usize {
        self.records.iter().filter(|r| r.result().is_none()).count()
    }
}
