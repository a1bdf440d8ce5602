//! Metric values: contractual targets and observed readings

use crate::condition::Condition;
use serde::{Deserialize, Serialize};

/// Numeric threshold(s) of a metric with its unit
///
/// At least one of `min_value`/`max_value` is set when the value represents a
/// contractual target. For the difference conditions `min_value` is the
/// reference and `max_value` the tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    /// Lower bound (or reference value)
    pub min_value: Option<f64>,
    /// Upper bound (or tolerance)
    pub max_value: Option<f64>,
    /// Unit label, e.g. `%`, `ms`, `hours`
    pub data_type: String,
}

impl MetricValue {
    /// Target with only a lower bound
    pub fn at_least(min: f64, data_type: impl Into<String>) -> Self {
        Self {
            min_value: Some(min),
            max_value: None,
            data_type: data_type.into(),
        }
    }

    /// Target with only an upper bound
    pub fn at_most(max: f64, data_type: impl Into<String>) -> Self {
        Self {
            min_value: None,
            max_value: Some(max),
            data_type: data_type.into(),
        }
    }

    /// Target with both bounds
    pub fn range(min: f64, max: f64, data_type: impl Into<String>) -> Self {
        Self {
            min_value: Some(min),
            max_value: Some(max),
            data_type: data_type.into(),
        }
    }

    /// Whether any threshold is present
    pub fn has_threshold(&self) -> bool {
        self.min_value.is_some() || self.max_value.is_some()
    }

    /// Reference value this target is compared against under `condition`
    pub fn reference_for(&self, condition: Condition) -> Option<f64> {
        condition.reference(self)
    }
}

/// Contractual SLA target extracted from a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetMetric {
    /// Threshold(s) and unit
    pub metric_value: MetricValue,
    /// How the actual reading must relate to the threshold
    #[serde(default)]
    pub condition: Condition,
    /// Measurement period, e.g. `monthly`
    #[serde(default)]
    pub frequency: Option<String>,
    /// Short description of the metric
    #[serde(default)]
    pub description: Option<String>,
}

impl TargetMetric {
    /// Create a target without frequency or description
    pub fn new(metric_value: MetricValue, condition: Condition) -> Self {
        Self {
            metric_value,
            condition,
            frequency: None,
            description: None,
        }
    }

    /// Set the measurement frequency
    pub fn with_frequency(mut self, frequency: impl Into<String>) -> Self {
        self.frequency = Some(frequency.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Observed KPI reading for one reporting period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualMetric {
    /// Measured value
    pub value: f64,
    /// Unit label
    pub data_type: String,
}

impl ActualMetric {
    /// Create a reading
    pub fn new(value: f64, data_type: impl Into<String>) -> Self {
        Self {
            value,
            data_type: data_type.into(),
        }
    }

    /// Whether this reading's unit matches the target's (case-insensitive)
    pub fn unit_matches(&self, target: &MetricValue) -> bool {
        normalize_unit(&self.data_type) == normalize_unit(&target.data_type)
    }
}

fn normalize_unit(unit: &str) -> String {
    let lowered = unit.trim().to_lowercase();
    match lowered.as_str() {
        "percent" | "percentage" | "pct" => "%".to_string(),
        _ => lowered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_metric_round_trip_wire_shape() {
        let target = TargetMetric::new(MetricValue::at_least(99.9, "%"), Condition::GreaterOrEqual)
            .with_frequency("monthly")
            .with_description("system uptime");

        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "metric_value": {"min_value": 99.9, "max_value": null, "data_type": "%"},
                "condition": ">=",
                "frequency": "monthly",
                "description": "system uptime"
            })
        );
    }

    #[test]
    fn test_missing_condition_defaults_to_not_applied() {
        let json = r#"{"metric_value": {"min_value": null, "max_value": 4, "data_type": "hours"}}"#;
        let target: TargetMetric = serde_json::from_str(json).unwrap();
        assert_eq!(target.condition, Condition::NotApplied);
        assert_eq!(target.frequency, None);
    }

    #[test]
    fn test_reference_selection() {
        let only_max = MetricValue::at_most(85.0, "%");
        assert_eq!(only_max.reference_for(Condition::GreaterOrEqual), Some(85.0));
        assert_eq!(only_max.reference_for(Condition::LessOrEqual), Some(85.0));

        let both = MetricValue::range(10.0, 20.0, "ms");
        assert_eq!(both.reference_for(Condition::Greater), Some(10.0));
        assert_eq!(both.reference_for(Condition::Less), Some(20.0));
        assert_eq!(both.reference_for(Condition::Equal), Some(10.0));
        assert_eq!(both.reference_for(Condition::WithinRange), None);
    }

    #[test]
    fn test_unit_matching() {
        let target = MetricValue::at_least(99.9, "%");
        assert!(ActualMetric::new(99.0, "percent").unit_matches(&target));
        assert!(!ActualMetric::new(99.0, "ms").unit_matches(&target));
    }
}
