//! Extracted field records and the assembled target-metrics document

use crate::metric::TargetMetric;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Contract metadata field, e.g. vendor name or effective date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseRecord {
    /// Field name as declared in the manifest
    pub name: String,
    /// Extracted value, `None` when the contract does not state it
    #[serde(default)]
    pub value: Option<String>,
}

/// Formatted value of one manifest field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRecord {
    /// Contract metadata
    Base(BaseRecord),
    /// SLA target
    Metric(TargetMetric),
    /// Field could not be determined from the contract
    NotFound,
}

impl FieldRecord {
    /// Whether this record carries a value
    pub fn is_found(&self) -> bool {
        !matches!(self, FieldRecord::NotFound)
    }

    /// Borrow the target metric, if this is one
    pub fn as_metric(&self) -> Option<&TargetMetric> {
        match self {
            FieldRecord::Metric(target) => Some(target),
            _ => None,
        }
    }
}

impl Serialize for FieldRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldRecord::Base(record) => record.serialize(serializer),
            FieldRecord::Metric(target) => target.serialize(serializer),
            FieldRecord::NotFound => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for FieldRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::Null => Ok(FieldRecord::NotFound),
            Value::Object(map) if map.contains_key("metric_value") => {
                serde_json::from_value(value).map(FieldRecord::Metric).map_err(de::Error::custom)
            }
            Value::Object(map) if map.contains_key("name") => {
                serde_json::from_value(value).map(FieldRecord::Base).map_err(de::Error::custom)
            }
            other => Err(de::Error::custom(format!(
                "expected a base record, target metric or null, got {}",
                other
            ))),
        }
    }
}

/// Target-metrics document: field name to record, in manifest order
///
/// Serializes as a JSON object. Absent or `null` fields mean "not found".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedDocument {
    entries: Vec<(String, FieldRecord)>,
}

impl ExtractedDocument {
    /// Empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field, keeping first-insertion order
    pub fn insert(&mut self, name: impl Into<String>, record: FieldRecord) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = record,
            None => self.entries.push((name, record)),
        }
    }

    /// Look up a field
    pub fn get(&self, name: &str) -> Option<&FieldRecord> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    /// Number of fields present (including `NotFound` entries)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the document has no fields
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Field names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldRecord)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// Every metric field that resolved to a target
    pub fn target_metrics(&self) -> impl Iterator<Item = (&str, &TargetMetric)> {
        self.entries
            .iter()
            .filter_map(|(n, r)| r.as_metric().map(|t| (n.as_str(), t)))
    }

    /// Parse a document from JSON text
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl Serialize for ExtractedDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, record) in &self.entries {
            map.serialize_entry(name, record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ExtractedDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = serde_json::Map::<String, Value>::deserialize(deserializer)?;
        let mut document = ExtractedDocument::new();
        for (name, value) in map {
            let record: FieldRecord = serde_json::from_value(value).map_err(de::Error::custom)?;
            document.insert(name, record);
        }
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Condition, MetricValue};

    fn sample() -> ExtractedDocument {
        let mut doc = ExtractedDocument::new();
        doc.insert(
            "vendor_name",
            FieldRecord::Base(BaseRecord {
                name: "vendor_name".to_string(),
                value: Some("Acme Hosting".to_string()),
            }),
        );
        doc.insert(
            "uptime",
            FieldRecord::Metric(
                TargetMetric::new(MetricValue::at_least(99.9, "%"), Condition::GreaterOrEqual)
                    .with_frequency("monthly"),
            ),
        );
        doc.insert("penalty_cap", FieldRecord::NotFound);
        doc
    }

    #[test]
    fn test_serializes_in_insertion_order() {
        let json = serde_json::to_string(&sample()).unwrap();
        let vendor = json.find("vendor_name").unwrap();
        let uptime = json.find("uptime").unwrap();
        let penalty = json.find("penalty_cap").unwrap();
        assert!(vendor < uptime && uptime < penalty);
        assert!(json.contains("\"penalty_cap\":null"));
    }

    #[test]
    fn test_round_trip_preserves_variants() {
        let doc = sample();
        let json = serde_json::to_string(&doc).unwrap();
        let parsed = ExtractedDocument::from_json(&json).unwrap();
        assert_eq!(parsed, doc);
        assert!(matches!(parsed.get("uptime"), Some(FieldRecord::Metric(_))));
        assert!(matches!(parsed.get("penalty_cap"), Some(FieldRecord::NotFound)));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut doc = sample();
        doc.insert("vendor_name", FieldRecord::NotFound);
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.names().next(), Some("vendor_name"));
        assert!(!doc.get("vendor_name").unwrap().is_found());
    }

    #[test]
    fn test_target_metrics_filters() {
        let doc = sample();
        let targets: Vec<_> = doc.target_metrics().collect();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].0, "uptime");
    }

    #[test]
    fn test_rejects_unknown_shape() {
        assert!(ExtractedDocument::from_json(r#"{"x": 5}"#).is_err());
    }
}
