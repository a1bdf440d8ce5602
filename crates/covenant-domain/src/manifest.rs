//! Schema manifest: the fields to extract from every contract
//!
//! The manifest is a JSON file with two ordered maps of field name to
//! free-text description:
//!
//! ```json
//! {
//!   "base_fields": {"vendor_name": "Legal name of the vendor"},
//!   "metrics": {"uptime": "Monthly service availability"}
//! }
//! ```
//!
//! Field names are unique across both maps.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file could not be read
    #[error("Failed to read manifest {path}: {source}")]
    FileRead {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Manifest is not valid JSON of the expected shape
    #[error("Invalid manifest: {0}")]
    Parse(String),

    /// A name appears more than once across both sets
    #[error("Duplicate field name: {0}")]
    DuplicateField(String),

    /// A field name is blank
    #[error("Field names must not be empty")]
    EmptyFieldName,

    /// Neither set declares any field
    #[error("Manifest declares no fields")]
    Empty,
}

/// Which section of the manifest a field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Contract metadata
    Base,
    /// SLA metric
    Metric,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Base => write!(f, "base"),
            FieldKind::Metric => write!(f, "metric"),
        }
    }
}

/// One declared field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Unique field name
    pub name: String,
    /// What the field means
    pub description: String,
    /// Section the field was declared in
    pub kind: FieldKind,
}

/// The immutable set of fields to extract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaManifest {
    base_fields: Vec<FieldSpec>,
    metrics: Vec<FieldSpec>,
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(default)]
    base_fields: Section,
    #[serde(default)]
    metrics: Section,
}

/// One manifest section as written, repeated keys included
#[derive(Default)]
struct Section(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for Section {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SectionVisitor;

        impl<'de> Visitor<'de> for SectionVisitor {
            type Value = Section;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of field name to description")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Section, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, Value>()? {
                    entries.push((name, value));
                }
                Ok(Section(entries))
            }
        }

        deserializer.deserialize_map(SectionVisitor)
    }
}

impl SchemaManifest {
    /// Build a manifest from `(name, description)` pairs, validating names
    pub fn new<B, M, S1, S2, S3, S4>(base_fields: B, metrics: M) -> Result<Self, ManifestError>
    where
        B: IntoIterator<Item = (S1, S2)>,
        M: IntoIterator<Item = (S3, S4)>,
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
        S4: Into<String>,
    {
        let base_fields = base_fields
            .into_iter()
            .map(|(n, d)| spec(n.into(), d.into(), FieldKind::Base))
            .collect();
        let metrics = metrics
            .into_iter()
            .map(|(n, d)| spec(n.into(), d.into(), FieldKind::Metric))
            .collect();
        let manifest = Self {
            base_fields,
            metrics,
        };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse a manifest from JSON text
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest =
            serde_json::from_str(text).map_err(|e| ManifestError::Parse(e.to_string()))?;
        Self::new(described(raw.base_fields)?, described(raw.metrics)?)
    }

    /// Load a manifest file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Serialize back to the manifest file format
    pub fn to_json(&self) -> String {
        let section = |fields: &[FieldSpec]| {
            fields
                .iter()
                .map(|f| (f.name.clone(), Value::String(f.description.clone())))
                .collect::<Map<String, Value>>()
        };
        let mut root = Map::new();
        root.insert("base_fields".to_string(), Value::Object(section(&self.base_fields)));
        root.insert("metrics".to_string(), Value::Object(section(&self.metrics)));
        // Map of strings always serializes
        serde_json::to_string_pretty(&Value::Object(root)).unwrap_or_default()
    }

    fn validate(&self) -> Result<(), ManifestError> {
        if self.base_fields.is_empty() && self.metrics.is_empty() {
            return Err(ManifestError::Empty);
        }
        let mut seen = HashSet::new();
        for field in self.fields() {
            if field.name.is_empty() {
                return Err(ManifestError::EmptyFieldName);
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ManifestError::DuplicateField(field.name.clone()));
            }
        }
        Ok(())
    }

    /// All fields in declaration order, base fields first
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.base_fields.iter().chain(self.metrics.iter())
    }

    /// Base fields in declaration order
    pub fn base_fields(&self) -> &[FieldSpec] {
        &self.base_fields
    }

    /// Metric fields in declaration order
    pub fn metrics(&self) -> &[FieldSpec] {
        &self.metrics
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields().find(|f| f.name == name)
    }

    /// Kind of a declared field
    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.get(name).map(|f| f.kind)
    }

    /// Total number of fields
    pub fn len(&self) -> usize {
        self.base_fields.len() + self.metrics.len()
    }

    /// Always false for a validated manifest
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn spec(name: String, description: String, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name: name.trim().to_string(),
        description: description.trim().to_string(),
        kind,
    }
}

fn described(section: Section) -> Result<Vec<(String, String)>, ManifestError> {
    section
        .0
        .into_iter()
        .map(|(name, value)| match value {
            Value::String(description) => Ok((name, description)),
            Value::Null => Ok((name, String::new())),
            other => Err(ManifestError::Parse(format!(
                "description of '{}' must be a string, got {}",
                name, other
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MANIFEST: &str = r#"{
        "base_fields": {
            "contract_name": "Title of the agreement",
            "vendor_name": "Legal name of the vendor",
            "effective_date": "Date the contract takes effect"
        },
        "metrics": {
            "uptime": "Monthly service availability",
            "incident_response_time": "Time to acknowledge a P1 incident"
        }
    }"#;

    #[test]
    fn test_parse_preserves_order() {
        let manifest = SchemaManifest::from_json(MANIFEST).unwrap();
        let names: Vec<_> = manifest.fields().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "contract_name",
                "vendor_name",
                "effective_date",
                "uptime",
                "incident_response_time"
            ]
        );
        assert_eq!(manifest.len(), 5);
        assert_eq!(manifest.kind_of("uptime"), Some(FieldKind::Metric));
        assert_eq!(manifest.kind_of("vendor_name"), Some(FieldKind::Base));
        assert_eq!(manifest.kind_of("missing"), None);
    }

    #[test]
    fn test_duplicate_across_sections_rejected() {
        let json = r#"{"base_fields": {"uptime": "a"}, "metrics": {"uptime": "b"}}"#;
        assert!(matches!(
            SchemaManifest::from_json(json),
            Err(ManifestError::DuplicateField(name)) if name == "uptime"
        ));
    }

    #[test]
    fn test_duplicate_within_section_rejected() {
        let json = r#"{"base_fields": {}, "metrics": {"uptime": "a", "uptime": "b"}}"#;
        assert!(matches!(
            SchemaManifest::from_json(json),
            Err(ManifestError::DuplicateField(name)) if name == "uptime"
        ));

        let json = r#"{"base_fields": {"vendor_name": "a", "vendor_name": "a"}}"#;
        assert!(matches!(
            SchemaManifest::from_json(json),
            Err(ManifestError::DuplicateField(name)) if name == "vendor_name"
        ));
    }

    #[test]
    fn test_blank_name_rejected() {
        let json = r#"{"base_fields": {"  ": "a"}, "metrics": {}}"#;
        assert!(matches!(
            SchemaManifest::from_json(json),
            Err(ManifestError::EmptyFieldName)
        ));
    }

    #[test]
    fn test_empty_and_malformed() {
        assert!(matches!(
            SchemaManifest::from_json("{}"),
            Err(ManifestError::Empty)
        ));
        assert!(matches!(
            SchemaManifest::from_json("not json"),
            Err(ManifestError::Parse(_))
        ));
        assert!(matches!(
            SchemaManifest::from_json(r#"{"metrics": {"uptime": 5}}"#),
            Err(ManifestError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MANIFEST.as_bytes()).unwrap();
        let manifest = SchemaManifest::from_file(file.path()).unwrap();
        assert_eq!(manifest.metrics().len(), 2);

        let missing = SchemaManifest::from_file("/nonexistent/msa_schema.json");
        assert!(matches!(missing, Err(ManifestError::FileRead { .. })));
    }

    #[test]
    fn test_to_json_round_trip() {
        let manifest = SchemaManifest::new(
            [("vendor_name", "Vendor")],
            [("uptime", "Availability")],
        )
        .unwrap();
        let reparsed = SchemaManifest::from_json(&manifest.to_json()).unwrap();
        assert_eq!(reparsed, manifest);
    }
}
