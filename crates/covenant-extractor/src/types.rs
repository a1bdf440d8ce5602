//! Stage and result types for preprocessing and extraction

use chrono::{DateTime, Utc};
use covenant_domain::{ExtractedDocument, FieldKind, FieldRecord};
use serde::{Deserialize, Serialize};

/// Free-text findings for one field, produced by the summarizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    /// Field the summary is about
    pub field_name: String,

    /// Manifest section of the field
    pub kind: FieldKind,

    /// The model's final answer
    pub summary_text: String,

    /// Distinct passages shown to the model, seeded and tool-retrieved
    pub passages_used: usize,
}

/// A summary forced into the field's schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedRecord {
    /// Field the record belongs to
    pub field_name: String,

    /// Validated record; `NotFound` when the summary held no value
    pub record: FieldRecord,
}

/// A field that was dropped from the document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFailure {
    /// Field name
    pub field_name: String,

    /// Manifest section of the field
    pub kind: FieldKind,

    /// Why the field failed
    pub reason: String,
}

/// Metadata about an extraction run
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionMetadata {
    /// Document the fields were extracted from
    pub document_id: String,

    /// Collection that was searched
    pub collection: String,

    /// Name of the LLM model used
    pub model_name: String,

    /// Number of manifest fields processed
    pub fields_attempted: usize,

    /// When extraction started
    pub started_at: DateTime<Utc>,

    /// Wall-clock time for the run (milliseconds)
    pub processing_time_ms: u64,
}

/// Result of extracting every manifest field from a document
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutcome {
    /// Successfully formatted fields, in manifest order
    pub document: ExtractedDocument,

    /// Fields omitted from the document
    pub failures: Vec<FieldFailure>,

    /// Run metadata
    pub metadata: ExtractionMetadata,
}

impl ExtractionOutcome {
    /// Whether every field made it into the document
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Summary of a preprocessed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessReport {
    /// Identifier every chunk was tagged with
    pub document_id: String,

    /// Collection the chunks were inserted into
    pub collection_name: String,

    /// Number of chunks stored
    pub chunk_count: usize,

    /// Characters of extracted text
    pub char_count: usize,
}
