//! Covenant Domain Layer
//!
//! This crate contains the data model for SLA contract extraction and
//! compliance checking, and the trait interfaces every other layer depends
//! upon. It performs no I/O of its own apart from reading the schema manifest.
//!
//! ## Key Concepts
//!
//! - **Schema manifest**: the fixed universe of base (metadata) fields and SLA
//!   metric fields to extract from a contract
//! - **Target metric**: the contractual threshold, condition and frequency for a KPI
//! - **Actual metric**: an observed KPI reading for one reporting period
//! - **Comparison result**: whether an actual reading complies with its target
//! - **Chunk**: an embedded passage of a contract stored in a vector collection
//!
//! ## Architecture
//!
//! - Pure data types and validation logic
//! - Trait definitions for the LLM, embedding and vector-store seams
//! - Infrastructure implementations live in `covenant-llm` and `covenant-store`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod comparison;
pub mod condition;
pub mod conversation;
pub mod manifest;
pub mod metric;
pub mod record;
pub mod traits;

// Re-exports for convenience
pub use chunk::{collection_name_for, new_document_id, Chunk, SearchHit};
pub use comparison::{ComparisonResult, Remark};
pub use condition::{approx_eq, fmt_num, Condition, ALL_CONDITIONS};
pub use conversation::{
    CompletionReply, CompletionRequest, Message, OutputFormat, Role, ToolCall, ToolSpec,
};
pub use manifest::{FieldKind, FieldSpec, ManifestError, SchemaManifest};
pub use metric::{ActualMetric, MetricValue, TargetMetric};
pub use record::{BaseRecord, ExtractedDocument, FieldRecord};
