//! Covenant Metric Comparator
//!
//! Compares a vendor's measured KPI readings with the SLA targets extracted
//! from its contract. Each metric runs a two-stage workflow:
//!
//! ```text
//! Start → Compare (prose evaluation) → Format (JSON verdict) → Done
//! ```
//!
//! The verdict carries `is_compliant`, a `remark` (`constant`, `increasing`
//! or `decreasing`) and a reason when the target is missed. With
//! `enforce_literal_evaluation` on, the condition is also evaluated locally
//! and the local answer wins on disagreement.
//!
//! # Examples
//!
//! ```no_run
//! use covenant_comparator::{ComparatorConfig, MetricComparator};
//! use covenant_domain::{ActualMetric, Condition, MetricValue, TargetMetric};
//! use covenant_llm::MockProvider;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let comparator = MetricComparator::new(
//!     Arc::new(MockProvider::default()),
//!     ComparatorConfig::default(),
//! )?;
//! let target = TargetMetric::new(MetricValue::at_least(99.9, "%"), Condition::GreaterOrEqual);
//! let result = comparator
//!     .evaluate(&ActualMetric::new(99.85, "%"), &target)
//!     .await?;
//! println!("compliant: {}", result.is_compliant);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod comparator;
mod config;
mod error;
pub mod parser;
pub mod prompt;
mod report;
mod workflow;

pub use comparator::MetricComparator;
pub use config::ComparatorConfig;
pub use error::ComparatorError;
pub use report::{
    pair_metrics, parse_actuals, Actuals, ComparisonInput, ComparisonOutcome, ComplianceRecord,
    ComplianceReport,
};
pub use workflow::Stage;
