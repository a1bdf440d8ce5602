//! Schema formatting of field summaries

use crate::error::ExtractorError;
use crate::parser::parse_record;
use crate::prompt::{correction_prompt, FormatPromptBuilder};
use crate::types::{FieldSummary, FormattedRecord};
use covenant_domain::traits::LlmProvider;
use covenant_domain::{CompletionRequest, Message};
use std::sync::Arc;
use tracing::{debug, warn};

/// Attempts per summary: the first call plus one retry on malformed output
pub const MAX_FORMAT_ATTEMPTS: usize = 2;

/// Forces a free-text summary into the field's schema
pub struct SchemaFormatter<L> {
    llm: Arc<L>,
    temperature: f32,
}

impl<L: LlmProvider> SchemaFormatter<L> {
    /// Create a new formatter
    pub fn new(llm: Arc<L>, temperature: f32) -> Self {
        Self { llm, temperature }
    }

    /// Format `summary` into a validated record
    ///
    /// A reply that fails validation is answered with a correction request
    /// once. Provider errors are returned immediately.
    pub async fn format(&self, summary: &FieldSummary) -> Result<FormattedRecord, ExtractorError> {
        let mut messages = FormatPromptBuilder::new(summary).build();
        let mut last_error = String::new();

        for attempt in 1..=MAX_FORMAT_ATTEMPTS {
            let request = CompletionRequest::new(messages.clone())
                .json()
                .with_temperature(self.temperature);
            let reply = self.llm.complete(request).await.map_err(ExtractorError::llm)?;
            let text = reply.content.unwrap_or_default();
            debug!(
                "Formatter reply for '{}' (attempt {}): {} chars",
                summary.field_name,
                attempt,
                text.len()
            );

            match parse_record(&text, &summary.field_name, summary.kind) {
                Ok(record) => {
                    return Ok(FormattedRecord {
                        field_name: summary.field_name.clone(),
                        record,
                    })
                }
                Err(e) => {
                    warn!(
                        "Malformed output for field '{}' (attempt {}/{}): {}",
                        summary.field_name, attempt, MAX_FORMAT_ATTEMPTS, e
                    );
                    last_error = e.to_string();
                    messages.push(Message::assistant(text, Vec::new()));
                    messages.push(Message::user(correction_prompt(&last_error)));
                }
            }
        }

        Err(ExtractorError::MalformedOutput(format!(
            "field '{}' after {} attempts: {}",
            summary.field_name, MAX_FORMAT_ATTEMPTS, last_error
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_domain::{Condition, FieldKind, FieldRecord};
    use covenant_llm::MockProvider;

    fn summary(kind: FieldKind) -> FieldSummary {
        FieldSummary {
            field_name: "uptime".to_string(),
            kind,
            summary_text: "Minimum value: 99.9, unit %, condition at least, monthly".to_string(),
            passages_used: 2,
        }
    }

    const UPTIME_JSON: &str = r#"{"metric_value": {"min_value": 99.9, "max_value": null, "data_type": "%"},
        "condition": ">=", "frequency": "monthly", "description": "system uptime"}"#;

    #[tokio::test]
    async fn test_format_metric_first_try() {
        let llm = Arc::new(MockProvider::new(UPTIME_JSON));
        let formatter = SchemaFormatter::new(Arc::clone(&llm), 0.0);
        let formatted = formatter.format(&summary(FieldKind::Metric)).await.unwrap();

        assert_eq!(formatted.field_name, "uptime");
        let target = formatted.record.as_metric().unwrap();
        assert_eq!(target.condition, Condition::GreaterOrEqual);
        assert_eq!(llm.call_count(), 1);
        assert_eq!(llm.requests()[0].output, covenant_domain::OutputFormat::Json);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_retried_once() {
        let llm = Arc::new(MockProvider::default());
        llm.push_text("Sure! The uptime target is 99.9%.");
        llm.push_text(UPTIME_JSON);
        let formatter = SchemaFormatter::new(Arc::clone(&llm), 0.0);

        let formatted = formatter.format(&summary(FieldKind::Metric)).await.unwrap();
        assert!(formatted.record.is_found());
        assert_eq!(llm.call_count(), 2);

        // The retry carries the rejected reply and a correction
        let retry = &llm.requests()[1];
        assert_eq!(retry.messages.len(), 4);
        assert!(retry.messages[3].content.contains("could not be used"));
    }

    #[tokio::test]
    async fn test_second_malformed_reply_fails() {
        let llm = Arc::new(MockProvider::new(r#"{"metric_value": "<unit>"}"#));
        let formatter = SchemaFormatter::new(Arc::clone(&llm), 0.0);

        let result = formatter.format(&summary(FieldKind::Metric)).await;
        assert!(matches!(result, Err(ExtractorError::MalformedOutput(_))));
        assert_eq!(llm.call_count(), MAX_FORMAT_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_provider_error_is_not_retried() {
        let llm = Arc::new(MockProvider::default());
        llm.push_error("connection reset");
        let formatter = SchemaFormatter::new(Arc::clone(&llm), 0.0);

        let result = formatter.format(&summary(FieldKind::Metric)).await;
        assert!(matches!(result, Err(ExtractorError::Llm(_))));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_reformatting_keeps_key_set() {
        let llm = Arc::new(MockProvider::default());
        llm.push_text(r#"{"name": "vendor_name", "value": "Acme Hosting"}"#);
        llm.push_text(r#"{"value": null}"#);
        let formatter = SchemaFormatter::new(Arc::clone(&llm), 0.0);
        let summary = FieldSummary {
            field_name: "vendor_name".to_string(),
            kind: FieldKind::Base,
            summary_text: "The vendor is Acme Hosting".to_string(),
            passages_used: 1,
        };

        let keys = |record: &FieldRecord| {
            let value = serde_json::to_value(record).unwrap();
            value.as_object().unwrap().keys().cloned().collect::<Vec<_>>()
        };
        let first = formatter.format(&summary).await.unwrap();
        let second = formatter.format(&summary).await.unwrap();
        assert_eq!(keys(&first.record), keys(&second.record));
        assert_eq!(keys(&first.record), vec!["name", "value"]);
    }
}
