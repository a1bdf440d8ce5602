//! Prompts for field summarization and schema formatting

use crate::types::FieldSummary;
use covenant_domain::{
    Condition, FieldKind, FieldSpec, Message, SearchHit, ToolSpec, ALL_CONDITIONS,
};
use serde_json::json;

/// Name of the retrieval tool offered to the summarizer
pub const RETRIEVE_TOOL: &str = "retrieve";

/// Sent when the tool budget is spent and the model must answer
pub const BUDGET_EXHAUSTED_NOTICE: &str = "You have used all available searches. \
Answer now using only the excerpts above, marking anything you could not find as \"not found\".";

const METRIC_SUMMARY_INSTRUCTIONS: &str = r#"You are a contract metric summarizer. You read excerpts of a vendor contract and report everything it commits to about one service-level metric.

Report, for the metric:
- Minimum value: the lowest acceptable number, if the contract states one
- Maximum value: the highest acceptable number, if the contract states one
- Data type: the unit of the value (for example %, ms, minutes, hours, count)
- Condition: how the measured value is judged against the threshold (for example "at least", "no more than", "within the range")
- Frequency: how often the metric is measured or reported
- Description: what the metric measures, in a few words

Rules:
- Quote numbers exactly as the contract states them; never estimate
- If any of these details is not in the contract, write "not found" for it
- If the excerpts are not enough, call the retrieve tool with a focused search query"#;

const BASE_SUMMARY_INSTRUCTIONS: &str = r#"You are a contract analyst. You read excerpts of a vendor contract and report the value of one contract field.

Rules:
- Report the value exactly as the contract states it
- For dates, give the full date as written in the contract
- If the field is not in the contract, answer "not found"
- If the excerpts are not enough, call the retrieve tool with a focused search query"#;

const FORMAT_INSTRUCTIONS: &str = r#"You are a data extraction engine. Convert the summary you are given into a single JSON object that matches the schema below.

Rules:
- Respond with the JSON object only, no prose and no code fences
- Use exactly the keys shown in the schema
- If a value is not present in the summary, or the summary says "not found", use null
- Numbers must be JSON numbers without units
- Dates must use the YYYY-MM-DD layout"#;

const BASE_SCHEMA: &str = r#"{"name": "<field name>", "value": "<value as a string, or null>"}"#;

const METRIC_SCHEMA: &str = r#"{
  "metric_value": {
    "min_value": <number or null>,
    "max_value": <number or null>,
    "data_type": "<unit of the value>"
  },
  "condition": "<condition label or null>",
  "frequency": "<measurement frequency or null>",
  "description": "<short description or null>"
}"#;

/// Search query used to seed retrieval for a field
pub fn retrieval_query(field: &FieldSpec) -> String {
    match field.kind {
        FieldKind::Base => {
            if field.description.trim().is_empty() {
                format!("What is the {} of this contract?", field.name)
            } else {
                format!("What is the {} of this contract? {}", field.name, field.description)
            }
        }
        FieldKind::Metric => format!(
            "What does the contract commit to for the {} metric ({})? Include minimum and \
             maximum thresholds, unit, condition, measurement frequency and description.",
            field.name, field.description
        ),
    }
}

/// Tool definition for follow-up retrieval
pub fn retrieve_tool() -> ToolSpec {
    ToolSpec {
        name: RETRIEVE_TOOL.to_string(),
        description: "Search the contract for passages relevant to a query".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search the contract for"
                }
            },
            "required": ["query"]
        }),
    }
}

/// Render passages as a numbered excerpt list
pub fn format_passages(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No relevant passages found.".to_string();
    }
    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!("[{}] {}\n", i + 1, hit.content.trim()));
    }
    out
}

/// Builds the opening conversation for summarizing one field
pub struct SummaryPromptBuilder<'a> {
    field: &'a FieldSpec,
    passages: &'a [SearchHit],
}

impl<'a> SummaryPromptBuilder<'a> {
    /// Create a builder for `field` seeded with `passages`
    pub fn new(field: &'a FieldSpec, passages: &'a [SearchHit]) -> Self {
        Self { field, passages }
    }

    /// System instructions for the field's kind
    pub fn system_prompt(&self) -> String {
        let mut prompt = String::new();
        match self.field.kind {
            FieldKind::Metric => prompt.push_str(METRIC_SUMMARY_INSTRUCTIONS),
            FieldKind::Base => prompt.push_str(BASE_SUMMARY_INSTRUCTIONS),
        }
        prompt.push_str("\n\n");
        prompt.push_str(&format!("Field: {}\n", self.field.name));
        if !self.field.description.trim().is_empty() {
            prompt.push_str(&format!("Meaning: {}\n", self.field.description.trim()));
        }
        prompt
    }

    /// User turn carrying the seeded excerpts
    pub fn user_prompt(&self) -> String {
        let mut prompt = String::new();
        prompt.push_str("Contract excerpts:\n---\n");
        prompt.push_str(&format_passages(self.passages));
        prompt.push_str("---\n\n");
        prompt.push_str(&format!(
            "Extract all details related to the field \"{}\" and give a summary with the details listed in your instructions.",
            self.field.name
        ));
        prompt
    }

    /// Opening messages
    pub fn build(&self) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt()),
            Message::user(self.user_prompt()),
        ]
    }
}

fn condition_vocabulary() -> String {
    ALL_CONDITIONS
        .iter()
        .filter(|c| **c != Condition::NotApplied)
        .map(|c| format!("- \"{}\": {}", c.label(), c.describe()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the formatting conversation for a summary
pub struct FormatPromptBuilder<'a> {
    summary: &'a FieldSummary,
}

impl<'a> FormatPromptBuilder<'a> {
    /// Create a builder for `summary`
    pub fn new(summary: &'a FieldSummary) -> Self {
        Self { summary }
    }

    /// System instructions with the target schema
    pub fn system_prompt(&self) -> String {
        let mut prompt = String::new();
        prompt.push_str(FORMAT_INSTRUCTIONS);
        prompt.push_str("\n\nSchema:\n");
        match self.summary.kind {
            FieldKind::Base => prompt.push_str(BASE_SCHEMA),
            FieldKind::Metric => {
                prompt.push_str(METRIC_SCHEMA);
                prompt.push_str("\n\nAllowed condition labels:\n");
                prompt.push_str(&condition_vocabulary());
                prompt.push_str("\nUse null when the summary gives no condition.");
            }
        }
        prompt
    }

    /// User turn carrying the summary
    pub fn user_prompt(&self) -> String {
        format!(
            "Format the following summary of \"{}\" as JSON.\n\nSummary:\n{}",
            self.summary.field_name,
            self.summary.summary_text.trim()
        )
    }

    /// Formatting messages
    pub fn build(&self) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt()),
            Message::user(self.user_prompt()),
        ]
    }
}

/// Follow-up asking the model to fix an invalid reply
pub fn correction_prompt(reason: &str) -> String {
    format!(
        "That reply could not be used: {}. Reply again with only the JSON object, filled in \
         with values from the summary.",
        reason
    )
}
