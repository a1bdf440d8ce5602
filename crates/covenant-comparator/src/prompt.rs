//! Prompts for the compare and format stages

use covenant_domain::{fmt_num, ActualMetric, Condition, Message, MetricValue};

const COMPARE_INSTRUCTIONS: &str = r#"You are an analytical expert comparing a vendor's measured SLA performance with its contractual target.

Steps:
1. Read the actual value, the target thresholds, their units and the condition.
2. Evaluate the condition between the actual value and the target and state whether it is satisfied (true or false).
3. Assign a remark describing the actual value relative to the target:
   - "constant" if the actual value equals the target
   - "increasing" if the actual value is above the target
   - "decreasing" if the actual value is below the target
4. If the condition is not satisfied, explain why, quoting both the actual and the target values.

Warning:
Evaluate the condition literally. For example, if the actual value is 3.5, the target value is 5 and the condition is <=, evaluate 3.5 <= 5, which is true.
Do not reinterpret the condition in terms of what is good or bad for the customer. Just evaluate it."#;

const FORMAT_INSTRUCTIONS: &str = r#"You are a formatter that turns a written comparison of a contract metric into a JSON object.

Respond with exactly one JSON object and nothing else:
{"is_compliant": <true or false>, "remark": "<constant, increasing or decreasing>", "reason": "<why the condition failed, or null when it passed>"}

Rules:
- is_compliant is a JSON boolean
- remark is one of "constant", "increasing", "decreasing"
- reason mentions the actual and target values when the condition failed"#;

fn render_bound(value: Option<f64>) -> String {
    value.map(fmt_num).unwrap_or_else(|| "not set".to_string())
}

/// Render a target's thresholds and unit
pub fn render_target(target: &MetricValue) -> String {
    format!(
        "min_value: {}, max_value: {}, data_type: {}",
        render_bound(target.min_value),
        render_bound(target.max_value),
        target.data_type
    )
}

/// Builds the compare-stage conversation
pub struct ComparePromptBuilder<'a> {
    actual: &'a ActualMetric,
    target: &'a MetricValue,
    condition: Condition,
}

impl<'a> ComparePromptBuilder<'a> {
    /// Create a builder for one reading and its target
    pub fn new(actual: &'a ActualMetric, target: &'a MetricValue, condition: Condition) -> Self {
        Self {
            actual,
            target,
            condition,
        }
    }

    /// User turn with both values, the condition and the literal statement
    pub fn user_prompt(&self) -> String {
        let mut prompt = String::new();
        prompt.push_str(&format!(
            "Actual value: {} {}\n",
            fmt_num(self.actual.value),
            self.actual.data_type
        ));
        prompt.push_str(&format!("Target: {}\n", render_target(self.target)));
        match self.condition {
            Condition::NotApplied => {
                prompt.push_str("Condition: none stated; compare the actual value with the target directly\n")
            }
            condition => prompt.push_str(&format!(
                "Condition: {} ({})\n",
                condition.label(),
                condition.describe()
            )),
        }
        if let Some(statement) = self.condition.statement(self.actual.value, self.target) {
            prompt.push_str(&format!("Evaluate: {}\n", statement));
        }
        prompt.push_str(
            "\nDetermine whether the condition is satisfied, give the remark, and explain any failure.",
        );
        prompt
    }

    /// Compare-stage messages
    pub fn build(&self) -> Vec<Message> {
        vec![
            Message::system(COMPARE_INSTRUCTIONS),
            Message::user(self.user_prompt()),
        ]
    }
}

/// Format-stage messages for a written comparison
pub fn format_messages(raw_text: &str) -> Vec<Message> {
    vec![
        Message::system(FORMAT_INSTRUCTIONS),
        Message::user(format!(
            "Format this comparison as JSON:\n\n{}",
            raw_text.trim()
        )),
    ]
}
