//! Validated parsing of formatter replies into field records
//!
//! Every reply is checked strictly. Anything that is not the expected JSON
//! shape, echoes the schema placeholders back, or carries an unknown
//! condition is rejected as malformed output.

use crate::error::ExtractorError;
use chrono::NaiveDate;
use covenant_domain::{BaseRecord, Condition, FieldKind, FieldRecord, MetricValue, TargetMetric};
use covenant_llm::parse_structured;
use serde_json::{Map, Value};

/// Data type recorded when a threshold is present but no unit was given
pub const UNSPECIFIED_UNIT: &str = "unspecified";

const NOT_FOUND_WORDS: &[&str] = &[
    "not found",
    "not_found",
    "n/a",
    "na",
    "none",
    "null",
    "unknown",
    "not specified",
    "not stated",
    "not available",
    "-",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%B %d %Y",
    "%d %B %Y",
    "%Y %B %d",
];

/// Parse a formatter reply for a field of `kind`
pub fn parse_record(
    reply: &str,
    field_name: &str,
    kind: FieldKind,
) -> Result<FieldRecord, ExtractorError> {
    let value: Value =
        parse_structured(reply).map_err(|e| ExtractorError::MalformedOutput(e.to_string()))?;
    let result = match kind {
        FieldKind::Base => parse_base(&value, field_name),
        FieldKind::Metric => parse_metric(&value),
    };
    result.map_err(ExtractorError::MalformedOutput)
}

/// Whether `text` means "no value"
pub fn is_not_found(text: &str) -> bool {
    let lowered = text.trim().trim_end_matches('.').to_lowercase();
    lowered.is_empty() || NOT_FOUND_WORDS.contains(&lowered.as_str())
}

/// Whether `text` is a schema placeholder such as `<unit of the value>`
fn is_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.len() > 2 && trimmed.starts_with('<') && trimmed.ends_with('>')
}

/// Descend into `{"<field>": {...}}` wrappers around the expected object
fn unwrap_object<'a>(value: &'a Value, required_key: &str) -> Result<&'a Map<String, Value>, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| format!("expected a JSON object, got {}", kind_of(value)))?;
    if obj.contains_key(required_key) {
        return Ok(obj);
    }
    if obj.len() == 1 {
        if let Some(inner) = obj.values().next().and_then(Value::as_object) {
            if inner.contains_key(required_key) {
                return Ok(inner);
            }
        }
    }
    Err(format!("missing '{}' key", required_key))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn parse_base(value: &Value, field_name: &str) -> Result<FieldRecord, String> {
    let obj = unwrap_object(value, "value")?;
    if let Some(name) = obj.get("name").and_then(Value::as_str) {
        if is_placeholder(name) {
            return Err("reply echoes the schema".to_string());
        }
    }

    let value = match &obj["value"] {
        Value::Null => None,
        Value::String(s) => text_value(s)?,
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let mut parts = Vec::new();
            for item in items {
                match item {
                    Value::String(s) => {
                        if let Some(s) = text_value(s)? {
                            parts.push(s);
                        }
                    }
                    Value::Number(n) => parts.push(n.to_string()),
                    other => return Err(format!("unexpected {} in value list", kind_of(other))),
                }
            }
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Object(_) => return Err("'value' must be a string or null".to_string()),
    };

    Ok(FieldRecord::Base(BaseRecord {
        name: field_name.to_string(),
        value,
    }))
}

fn text_value(raw: &str) -> Result<Option<String>, String> {
    if is_placeholder(raw) {
        return Err("reply echoes the schema".to_string());
    }
    if is_not_found(raw) {
        return Ok(None);
    }
    let trimmed = raw.trim();
    Ok(Some(normalize_date(trimmed).unwrap_or_else(|| trimmed.to_string())))
}

fn optional_text(obj: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            if is_placeholder(s) {
                Err("reply echoes the schema".to_string())
            } else if is_not_found(s) {
                Ok(None)
            } else {
                Ok(Some(s.trim().to_string()))
            }
        }
        Some(other) => Err(format!("'{}' must be a string or null, got {}", key, kind_of(other))),
    }
}

fn parse_metric(value: &Value) -> Result<FieldRecord, String> {
    let obj = unwrap_object(value, "metric_value")?;
    let metric_value = obj["metric_value"]
        .as_object()
        .ok_or_else(|| "'metric_value' must be an object".to_string())?;

    let min_value = parse_number(metric_value.get("min_value").unwrap_or(&Value::Null))
        .map_err(|e| format!("min_value: {}", e))?;
    let max_value = parse_number(metric_value.get("max_value").unwrap_or(&Value::Null))
        .map_err(|e| format!("max_value: {}", e))?;
    let data_type = optional_text(metric_value, "data_type")?;

    let condition = match obj.get("condition") {
        None | Some(Value::Null) => Condition::NotApplied,
        Some(Value::String(raw)) => {
            if is_placeholder(raw) {
                return Err("reply echoes the schema".to_string());
            }
            Condition::coerce(raw).ok_or_else(|| format!("unknown condition '{}'", raw))?
        }
        Some(other) => return Err(format!("'condition' must be a string, got {}", kind_of(other))),
    };
    let frequency = optional_text(obj, "frequency")?;
    let description = optional_text(obj, "description")?;

    if min_value.is_none() && max_value.is_none() {
        return Ok(FieldRecord::NotFound);
    }

    Ok(FieldRecord::Metric(TargetMetric {
        metric_value: MetricValue {
            min_value,
            max_value,
            data_type: data_type.unwrap_or_else(|| UNSPECIFIED_UNIT.to_string()),
        },
        condition,
        frequency,
        description,
    }))
}

/// Read a threshold from a JSON number or a string with one numeric literal
///
/// Units and qualifiers around the number are ignored and thousands
/// separators removed. "Not found" wording yields `None`.
///
/// ```
/// use covenant_extractor::parser::parse_number;
/// use serde_json::json;
///
/// assert_eq!(parse_number(&json!("99.9%")).unwrap(), Some(99.9));
/// assert_eq!(parse_number(&json!("1,000 ms")).unwrap(), Some(1000.0));
/// assert_eq!(parse_number(&json!("not found")).unwrap(), None);
/// assert!(parse_number(&json!("fast")).is_err());
/// ```
pub fn parse_number(value: &Value) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("unrepresentable number {}", n)),
        Value::String(s) => {
            if is_placeholder(s) {
                return Err("reply echoes the schema".to_string());
            }
            if is_not_found(s) {
                return Ok(None);
            }
            let literals = numeric_literals(s);
            match literals.as_slice() {
                [single] => Ok(Some(*single)),
                [] => Err(format!("no number in '{}'", s)),
                _ => Err(format!("more than one number in '{}'", s)),
            }
        }
        other => Err(format!("expected a number, got {}", kind_of(other))),
    }
}

/// Numeric literals that stand on their own (digits glued to letters, as in
/// `P1`, are skipped)
fn numeric_literals(text: &str) -> Vec<f64> {
    let chars: Vec<char> = text.chars().collect();
    // Drop thousands separators between digits
    let cleaned: Vec<char> = chars
        .iter()
        .enumerate()
        .filter(|(i, c)| {
            !(**c == ','
                && *i > 0
                && chars[i - 1].is_ascii_digit()
                && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()))
        })
        .map(|(_, c)| *c)
        .collect();

    let mut literals = Vec::new();
    let mut i = 0;
    while i < cleaned.len() {
        let c = cleaned[i];
        let prev = if i > 0 { Some(cleaned[i - 1]) } else { None };
        let starts_number = c.is_ascii_digit()
            || (matches!(c, '-' | '+' | '.')
                && cleaned.get(i + 1).is_some_and(|n| n.is_ascii_digit()));
        if !starts_number || prev.is_some_and(|p| p.is_alphanumeric() || p == '.') {
            i += 1;
            continue;
        }

        let start = i;
        i += 1;
        let mut seen_dot = c == '.';
        while i < cleaned.len() {
            let d = cleaned[i];
            if d.is_ascii_digit() {
                i += 1;
            } else if d == '.'
                && !seen_dot
                && cleaned.get(i + 1).is_some_and(|n| n.is_ascii_digit())
            {
                seen_dot = true;
                i += 1;
            } else {
                break;
            }
        }
        let literal: String = cleaned[start..i].iter().collect();
        if let Ok(number) = literal.parse::<f64>() {
            literals.push(number);
        }
        // Skip the rest of an alphanumeric run such as "24x7"
        while i < cleaned.len() && cleaned[i].is_alphanumeric() {
            i += 1;
        }
    }
    literals
}

/// Normalize a date in a common layout to `YYYY-MM-DD`
///
/// Returns `None` when `raw` is not a date on its own. Month-first is tried
/// before day-first for slash layouts.
///
/// ```
/// use covenant_extractor::parser::normalize_date;
///
/// assert_eq!(normalize_date("January 5th, 2024").as_deref(), Some("2024-01-05"));
/// assert_eq!(normalize_date("31/12/2024").as_deref(), Some("2024-12-31"));
/// assert_eq!(normalize_date("Net 30 days"), None);
/// ```
pub fn normalize_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    // Timestamps keep only their date part
    let candidate = match trimmed.get(..10) {
        Some(head) if trimmed.len() > 10 && matches!(trimmed.as_bytes()[10], b'T' | b' ') => {
            head
        }
        _ => trimmed,
    };

    let cleaned = candidate
        .replace(',', " ")
        .split_whitespace()
        .filter(|w| !w.eq_ignore_ascii_case("of") && !w.eq_ignore_ascii_case("the"))
        .map(strip_ordinal)
        .collect::<Vec<_>>()
        .join(" ");

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&cleaned, format).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
}

fn strip_ordinal(word: &str) -> &str {
    let lowered = word.to_ascii_lowercase();
    for suffix in ["st", "nd", "rd", "th"] {
        if lowered.ends_with(suffix) {
            let head = &word[..word.len() - 2];
            if !head.is_empty() && head.chars().all(|c| c.is_ascii_digit()) {
                return head;
            }
        }
    }
    word
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metric(reply: &str) -> Result<FieldRecord, ExtractorError> {
        parse_record(reply, "uptime", FieldKind::Metric)
    }

    #[test]
    fn test_parse_full_metric() {
        let reply = r#"{"metric_value": {"min_value": 99.9, "max_value": null, "data_type": "%"},
            "condition": ">=", "frequency": "monthly", "description": "system uptime"}"#;
        let record = metric(reply).unwrap();
        let target = record.as_metric().unwrap();
        assert_eq!(target.metric_value, MetricValue::at_least(99.9, "%"));
        assert_eq!(target.condition, Condition::GreaterOrEqual);
        assert_eq!(target.frequency.as_deref(), Some("monthly"));
        assert_eq!(target.description.as_deref(), Some("system uptime"));
    }

    #[test]
    fn test_metric_strings_are_coerced() {
        let reply = r#"```json
{"metric_value": {"min_value": "not found", "max_value": "4 hours", "data_type": "hours"},
 "condition": "no more than", "frequency": "Not found", "description": null}
```"#;
        let target = metric(reply).unwrap().as_metric().cloned().unwrap();
        assert_eq!(target.metric_value.min_value, None);
        assert_eq!(target.metric_value.max_value, Some(4.0));
        assert_eq!(target.condition, Condition::LessOrEqual);
        assert_eq!(target.frequency, None);
    }

    #[test]
    fn test_metric_without_thresholds_is_not_found() {
        let reply = r#"{"metric_value": {"min_value": null, "max_value": "n/a", "data_type": "%"},
            "condition": null, "frequency": null, "description": null}"#;
        assert_eq!(metric(reply).unwrap(), FieldRecord::NotFound);
    }

    #[test]
    fn test_missing_unit_is_recorded_as_unspecified() {
        let reply = r#"{"metric_value": {"min_value": null, "max_value": 3, "data_type": null},
            "condition": "<="}"#;
        let target = metric(reply).unwrap().as_metric().cloned().unwrap();
        assert_eq!(target.metric_value.data_type, UNSPECIFIED_UNIT);
    }

    #[test]
    fn test_wrapped_metric_object_is_accepted() {
        let reply = r#"{"uptime": {"metric_value": {"min_value": 99.5, "max_value": null, "data_type": "%"}, "condition": ">="}}"#;
        assert!(metric(reply).unwrap().is_found());
    }

    #[test]
    fn test_reply_with_prose_and_broken_json() {
        let reply = r#"Here is the record: {"name": "vendor_name", "value": "Acme Hosting Ltd"} as requested."#;
        assert!(parse_record(reply, "vendor_name", FieldKind::Base).unwrap().is_found());

        let broken = "```json\n{\"name\": \"vendor_name\", \"value\": \n```";
        assert!(matches!(
            parse_record(broken, "vendor_name", FieldKind::Base),
            Err(ExtractorError::MalformedOutput(msg)) if msg.contains("structured response")
        ));
    }

    #[test]
    fn test_malformed_metric_replies() {
        let cases = [
            "The uptime is 99.9%",
            "[]",
            r#"{"value": "99.9"}"#,
            r#"{"metric_value": 99.9}"#,
            r#"{"metric_value": {"min_value": "fast", "data_type": "%"}}"#,
            r#"{"metric_value": {"min_value": 1, "data_type": "%"}, "condition": "sometimes"}"#,
            r#"{"metric_value": {"min_value": 1, "data_type": "<unit of the value>"}}"#,
            r#"{"metric_value": {"min_value": 1, "data_type": "%"}, "frequency": 12}"#,
        ];
        for case in cases {
            assert!(
                matches!(metric(case), Err(ExtractorError::MalformedOutput(_))),
                "accepted: {}",
                case
            );
        }
    }

    #[test]
    fn test_parse_base_record() {
        let record = parse_record(
            r#"{"name": "vendor_name", "value": "Acme Hosting Ltd"}"#,
            "vendor_name",
            FieldKind::Base,
        )
        .unwrap();
        assert_eq!(
            record,
            FieldRecord::Base(BaseRecord {
                name: "vendor_name".to_string(),
                value: Some("Acme Hosting Ltd".to_string()),
            })
        );
    }

    #[test]
    fn test_base_record_null_and_dates() {
        let record = parse_record(r#"{"value": "Not Found"}"#, "term", FieldKind::Base).unwrap();
        assert_eq!(
            record,
            FieldRecord::Base(BaseRecord {
                name: "term".to_string(),
                value: None,
            })
        );

        let record = parse_record(
            r#"{"name": "effective_date", "value": "March 1, 2024"}"#,
            "effective_date",
            FieldKind::Base,
        )
        .unwrap();
        match record {
            FieldRecord::Base(base) => assert_eq!(base.value.as_deref(), Some("2024-03-01")),
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_base_record_rejects_echoed_schema() {
        let reply = r#"{"name": "<field name>", "value": "<value as a string, or null>"}"#;
        assert!(parse_record(reply, "vendor_name", FieldKind::Base).is_err());
        assert!(parse_record(r#"{"name": "vendor_name"}"#, "vendor_name", FieldKind::Base).is_err());
    }

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number(&json!(5)).unwrap(), Some(5.0));
        assert_eq!(parse_number(&json!(null)).unwrap(), None);
        assert_eq!(parse_number(&json!("  ")).unwrap(), None);
        assert_eq!(parse_number(&json!("at least 99.95 percent")).unwrap(), Some(99.95));
        assert_eq!(parse_number(&json!("-2.5")).unwrap(), Some(-2.5));
        assert_eq!(parse_number(&json!("P1 within 30 minutes")).unwrap(), Some(30.0));
        assert_eq!(parse_number(&json!("1,250,000 requests")).unwrap(), Some(1_250_000.0));
        assert!(parse_number(&json!("between 2 and 4")).is_err());
        assert!(parse_number(&json!(true)).is_err());
    }

    #[test]
    fn test_normalize_date_layouts() {
        assert_eq!(normalize_date("2024-01-15").as_deref(), Some("2024-01-15"));
        assert_eq!(normalize_date("2024-01-15T00:00:00Z").as_deref(), Some("2024-01-15"));
        assert_eq!(normalize_date("01/15/2024").as_deref(), Some("2024-01-15"));
        assert_eq!(normalize_date("15.01.2024").as_deref(), Some("2024-01-15"));
        assert_eq!(normalize_date("15 January 2024").as_deref(), Some("2024-01-15"));
        assert_eq!(normalize_date("the 1st of March, 2024").as_deref(), Some("2024-03-01"));
        assert_eq!(normalize_date("Jan 2 2025").as_deref(), Some("2025-01-02"));
        assert_eq!(normalize_date("Acme Hosting"), None);
        assert_eq!(normalize_date("12 months"), None);
    }
}
