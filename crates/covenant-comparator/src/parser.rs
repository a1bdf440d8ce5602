//! Validated parsing of format-stage replies

use covenant_domain::{ComparisonResult, Remark};
use covenant_llm::parse_structured;
use serde_json::Value;

fn is_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.len() > 2 && trimmed.starts_with('<') && trimmed.ends_with('>')
}

/// Parse a format-stage reply into a [`ComparisonResult`]
///
/// `is_compliant` must be a boolean (the strings `"true"`/`"false"` are
/// accepted), `remark` must coerce to a known remark, and `reason` must be a
/// string or null.
pub fn parse_result(reply: &str) -> Result<ComparisonResult, String> {
    let value: Value = parse_structured(reply).map_err(|e| e.to_string())?;
    let obj = value
        .as_object()
        .ok_or_else(|| "expected a JSON object".to_string())?;

    let is_compliant = match obj.get("is_compliant") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("true") => true,
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("false") => false,
        Some(other) => return Err(format!("'is_compliant' must be a boolean, got {}", other)),
        None => return Err("missing 'is_compliant'".to_string()),
    };

    let remark = match obj.get("remark") {
        Some(Value::String(raw)) => {
            Remark::coerce(raw).ok_or_else(|| format!("unknown remark '{}'", raw))?
        }
        Some(other) => return Err(format!("'remark' must be a string, got {}", other)),
        None => return Err("missing 'remark'".to_string()),
    };

    let reason = match obj.get("reason") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if is_placeholder(s) => {
            return Err("reply echoes the schema".to_string())
        }
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(other) => return Err(format!("'reason' must be a string or null, got {}", other)),
    };

    Ok(ComparisonResult {
        is_compliant,
        remark,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_result() {
        let result = parse_result(
            r#"{"is_compliant": false, "remark": "decreasing", "reason": "99.85% is below 99.9%"}"#,
        )
        .unwrap();
        assert!(!result.is_compliant);
        assert_eq!(result.remark, Remark::Decreasing);
        assert_eq!(result.reason.as_deref(), Some("99.85% is below 99.9%"));
    }

    #[test]
    fn test_legacy_vocabulary_and_string_booleans() {
        let result = parse_result("```json\n{\"is_compliant\": \"True\", \"remark\": \"up\"}\n```").unwrap();
        assert!(result.is_compliant);
        assert_eq!(result.remark, Remark::Increasing);
        assert_eq!(result.reason, None);
    }

    #[test]
    fn test_result_inside_prose() {
        let result = parse_result(
            r#"Verdict: {"is_compliant": true, "remark": "constant", "reason": null} Done."#,
        )
        .unwrap();
        assert!(result.is_compliant);
        assert_eq!(result.remark, Remark::Constant);

        let err = parse_result(r#"{"is_compliant": true,"#).unwrap_err();
        assert!(err.contains("structured response"), "{}", err);
    }

    #[test]
    fn test_malformed_results() {
        let cases = [
            "The condition is met.",
            r#"{"is_compliant": "yes", "remark": "up"}"#,
            r#"{"is_compliant": true}"#,
            r#"{"is_compliant": true, "remark": "sideways"}"#,
            r#"{"is_compliant": true, "remark": "up", "reason": 3}"#,
            r#"{"is_compliant": false, "remark": "down", "reason": "<why the condition failed, or null when it passed>"}"#,
            "[true, \"up\"]",
        ];
        for case in cases {
            assert!(parse_result(case).is_err(), "accepted: {}", case);
        }
    }
}
