//! Structured output helpers
//!
//! Models wrap JSON in markdown fences or surround it with prose even in JSON
//! mode. These helpers recover the object and deserialize it.

use crate::LlmError;
use serde::de::DeserializeOwned;

/// Extract the JSON payload from a model reply
///
/// Handles fenced blocks (```` ```json ````) and falls back to the outermost
/// `{ ... }` or `[ ... ]` span when the reply contains surrounding prose.
///
/// ```
/// use covenant_llm::extract_json;
///
/// let reply = "Here you go:\n```json\n{\"a\": 1}\n```";
/// assert_eq!(extract_json(reply).unwrap(), "{\"a\": 1}");
/// ```
pub fn extract_json(response: &str) -> Result<&str, LlmError> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(LlmError::InvalidResponse("Empty response".to_string()));
    }

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        // Skip the info string (e.g. `json`) up to the end of the line
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(after_fence.len());
        let body = &after_fence[body_start..];
        let body = match body.find("```") {
            Some(end) => &body[..end],
            None => body,
        };
        let body = body.trim();
        if body.is_empty() {
            return Err(LlmError::InvalidResponse("Empty code block".to_string()));
        }
        return Ok(body);
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(trimmed);
    }

    let open = trimmed.find(['{', '[']);
    let close = trimmed.rfind(['}', ']']);
    match (open, close) {
        (Some(open), Some(close)) if close > open => Ok(&trimmed[open..=close]),
        _ => Err(LlmError::InvalidResponse(
            "No JSON object found in response".to_string(),
        )),
    }
}

/// Extract and deserialize a JSON reply
pub fn parse_structured<T: DeserializeOwned>(response: &str) -> Result<T, LlmError> {
    let json = extract_json(response)?;
    serde_json::from_str(json).map_err(|e| {
        LlmError::InvalidResponse(format!("Failed to parse structured response: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Verdict {
        is_compliant: bool,
    }

    #[test]
    fn test_raw_json() {
        assert_eq!(extract_json("  {\"x\": 1} ").unwrap(), "{\"x\": 1}");
    }

    #[test]
    fn test_fenced_json() {
        let reply = "```json\n{\"is_compliant\": true}\n```";
        let verdict: Verdict = parse_structured(reply).unwrap();
        assert!(verdict.is_compliant);
    }

    #[test]
    fn test_fence_without_language() {
        let reply = "```\n[1, 2]\n```";
        assert_eq!(extract_json(reply).unwrap(), "[1, 2]");
    }

    #[test]
    fn test_surrounding_prose() {
        let reply = "Sure! The answer is {\"is_compliant\": false}. Hope that helps.";
        let verdict: Verdict = parse_structured(reply).unwrap();
        assert!(!verdict.is_compliant);
    }

    #[test]
    fn test_failures() {
        assert!(extract_json("   ").is_err());
        assert!(extract_json("```json\n```").is_err());
        assert!(extract_json("no json here").is_err());
        assert!(parse_structured::<Verdict>("{\"other\": 1}").is_err());
    }
}
