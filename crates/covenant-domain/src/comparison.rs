//! Comparison outcome types

use crate::condition::approx_eq;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of an actual reading relative to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Remark {
    /// Reading equals the target
    Constant,
    /// Reading is above the target
    Increasing,
    /// Reading is below the target
    Decreasing,
}

impl Remark {
    /// Wire label
    pub fn label(&self) -> &'static str {
        match self {
            Remark::Constant => "constant",
            Remark::Increasing => "increasing",
            Remark::Decreasing => "decreasing",
        }
    }

    /// Coerce model wording, including the legacy `up`/`down`/`same` vocabulary
    pub fn coerce(raw: &str) -> Option<Remark> {
        match raw.trim().to_lowercase().as_str() {
            "constant" | "same" | "equal" | "unchanged" | "stable" | "flat" => {
                Some(Remark::Constant)
            }
            "increasing" | "increase" | "increased" | "up" | "higher" | "above" => {
                Some(Remark::Increasing)
            }
            "decreasing" | "decrease" | "decreased" | "down" | "lower" | "below" => {
                Some(Remark::Decreasing)
            }
            _ => None,
        }
    }

    /// Remark for `actual` relative to `reference`
    pub fn between(actual: f64, reference: f64) -> Remark {
        if approx_eq(actual, reference) {
            Remark::Constant
        } else if actual > reference {
            Remark::Increasing
        } else {
            Remark::Decreasing
        }
    }
}

impl fmt::Display for Remark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl<'de> Deserialize<'de> for Remark {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Remark::coerce(&raw).ok_or_else(|| de::Error::custom(format!("unknown remark '{}'", raw)))
    }
}

/// Verdict for one metric in one reporting period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Whether the actual reading satisfies the target under its condition
    pub is_compliant: bool,
    /// Direction of the reading relative to the target
    pub remark: Remark,
    /// Explanation, present at least when non-compliant
    #[serde(default)]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remark_coerces_legacy_vocabulary() {
        assert_eq!(Remark::coerce("up"), Some(Remark::Increasing));
        assert_eq!(Remark::coerce(" Down "), Some(Remark::Decreasing));
        assert_eq!(Remark::coerce("same"), Some(Remark::Constant));
        assert_eq!(Remark::coerce("sideways"), None);
    }

    #[test]
    fn test_comparison_result_parses_model_reply() {
        let json = r#"{"is_compliant": false, "remark": "down", "reason": "99.85 is below 99.9"}"#;
        let result: ComparisonResult = serde_json::from_str(json).unwrap();
        assert!(!result.is_compliant);
        assert_eq!(result.remark, Remark::Decreasing);

        let out = serde_json::to_value(&result).unwrap();
        assert_eq!(out["remark"], "decreasing");
    }

    #[test]
    fn test_reason_optional() {
        let json = r#"{"is_compliant": true, "remark": "constant"}"#;
        let result: ComparisonResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.reason, None);
    }

    #[test]
    fn test_between() {
        assert_eq!(Remark::between(0.1 + 0.2, 0.3), Remark::Constant);
        assert_eq!(Remark::between(2.0, 1.0), Remark::Increasing);
        assert_eq!(Remark::between(1.0, 2.0), Remark::Decreasing);
    }
}
