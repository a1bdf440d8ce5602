//! Condition operators shared by extraction and comparison
//!
//! The vocabulary is closed: the formatter coerces whatever wording a model
//! produces into one of these variants, and the comparator evaluates them.

use crate::comparison::Remark;
use crate::metric::MetricValue;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator between an actual reading and a contractual target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Condition {
    /// `>=`: actual must be at least the target
    GreaterOrEqual,
    /// `<=`: actual must be at most the target
    LessOrEqual,
    /// `>`: actual must exceed the target
    Greater,
    /// `<`: actual must stay below the target
    Less,
    /// `=`: actual must equal the target
    Equal,
    /// `!=`: actual must differ from the target
    NotEqual,
    /// `within_range`: min_value <= actual <= max_value
    WithinRange,
    /// `outside_range`: actual < min_value or actual > max_value
    OutsideRange,
    /// `within_percentage`: actual within max_value percent of min_value
    WithinPercentage,
    /// `within_absolute`: actual within max_value units of min_value
    WithinAbsolute,
    /// No condition stated in the contract
    #[default]
    NotApplied,
}

/// All variants, in label order
pub const ALL_CONDITIONS: [Condition; 11] = [
    Condition::GreaterOrEqual,
    Condition::LessOrEqual,
    Condition::Greater,
    Condition::Less,
    Condition::Equal,
    Condition::NotEqual,
    Condition::WithinRange,
    Condition::OutsideRange,
    Condition::WithinPercentage,
    Condition::WithinAbsolute,
    Condition::NotApplied,
];

const NOT_APPLIED_WORDS: &[&str] = &[
    "not_applied",
    "not applied",
    "not applicable",
    "not found",
    "n/a",
    "none",
    "null",
    "unknown",
];

const AT_LEAST_WORDS: &[&str] = &[
    "greater than or equal",
    "greater than or equals",
    "more than or equal",
    "at least",
    "no less than",
    "not less than",
    "minimum",
    "or more",
    "or higher",
    "or above",
];

const AT_MOST_WORDS: &[&str] = &[
    "less than or equal",
    "less than or equals",
    "at most",
    "no more than",
    "not more than",
    "not exceed",
    "maximum",
    "up to",
    "or less",
    "or fewer",
    "or below",
    "within",
];

const ABOVE_WORDS: &[&str] = &["greater than", "more than", "exceed", "above", "over"];

const BELOW_WORDS: &[&str] = &["less than", "fewer than", "below", "under"];

impl Condition {
    /// Wire label for this condition
    pub fn label(&self) -> &'static str {
        match self {
            Condition::GreaterOrEqual => ">=",
            Condition::LessOrEqual => "<=",
            Condition::Greater => ">",
            Condition::Less => "<",
            Condition::Equal => "=",
            Condition::NotEqual => "!=",
            Condition::WithinRange => "within_range",
            Condition::OutsideRange => "outside_range",
            Condition::WithinPercentage => "within_percentage",
            Condition::WithinAbsolute => "within_absolute",
            Condition::NotApplied => "not_applied",
        }
    }

    /// Human-readable phrasing used in prompts
    pub fn describe(&self) -> &'static str {
        match self {
            Condition::GreaterOrEqual => "greater than or equal to",
            Condition::LessOrEqual => "less than or equal to",
            Condition::Greater => "strictly greater than",
            Condition::Less => "strictly less than",
            Condition::Equal => "equal to",
            Condition::NotEqual => "not equal to",
            Condition::WithinRange => "inside the range [min_value, max_value]",
            Condition::OutsideRange => "outside the range [min_value, max_value]",
            Condition::WithinPercentage => "within max_value percent of min_value",
            Condition::WithinAbsolute => "within max_value units of min_value",
            Condition::NotApplied => "not applied",
        }
    }

    /// Coerce free-form model or contract wording into a condition
    ///
    /// Accepts exact labels, symbols with trailing explanations
    /// (`">= greater than or equals to"`), unicode operators and common
    /// English phrasings. Returns `None` when nothing matches.
    ///
    /// # Examples
    ///
    /// ```
    /// use covenant_domain::Condition;
    ///
    /// assert_eq!(Condition::coerce(">= greater than or equals to"), Some(Condition::GreaterOrEqual));
    /// assert_eq!(Condition::coerce("at most"), Some(Condition::LessOrEqual));
    /// assert_eq!(Condition::coerce("banana"), None);
    /// ```
    pub fn coerce(raw: &str) -> Option<Condition> {
        let text = raw.trim().to_lowercase();
        if text.is_empty() {
            return Some(Condition::NotApplied);
        }

        if let Some(condition) = ALL_CONDITIONS.iter().find(|c| c.label() == text) {
            return Some(*condition);
        }

        // Symbolic prefixes; two-character operators before one-character ones
        let symbols: &[(&str, Condition)] = &[
            (">=", Condition::GreaterOrEqual),
            ("=>", Condition::GreaterOrEqual),
            ("≥", Condition::GreaterOrEqual),
            ("<=", Condition::LessOrEqual),
            ("=<", Condition::LessOrEqual),
            ("≤", Condition::LessOrEqual),
            ("!=", Condition::NotEqual),
            ("<>", Condition::NotEqual),
            ("≠", Condition::NotEqual),
            ("==", Condition::Equal),
            (">", Condition::Greater),
            ("<", Condition::Less),
            ("=", Condition::Equal),
        ];
        for (symbol, condition) in symbols {
            if text.starts_with(symbol) {
                return Some(*condition);
            }
        }

        if NOT_APPLIED_WORDS.iter().any(|w| text == *w) {
            return Some(Condition::NotApplied);
        }
        if text.contains("outside") {
            return Some(Condition::OutsideRange);
        }
        if text.contains("within") && (text.contains("percent") || text.contains('%')) {
            return Some(Condition::WithinPercentage);
        }
        if text.contains("within") && (text.contains("absolute") || text.contains("difference")) {
            return Some(Condition::WithinAbsolute);
        }
        if text.contains("range") || text.contains("between") {
            return Some(Condition::WithinRange);
        }
        if text.contains("not equal") || text.contains("different") {
            return Some(Condition::NotEqual);
        }
        if AT_LEAST_WORDS.iter().any(|w| text.contains(w)) {
            return Some(Condition::GreaterOrEqual);
        }
        if AT_MOST_WORDS.iter().any(|w| text.contains(w)) {
            return Some(Condition::LessOrEqual);
        }
        if ABOVE_WORDS.iter().any(|w| text.contains(w)) {
            return Some(Condition::Greater);
        }
        if BELOW_WORDS.iter().any(|w| text.contains(w)) {
            return Some(Condition::Less);
        }
        if text.contains("equal") || text.contains("exactly") {
            return Some(Condition::Equal);
        }

        None
    }

    /// Whether this condition can be evaluated numerically
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Condition::NotApplied)
    }

    /// The single value a reading is compared against under this condition
    ///
    /// `>=`/`>` prefer `min_value`, `<=`/`<` prefer `max_value`, each falling
    /// back to the other bound. Difference variants use `min_value` as the
    /// reference. Range conditions have no single reference.
    pub fn reference(&self, target: &MetricValue) -> Option<f64> {
        match self {
            Condition::GreaterOrEqual | Condition::Greater => {
                target.min_value.or(target.max_value)
            }
            Condition::LessOrEqual | Condition::Less => target.max_value.or(target.min_value),
            Condition::Equal | Condition::NotEqual => target.min_value.or(target.max_value),
            Condition::WithinPercentage | Condition::WithinAbsolute => target.min_value,
            Condition::WithinRange | Condition::OutsideRange | Condition::NotApplied => None,
        }
    }

    /// The arithmetic statement a reading is evaluated with, e.g. `3.5 <= 5`
    ///
    /// Returns `None` when the target lacks the bounds this condition needs.
    pub fn statement(&self, actual: f64, target: &MetricValue) -> Option<String> {
        match self {
            Condition::WithinRange => {
                let (min, max) = (target.min_value?, target.max_value?);
                Some(format!("{} <= {} <= {}", fmt_num(min), fmt_num(actual), fmt_num(max)))
            }
            Condition::OutsideRange => {
                let (min, max) = (target.min_value?, target.max_value?);
                Some(format!(
                    "{} < {} or {} > {}",
                    fmt_num(actual),
                    fmt_num(min),
                    fmt_num(actual),
                    fmt_num(max)
                ))
            }
            Condition::WithinPercentage => {
                let (reference, tolerance) = (target.min_value?, target.max_value?);
                Some(format!(
                    "|{} - {}| <= {}% of {}",
                    fmt_num(actual),
                    fmt_num(reference),
                    fmt_num(tolerance),
                    fmt_num(reference)
                ))
            }
            Condition::WithinAbsolute => {
                let (reference, tolerance) = (target.min_value?, target.max_value?);
                Some(format!(
                    "|{} - {}| <= {}",
                    fmt_num(actual),
                    fmt_num(reference),
                    fmt_num(tolerance)
                ))
            }
            Condition::NotApplied => None,
            _ => {
                let reference = self.reference(target)?;
                Some(format!("{} {} {}", fmt_num(actual), self.label(), fmt_num(reference)))
            }
        }
    }

    /// Evaluate the condition literally
    ///
    /// Returns `None` for [`Condition::NotApplied`] or when the target lacks
    /// the bounds the condition needs.
    ///
    /// # Examples
    ///
    /// ```
    /// use covenant_domain::{Condition, MetricValue};
    ///
    /// let target = MetricValue::at_most(5.0, "%");
    /// assert_eq!(Condition::LessOrEqual.evaluate(3.5, &target), Some(true));
    /// assert_eq!(Condition::LessOrEqual.evaluate(6.0, &target), Some(false));
    /// ```
    pub fn evaluate(&self, actual: f64, target: &MetricValue) -> Option<bool> {
        match self {
            Condition::GreaterOrEqual => {
                let r = self.reference(target)?;
                Some(actual > r || approx_eq(actual, r))
            }
            Condition::LessOrEqual => {
                let r = self.reference(target)?;
                Some(actual < r || approx_eq(actual, r))
            }
            Condition::Greater => {
                let r = self.reference(target)?;
                Some(actual > r && !approx_eq(actual, r))
            }
            Condition::Less => {
                let r = self.reference(target)?;
                Some(actual < r && !approx_eq(actual, r))
            }
            Condition::Equal => Some(approx_eq(actual, self.reference(target)?)),
            Condition::NotEqual => Some(!approx_eq(actual, self.reference(target)?)),
            Condition::WithinRange => {
                let (min, max) = (target.min_value?, target.max_value?);
                Some(
                    (actual > min || approx_eq(actual, min))
                        && (actual < max || approx_eq(actual, max)),
                )
            }
            Condition::OutsideRange => {
                let (min, max) = (target.min_value?, target.max_value?);
                Some(
                    (actual < min && !approx_eq(actual, min))
                        || (actual > max && !approx_eq(actual, max)),
                )
            }
            Condition::WithinPercentage => {
                let (reference, tolerance) = (target.min_value?, target.max_value?);
                let allowed = reference.abs() * tolerance / 100.0;
                let deviation = (actual - reference).abs();
                Some(deviation < allowed || approx_eq(deviation, allowed))
            }
            Condition::WithinAbsolute => {
                let (reference, tolerance) = (target.min_value?, target.max_value?);
                let deviation = (actual - reference).abs();
                Some(deviation < tolerance || approx_eq(deviation, tolerance))
            }
            Condition::NotApplied => None,
        }
    }

    /// Direction of the reading relative to the target
    ///
    /// `constant` when the reading equals the reference; for range conditions
    /// a reading inside the range is `constant` and one beyond either bound
    /// moves in that bound's direction.
    pub fn trend(&self, actual: f64, target: &MetricValue) -> Option<Remark> {
        match self {
            Condition::WithinRange | Condition::OutsideRange => {
                let (min, max) = (target.min_value?, target.max_value?);
                if actual > max && !approx_eq(actual, max) {
                    Some(Remark::Increasing)
                } else if actual < min && !approx_eq(actual, min) {
                    Some(Remark::Decreasing)
                } else {
                    Some(Remark::Constant)
                }
            }
            Condition::NotApplied => {
                let reference = target.min_value.or(target.max_value)?;
                Some(Remark::between(actual, reference))
            }
            _ => Some(Remark::between(actual, self.reference(target)?)),
        }
    }
}

/// Float equality tolerant to representation error (e.g. `0.1 + 0.2 == 0.3`)
pub fn approx_eq(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= 1e-9 * scale
}

/// Render a number without a trailing `.0` for whole values
pub fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Condition::NotApplied => serializer.serialize_none(),
            other => serializer.serialize_str(other.label()),
        }
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(Condition::NotApplied),
            Some(text) => Condition::coerce(&text)
                .ok_or_else(|| de::Error::custom(format!("unknown condition '{}'", text))),
        }
    }
}
