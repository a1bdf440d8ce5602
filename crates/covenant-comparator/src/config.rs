//! Configuration for the Metric Comparator

use serde::{Deserialize, Serialize};

/// Configuration for metric comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparatorConfig {
    /// Runs of the whole compare-then-format workflow before a metric fails
    pub max_attempts: usize,

    /// Overrule the model with the locally computed verdict and trend
    pub enforce_literal_evaluation: bool,

    /// Metrics compared at the same time in a batch
    pub max_concurrency: usize,

    /// Sampling temperature
    pub temperature: f32,
}

impl Default for ComparatorConfig {
    /// Default configuration: one retry, literal evaluation enforced
    fn default() -> Self {
        Self {
            max_attempts: 2,
            enforce_literal_evaluation: true,
            max_concurrency: 4,
            temperature: 0.0,
        }
    }
}

impl ComparatorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("temperature must be between 0 and 2".to_string());
        }
        Ok(())
    }

    /// Aggressive preset: no retry, wide batches
    pub fn aggressive() -> Self {
        Self {
            max_attempts: 1,
            max_concurrency: 8,
            ..Self::default()
        }
    }

    /// Lenient preset: extra retry, narrow batches
    pub fn lenient() -> Self {
        Self {
            max_attempts: 3,
            max_concurrency: 2,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(ComparatorConfig::default().validate().is_ok());
        assert!(ComparatorConfig::aggressive().validate().is_ok());
        assert!(ComparatorConfig::lenient().validate().is_ok());
        assert_eq!(ComparatorConfig::default().max_attempts, 2);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = ComparatorConfig {
            max_attempts: 0,
            ..ComparatorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ComparatorConfig {
            enforce_literal_evaluation: false,
            ..ComparatorConfig::lenient()
        };
        let parsed = ComparatorConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, parsed);
        assert_eq!(
            ComparatorConfig::from_toml("max_attempts = 5").unwrap().max_concurrency,
            4
        );
    }
}
