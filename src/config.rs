//! Engine configuration.
//!
//! Loaded from a TOML file when one is present; every field has a default so
//! a missing or partial file still yields a working engine.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{EngineError, EngineResult};

/// Tunable engine settings.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of the unfiltered forward-state cache.
    pub forward_capacity: usize,
    /// Capacity of the filtered-state cache.
    pub filtered_capacity: usize,
    /// Append one JSON line per pipeline run under `log_dir`.
    pub log_pipeline: bool,
    pub log_dir: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            forward_capacity: 4,
            filtered_capacity: 6,
            log_pipeline: false,
            log_dir: "logs".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document, falling back to defaults for absent fields.
    pub fn from_toml_str(raw: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            toml::from_str(raw).map_err(|err| EngineError::config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> EngineResult<()> {
        if self.forward_capacity == 0 || self.filtered_capacity == 0 {
            return Err(EngineError::config("cache capacities must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.forward_capacity, 4);
        assert_eq!(config.filtered_capacity, 6);
        assert!(!config.log_pipeline);
        assert_eq!(config.log_dir, "logs");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = EngineConfig::from_toml_str("forward_capacity = 8").unwrap();
        assert_eq!(config.forward_capacity, 8);
        assert_eq!(config.filtered_capacity, 6);
    }

    #[test]
    fn test_full_toml() {
        let raw = r#"
            forward_capacity = 2
            filtered_capacity = 3
            log_pipeline = true
            log_dir = "out"
        "#;
        let config = EngineConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.forward_capacity, 2);
        assert_eq!(config.filtered_capacity, 3);
        assert!(config.log_pipeline);
        assert_eq!(config.log_dir, "out");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = EngineConfig::from_toml_str("forward_capacity = 0");
        assert!(matches!(err, Err(EngineError::Config { .. })));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = EngineConfig::from_toml_str("forward_capacity = [");
        assert!(matches!(err, Err(EngineError::Config { .. })));
    }
}
