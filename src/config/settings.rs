// * Host-supplied gather settings
// * Archive sizing is owned by the packager; the gatherers only read it

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::cluster::errors::GatherError;
use crate::config::constants::{
    DEFAULT_EVENT_INTERVAL, DEFAULT_LOG_COMPRESSION_RATIO, DEFAULT_MAX_ARCHIVE_BYTES,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Settings shared by every gather task in a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatherConfig {
    /// Trailing interval used for event recency, in whole seconds on the wire
    #[serde(rename = "intervalSeconds", with = "duration_secs")]
    pub interval: Duration,
    /// Size cap of the archive the records end up in
    pub max_archive_bytes: i64,
    /// Expected compression ratio of raw logs inside the archive
    pub log_compression_ratio: i64,
}

impl Default for GatherConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_EVENT_INTERVAL,
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_BYTES,
            log_compression_ratio: DEFAULT_LOG_COMPRESSION_RATIO,
        }
    }
}

impl GatherConfig {
    /// Parses a JSON config document; absent fields keep their defaults
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: GatherConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON config file
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Loads from `path` when given, otherwise returns the defaults
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::Invalid("interval must be positive".to_string()));
        }
        if self.max_archive_bytes <= 0 {
            return Err(ConfigError::Invalid(
                "maxArchiveBytes must be positive".to_string(),
            ));
        }
        if self.log_compression_ratio <= 0 {
            return Err(ConfigError::Invalid(
                "logCompressionRatio must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-fetch log byte budget shared by `total_containers` containers
    ///
    /// `B = floor(max_archive_bytes * log_compression_ratio / total_containers / 2)`
    pub fn log_budget(&self, total_containers: usize) -> Result<usize, GatherError> {
        if total_containers == 0 {
            return Err(GatherError::InvalidBudget(0));
        }
        let containers = i64::try_from(total_containers).unwrap_or(i64::MAX);
        let budget = self
            .max_archive_bytes
            .saturating_mul(self.log_compression_ratio)
            / containers
            / 2;
        if budget <= 0 {
            return Err(GatherError::InvalidBudget(budget));
        }
        usize::try_from(budget).map_err(|_| GatherError::InvalidBudget(budget))
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatherConfig::default();
        assert_eq!(config.interval, Duration::from_secs(3600));
        assert_eq!(config.max_archive_bytes, 8 * 1024 * 1024);
        assert_eq!(config.log_compression_ratio, 2);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = GatherConfig::from_json_str(r#"{"intervalSeconds": 7200}"#).unwrap();
        assert_eq!(config.interval, Duration::from_secs(7200));
        assert_eq!(config.max_archive_bytes, DEFAULT_MAX_ARCHIVE_BYTES);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let result = GatherConfig::from_json_str(r#"{"intervalSeconds": 0}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_log_budget() {
        let config = GatherConfig::default();
        // * 8 MiB * 2 / 4 / 2
        assert_eq!(config.log_budget(4).unwrap(), 2 * 1024 * 1024);
    }

    #[test]
    fn test_log_budget_rejects_non_positive() {
        let config = GatherConfig {
            max_archive_bytes: 1,
            log_compression_ratio: 1,
            ..GatherConfig::default()
        };
        assert!(matches!(
            config.log_budget(3),
            Err(GatherError::InvalidBudget(0))
        ));
        assert!(matches!(
            GatherConfig::default().log_budget(0),
            Err(GatherError::InvalidBudget(0))
        ));
    }

    #[test]
    fn test_load_optional_without_path() {
        let config = GatherConfig::load_optional(None).unwrap();
        assert_eq!(config, GatherConfig::default());
    }
}
