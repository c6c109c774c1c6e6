// src/utils/config.rs
//! Configuration loading
//!
//! Sources are layered, later ones winning:
//!
//! 1. Built-in defaults
//! 2. Optional `global-control.{toml,yaml,json}` in the working directory
//! 3. `GLOBAL_CONTROL__*` environment variables (e.g. `GLOBAL_CONTROL__PLATFORM__WORKER_COUNT=8`)

use crate::utils::errors::{ControlError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

const CONFIG_BASENAME: &str = "global-control";
const ENV_PREFIX: &str = "GLOBAL_CONTROL";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub platform: PlatformConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Overrides for values normally queried from the platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Default worker count (hardware concurrency when unset)
    pub worker_count: Option<usize>,

    /// Default worker stack size in bytes
    pub stack_size: Option<usize>,
}

impl PlatformConfig {
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == Some(0) {
            return Err(ControlError::ConfigError(
                "platform.worker_count cannot be 0".to_string(),
            ));
        }
        if self.stack_size == Some(0) {
            return Err(ControlError::ConfigError(
                "platform.stack_size cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder at startup
    pub enabled: bool,
}

impl ControlConfig {
    /// Load configuration from the default file (if present) and environment
    pub fn load() -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_BASENAME).required(false))
            .add_source(Self::environment());
        Self::finish(builder)
    }

    /// Load configuration from an explicit file, still honoring environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::from(path.as_ref()).required(true))
            .add_source(Self::environment());
        Self::finish(builder)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    fn finish(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let config: ControlConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.platform.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ControlConfig::default();
        assert!(config.platform.worker_count.is_none());
        assert!(config.platform.stack_size.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[platform]
worker_count = 6
stack_size = 1048576

[logging]
level = "debug"
"#
        )
        .unwrap();

        let config = ControlConfig::load_from(file.path()).unwrap();
        assert_eq!(config.platform.worker_count, Some(6));
        assert_eq!(config.platform.stack_size, Some(1024 * 1024));
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_load_rejects_zero_workers() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[platform]\nworker_count = 0").unwrap();

        let err = ControlConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ControlError::ConfigError(_)));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ControlConfig::load_from(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ControlError::Config(_))));
    }

    #[test]
    fn test_validation() {
        let valid = PlatformConfig {
            worker_count: Some(4),
            stack_size: Some(2 * 1024 * 1024),
        };
        assert!(valid.validate().is_ok());

        let invalid = PlatformConfig {
            stack_size: Some(0),
            ..Default::default()
        };
        assert!(invalid.validate().is_err());
    }
}
