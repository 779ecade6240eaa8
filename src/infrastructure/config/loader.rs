//! Layered configuration loading.
//!
//! Defaults, then `.intent/config.yaml`, then `.intent/local.yaml`, then
//! `INTENT_*` environment variables. Later layers win.

use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::{Config, InferenceProvider};

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_iterations: {0}. Must be at least 1")]
    InvalidMaxIterations(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid prober max_concurrency: {0}. Must be at least 1")]
    InvalidConcurrency(usize),

    #[error("Invalid timeout for {0}: must be at least 1 second")]
    InvalidTimeout(&'static str),

    #[error("Invalid temperature: {0}. Must be between 0.0 and 1.0")]
    InvalidTemperature(f32),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .intent/config.yaml (project config)
    /// 3. .intent/local.yaml (local overrides, optional)
    /// 4. Environment variables (INTENT_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment(Path::new(".intent/config.yaml"))
            .merge(Yaml::file(".intent/local.yaml"))
            .merge(Env::prefixed("INTENT_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Self::figment(path)
            .merge(Env::prefixed("INTENT_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.workflow.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations(
                config.workflow.max_iterations,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        if config.prober.max_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(
                config.prober.max_concurrency,
            ));
        }

        if config.prober.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("prober"));
        }

        if config.inference.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("inference"));
        }

        if !(0.0..=1.0).contains(&config.inference.temperature) {
            return Err(ConfigError::InvalidTemperature(
                config.inference.temperature,
            ));
        }

        if config.inference.provider == InferenceProvider::Anthropic
            && config.inference.base_url.trim().is_empty()
        {
            return Err(ConfigError::ValidationFailed(
                "inference.base_url cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_validation_rejects_zero_iterations() {
        let mut config = Config::default();
        config.workflow.max_iterations = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxIterations(0))
        ));
    }

    #[test]
    fn test_validation_rejects_inverted_backoff() {
        let mut config = Config::default();
        config.retry.initial_backoff_ms = 20_000;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(20_000, 10_000))
        ));
    }

    #[test]
    fn test_validation_rejects_bad_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn test_validation_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.prober.max_concurrency = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidConcurrency(0))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "inference:\n  provider: offline\nworkflow:\n  max_iterations: 2\nprober:\n  timeout_secs: 3"
        )
        .expect("write config");

        let config = temp_env::with_vars_unset(
            ["INTENT_WORKFLOW__MAX_ITERATIONS", "INTENT_INFERENCE__PROVIDER"],
            || ConfigLoader::load_from_file(file.path()),
        )
        .expect("config should load");

        assert_eq!(config.inference.provider, InferenceProvider::Offline);
        assert_eq!(config.workflow.max_iterations, 2);
        assert_eq!(config.prober.timeout_secs, 3);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "workflow:\n  max_iterations: 2").expect("write config");

        let config = temp_env::with_var("INTENT_WORKFLOW__MAX_ITERATIONS", Some("7"), || {
            ConfigLoader::load_from_file(file.path())
        })
        .expect("config should load");

        assert_eq!(config.workflow.max_iterations, 7);
    }

    #[test]
    fn test_invalid_file_values_fail_validation() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "logging:\n  format: xml").expect("write config");

        let result = temp_env::with_vars_unset(["INTENT_LOGGING__FORMAT"], || {
            ConfigLoader::load_from_file(file.path())
        });
        assert!(result.is_err());
    }
}
