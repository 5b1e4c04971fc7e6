//! Application configuration loaded from environment variables.

use std::time::Duration;

use saga::ExecuteOptions;
use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a whole number of milliseconds, got '{value}'")]
    InvalidDuration { key: &'static str, value: String },

    #[error("LOG_FORMAT must be 'text' or 'json', got '{0}'")]
    InvalidLogFormat(String),
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Runner configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `SAGA_ACTIVITY_TIMEOUT_MS`: per-activity timeout (default: none)
/// - `SAGA_COMPENSATION_TIMEOUT_MS`: per-compensation timeout (default: none)
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub activity_timeout: Option<Duration>,
    pub compensation_timeout: Option<Duration>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(ConfigError::InvalidLogFormat(other.to_string())),
        };

        Ok(Self {
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_format,
            activity_timeout: parse_millis("SAGA_ACTIVITY_TIMEOUT_MS", lookup("SAGA_ACTIVITY_TIMEOUT_MS"))?,
            compensation_timeout: parse_millis(
                "SAGA_COMPENSATION_TIMEOUT_MS",
                lookup("SAGA_COMPENSATION_TIMEOUT_MS"),
            )?,
        })
    }

    /// Returns the saga execution options implied by the configured timeouts.
    pub fn execute_options(&self) -> ExecuteOptions {
        let mut options = ExecuteOptions::new();
        if let Some(timeout) = self.activity_timeout {
            options = options.with_activity_timeout(timeout);
        }
        if let Some(timeout) = self.compensation_timeout {
            options = options.with_compensation_timeout(timeout);
        }
        options
    }
}

fn parse_millis(key: &'static str, value: Option<String>) -> Result<Option<Duration>, ConfigError> {
    value
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidDuration { key, value: raw })
        })
        .transpose()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            activity_timeout: None,
            compensation_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.activity_timeout, None);
        assert_eq!(config.compensation_timeout, None);
    }

    #[test]
    fn test_reads_all_keys() {
        let config = Config::from_lookup(lookup(&[
            ("RUST_LOG", "saga=debug"),
            ("LOG_FORMAT", "json"),
            ("SAGA_ACTIVITY_TIMEOUT_MS", "1500"),
            ("SAGA_COMPENSATION_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.log_level, "saga=debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.activity_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.compensation_timeout, Some(Duration::from_millis(250)));

        let options = config.execute_options();
        assert_eq!(options.activity_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(options.compensation_timeout, Some(Duration::from_millis(250)));
        assert!(options.cancellation.is_none());
    }

    #[test]
    fn test_invalid_timeout() {
        let err = Config::from_lookup(lookup(&[("SAGA_ACTIVITY_TIMEOUT_MS", "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidDuration {
                key: "SAGA_ACTIVITY_TIMEOUT_MS",
                value: "soon".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_log_format() {
        let err = Config::from_lookup(lookup(&[("LOG_FORMAT", "xml")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidLogFormat("xml".to_string()));
    }
}
