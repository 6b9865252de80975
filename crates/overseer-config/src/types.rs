//! Configuration types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Supervision loop
    #[serde(default)]
    pub supervisor: SupervisorSettings,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-module settings, handed to the module's factory
    #[serde(default)]
    pub modules: BTreeMap<String, serde_json::Value>,
}

impl Config {
    /// Settings block for one module, if configured
    pub fn module_settings(&self, name: &str) -> Option<&serde_json::Value> {
        self.modules.get(name)
    }
}

/// Supervision loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupervisorSettings {
    /// Idle time between two passes
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Upper bound for one health check
    #[serde(default = "default_health_check_timeout", with = "humantime_serde")]
    pub health_check_timeout: Duration,

    /// Modules loaded at start, in order
    #[serde(default = "default_initial_modules")]
    pub initial_modules: Vec<String>,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            health_check_timeout: default_health_check_timeout(),
            initial_modules: default_initial_modules(),
        }
    }
}

fn default_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_health_check_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_initial_modules() -> Vec<String> {
    vec!["data_collector".to_string(), "api_wrapper".to_string()]
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Append log lines to this file instead of stdout
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.supervisor.interval, Duration::from_secs(30));
        assert_eq!(config.supervisor.health_check_timeout, Duration::from_secs(10));
        assert_eq!(
            config.supervisor.initial_modules,
            vec!["data_collector".to_string(), "api_wrapper".to_string()]
        );
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.logging.file.is_none());
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"supervisor": {"interval": "5s"}}"#).unwrap();
        assert_eq!(config.supervisor.interval, Duration::from_secs(5));
        assert_eq!(config.supervisor.health_check_timeout, Duration::from_secs(10));
        assert_eq!(config.supervisor.initial_modules.len(), 2);
    }

    #[test]
    fn test_log_file_target() {
        let config: Config =
            serde_json::from_str(r#"{"logging": {"file": "/var/log/overseer.log"}}"#).unwrap();
        assert_eq!(
            config.logging.file,
            Some(PathBuf::from("/var/log/overseer.log"))
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_log_format_serde() {
        let format: LogFormat = serde_json::from_str(r#""json""#).unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(format.to_string(), "json");
        assert!(serde_json::from_str::<LogFormat>(r#""xml""#).is_err());
    }
}
