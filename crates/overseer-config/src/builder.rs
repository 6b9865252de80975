//! Configuration builder

use crate::error::Result;
use crate::types::{Config, LogFormat};
use std::time::Duration;

/// Builder for constructing configuration programmatically
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pass interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.supervisor.interval = interval;
        self
    }

    /// Set the health check timeout
    pub fn health_check_timeout(mut self, timeout: Duration) -> Self {
        self.config.supervisor.health_check_timeout = timeout;
        self
    }

    /// Replace the initial module set
    pub fn initial_modules<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.supervisor.initial_modules = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the log level
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Set the log format
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Write logs to `path` instead of stdout
    pub fn log_file(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config.logging.file = Some(path.into());
        self
    }

    /// Attach settings for one module
    pub fn module(mut self, name: impl Into<String>, settings: serde_json::Value) -> Self {
        self.config.modules.insert(name.into(), settings);
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<Config> {
        crate::validator::validate_config(&self.config)?;
        Ok(self.config)
    }
}
