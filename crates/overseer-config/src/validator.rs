//! Configuration validation

use crate::error::{ConfigError, Result};
use crate::Config;
use std::collections::HashSet;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_supervisor(config)?;
    validate_logging(config)?;
    validate_modules(config);
    Ok(())
}

fn validate_supervisor(config: &Config) -> Result<()> {
    let supervisor = &config.supervisor;

    if supervisor.interval.is_zero() {
        return Err(ConfigError::invalid("supervisor.interval must be > 0"));
    }

    if supervisor.health_check_timeout.is_zero() {
        return Err(ConfigError::invalid(
            "supervisor.health_check_timeout must be > 0",
        ));
    }

    if supervisor.health_check_timeout > supervisor.interval {
        tracing::warn!(
            timeout = ?supervisor.health_check_timeout,
            interval = ?supervisor.interval,
            "health_check_timeout exceeds the pass interval"
        );
    }

    if supervisor.initial_modules.is_empty() {
        return Err(ConfigError::invalid(
            "supervisor.initial_modules cannot be empty",
        ));
    }

    let mut seen = HashSet::new();
    for name in &supervisor.initial_modules {
        if name.trim().is_empty() {
            return Err(ConfigError::invalid("module name cannot be empty"));
        }
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::invalid(format!(
                "duplicate module in initial_modules: {name}"
            )));
        }
    }

    Ok(())
}

fn validate_logging(config: &Config) -> Result<()> {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::invalid(format!(
            "Invalid log level: {} (must be one of {})",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if let Some(file) = &config.logging.file {
        if file.as_os_str().is_empty() || file.is_dir() {
            return Err(ConfigError::invalid(format!(
                "logging.file must name a file: {}",
                file.display()
            )));
        }
    }
    Ok(())
}

fn validate_modules(config: &Config) {
    for name in config.modules.keys() {
        if !config.supervisor.initial_modules.contains(name) {
            tracing::warn!(module = %name, "Settings configured for a module that is not loaded at start");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = Config::default();
        config.supervisor.interval = Duration::ZERO;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("interval"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.supervisor.health_check_timeout = Duration::ZERO;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_initial_modules_rejected() {
        let mut config = Config::default();
        config.supervisor.initial_modules.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_duplicate_module_rejected() {
        let mut config = Config::default();
        config.supervisor.initial_modules = vec!["a".to_string(), "a".to_string()];
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_blank_module_rejected() {
        let mut config = Config::default();
        config.supervisor.initial_modules = vec!["  ".to_string()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_log_file_must_name_a_file() {
        let mut config = Config::default();
        config.logging.file = Some(std::env::temp_dir());
        assert!(validate_config(&config).is_err());

        config.logging.file = Some(std::env::temp_dir().join("overseer-validator.log"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut config = Config::default();
        config.logging.level = "WARN".to_string();
        assert!(validate_config(&config).is_ok());

        config.logging.level = "verbose".to_string();
        assert!(validate_config(&config).is_err());
    }
}
