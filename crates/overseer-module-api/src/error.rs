//! Module error types

use std::fmt;

/// Error raised by a module implementation
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// Instantiation failed
    #[error("Initialization failed: {0}")]
    InitError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(String),

    /// Health check raised instead of answering
    #[error("Health check error: {0}")]
    HealthCheckError(String),

    /// Cleanup failed
    #[error("Cleanup failed: {0}")]
    CleanupError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Result type for module operations
pub type Result<T> = std::result::Result<T, ModuleError>;

impl ModuleError {
    /// Create a new initialization error
    pub fn init(msg: impl fmt::Display) -> Self {
        Self::InitError(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config(msg: impl fmt::Display) -> Self {
        Self::ConfigError(msg.to_string())
    }

    /// Create a new runtime error
    pub fn runtime(msg: impl fmt::Display) -> Self {
        Self::RuntimeError(msg.to_string())
    }

    /// Create a new health check error
    pub fn health_check(msg: impl fmt::Display) -> Self {
        Self::HealthCheckError(msg.to_string())
    }

    /// Create a new cleanup error
    pub fn cleanup(msg: impl fmt::Display) -> Self {
        Self::CleanupError(msg.to_string())
    }
}
