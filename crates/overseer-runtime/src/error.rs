//! Runtime error types

use crate::handle::ModuleHandle;
use overseer_module_api::ModuleError;
use std::fmt;
use std::time::Duration;

/// A module could not be resolved or instantiated
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No factory is registered under this name
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    /// The factory ran but failed to build the module
    #[error("Failed to instantiate module {name}: {source}")]
    Instantiate {
        /// Requested module name
        name: String,
        /// Underlying module error
        #[source]
        source: ModuleError,
    },
}

impl LoadError {
    /// Create a new unknown module error
    pub fn unknown(name: impl fmt::Display) -> Self {
        Self::UnknownModule(name.to_string())
    }

    /// Create a new instantiation error
    pub fn instantiate(name: impl fmt::Display, source: ModuleError) -> Self {
        Self::Instantiate {
            name: name.to_string(),
            source,
        }
    }
}

/// A module could not be unloaded
#[derive(Debug, thiserror::Error)]
pub enum UnloadError {
    /// The handle does not refer to the live instance of its module
    #[error("Module {name} is not loaded (stale handle {handle})")]
    NotLoaded {
        /// Module name
        name: String,
        /// The rejected handle
        handle: ModuleHandle,
    },

    /// The module's cleanup step failed; the entry was kept
    #[error("Cleanup of module {name} failed: {source}")]
    Cleanup {
        /// Module name
        name: String,
        /// Underlying module error
        #[source]
        source: ModuleError,
    },
}

impl UnloadError {
    /// Create a new not-loaded error
    pub fn not_loaded(handle: &ModuleHandle) -> Self {
        Self::NotLoaded {
            name: handle.name().to_string(),
            handle: handle.clone(),
        }
    }

    /// Create a new cleanup error
    pub fn cleanup(name: impl fmt::Display, source: ModuleError) -> Self {
        Self::Cleanup {
            name: name.to_string(),
            source,
        }
    }

    /// Name of the module that failed to unload
    pub fn module(&self) -> &str {
        match self {
            Self::NotLoaded { name, .. } | Self::Cleanup { name, .. } => name,
        }
    }
}

/// A reload failed part way; nothing is rolled back
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    /// The fresh load failed
    #[error("Reload failed while loading: {0}")]
    Load(#[from] LoadError),

    /// Unloading the current instance failed
    #[error("Reload failed while unloading: {0}")]
    Unload(#[from] UnloadError),
}

/// Why a health check did not produce an answer
///
/// Never propagated: the registry folds it into an unhealthy verdict.
#[derive(Debug, thiserror::Error)]
pub enum HealthCheckError {
    /// Module declares no health check capability
    #[error("module has no health check")]
    Missing,

    /// The handle does not refer to a live instance
    #[error("module is not loaded")]
    NotLoaded,

    /// The health check raised an error
    #[error("health check raised: {0}")]
    Failed(#[source] ModuleError),

    /// The health check did not answer in time
    #[error("health check timed out after {0:?}")]
    TimedOut(Duration),
}

/// Supervisor error type
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// One of the initial modules failed to load
    #[error("Failed to load initial modules: {0}")]
    InitialLoad(#[from] LoadError),
}

/// Result type for supervisor operations
pub type Result<T> = std::result::Result<T, SupervisorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_display() {
        let err = LoadError::unknown("metrics");
        assert_eq!(err.to_string(), "Unknown module: metrics");

        let err = LoadError::instantiate("metrics", ModuleError::config("missing url"));
        assert_eq!(
            err.to_string(),
            "Failed to instantiate module metrics: Configuration error: missing url"
        );
    }

    #[test]
    fn test_unload_error_module() {
        let handle = ModuleHandle::new("cache");
        let err = UnloadError::not_loaded(&handle);
        assert_eq!(err.module(), "cache");

        let err = UnloadError::cleanup("cache", ModuleError::cleanup("busy"));
        assert_eq!(err.module(), "cache");
        assert_eq!(
            err.to_string(),
            "Cleanup of module cache failed: Cleanup failed: busy"
        );
    }

    #[test]
    fn test_reload_error_wraps_source() {
        let err: ReloadError = LoadError::unknown("x").into();
        assert!(matches!(err, ReloadError::Load(LoadError::UnknownModule(_))));

        let err: ReloadError = UnloadError::cleanup("x", ModuleError::cleanup("busy")).into();
        assert!(matches!(err, ReloadError::Unload(UnloadError::Cleanup { .. })));
    }

    #[test]
    fn test_health_check_error_display() {
        assert_eq!(HealthCheckError::Missing.to_string(), "module has no health check");
        assert_eq!(
            HealthCheckError::TimedOut(Duration::from_secs(2)).to_string(),
            "health check timed out after 2s"
        );
    }
}
