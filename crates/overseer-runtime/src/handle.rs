//! Module handles and lifecycle state

use crate::error::HealthCheckError;
use chrono::{DateTime, Utc};
use overseer_module_api::Capabilities;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque ticket for one loaded instance of a module
///
/// The registry owns the module itself. Every successful resolution mints a
/// new instance id, so a handle from before an unload never compares equal
/// to one from after it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleHandle {
    name: Arc<str>,
    instance: Uuid,
}

impl ModuleHandle {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            instance: Uuid::new_v4(),
        }
    }

    /// Module name (the registry key)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instance id of this load
    pub fn instance(&self) -> Uuid {
        self.instance
    }
}

impl fmt::Display for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.instance)
    }
}

/// Lifecycle state of a module as seen by the registry
///
/// `Loaded -> Unloaded` is the normal path. `CleanupFailed` marks an entry
/// whose cleanup raised: it stays in the loaded set and a later unload
/// retries the cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "error")]
pub enum ModuleState {
    /// Resolved and held by the registry
    Loaded,

    /// Cleanup raised during unload; entry retained
    CleanupFailed(String),

    /// Not held by the registry
    Unloaded,
}

impl ModuleState {
    /// Check if the registry holds the module
    pub fn is_loaded(&self) -> bool {
        !matches!(self, ModuleState::Unloaded)
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleState::Loaded => write!(f, "loaded"),
            ModuleState::CleanupFailed(msg) => write!(f, "cleanup failed: {}", msg),
            ModuleState::Unloaded => write!(f, "unloaded"),
        }
    }
}

/// Last observed health of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Not yet checked
    Unknown,
    /// Last check passed
    Healthy,
    /// Last check failed
    Unhealthy,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Unknown => write!(f, "unknown"),
            HealthState::Healthy => write!(f, "healthy"),
            HealthState::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Outcome of one health evaluation
#[derive(Debug)]
pub enum HealthVerdict {
    /// Module reported itself healthy
    Healthy,

    /// Module reported itself unhealthy
    Unhealthy,

    /// No answer; counts as unhealthy
    Failed(HealthCheckError),
}

impl HealthVerdict {
    /// Check if the verdict is healthy
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthVerdict::Healthy)
    }

    /// Health state this verdict records
    pub fn state(&self) -> HealthState {
        if self.is_healthy() {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        }
    }
}

impl fmt::Display for HealthVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthVerdict::Healthy => write!(f, "healthy"),
            HealthVerdict::Unhealthy => write!(f, "reported unhealthy"),
            HealthVerdict::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Snapshot of a registry entry
#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    /// Module name
    pub name: String,

    /// Instance id of the live load
    pub instance: Uuid,

    /// Module version as reported by the module
    pub version: String,

    /// Lifecycle state
    pub state: ModuleState,

    /// Last observed health
    pub health: HealthState,

    /// Declared capabilities
    pub capabilities: Capabilities,

    /// When this instance was loaded
    pub loaded_at: DateTime<Utc>,

    /// When this instance was last health checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use overseer_module_api::ModuleError;

    #[test]
    fn test_handles_are_unique_per_load() {
        let first = ModuleHandle::new("collector");
        let second = ModuleHandle::new("collector");
        assert_eq!(first.name(), second.name());
        assert_ne!(first, second);
        assert_eq!(first, first.clone());
    }

    #[test]
    fn test_handle_display() {
        let handle = ModuleHandle::new("collector");
        assert_eq!(
            handle.to_string(),
            format!("collector#{}", handle.instance())
        );
    }

    #[test]
    fn test_module_state() {
        assert!(ModuleState::Loaded.is_loaded());
        assert!(ModuleState::CleanupFailed("busy".to_string()).is_loaded());
        assert!(!ModuleState::Unloaded.is_loaded());
        assert_eq!(
            ModuleState::CleanupFailed("busy".to_string()).to_string(),
            "cleanup failed: busy"
        );
    }

    #[test]
    fn test_verdict_state() {
        assert_eq!(HealthVerdict::Healthy.state(), HealthState::Healthy);
        assert_eq!(HealthVerdict::Unhealthy.state(), HealthState::Unhealthy);

        let verdict = HealthVerdict::Failed(HealthCheckError::Failed(ModuleError::runtime("boom")));
        assert!(!verdict.is_healthy());
        assert_eq!(verdict.to_string(), "health check raised: Runtime error: boom");
    }

    #[test]
    fn test_module_state_serialization() {
        let json = serde_json::to_value(ModuleState::CleanupFailed("busy".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({"state": "cleanup_failed", "error": "busy"}));

        let json = serde_json::to_value(ModuleState::Loaded).unwrap();
        assert_eq!(json, serde_json::json!({"state": "loaded"}));
    }
}
