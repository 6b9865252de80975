//! Supervisor events and the sinks that receive them
//!
//! The registry and supervisor never log through ambient state of their own;
//! they emit [`SupervisorEvent`]s into an injected [`EventSink`]. The default
//! [`TracingSink`] turns each event into a `tracing` record.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;
use tracing::{debug, error, info, warn, Level};
use uuid::Uuid;

/// Something the supervisor or registry did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// `start()` entered the running state
    Started,

    /// `stop()` was requested
    Stopping,

    /// Monitoring loop exited
    Stopped,

    /// Initial module set failed to load; the supervisor did not start
    InitialLoadFailed {
        /// Error description
        error: String,
    },

    /// A module was resolved and registered
    ModuleLoaded {
        /// Module name
        module: String,
        /// Instance id
        instance: Uuid,
    },

    /// `load` was answered from the cache
    CacheHit {
        /// Module name
        module: String,
    },

    /// Resolution failed
    LoadFailed {
        /// Module name
        module: String,
        /// Error description
        error: String,
    },

    /// A module was removed from the registry
    ModuleUnloaded {
        /// Module name
        module: String,
        /// Instance id
        instance: Uuid,
    },

    /// Unload was refused or cleanup raised
    UnloadFailed {
        /// Module name
        module: String,
        /// Error description
        error: String,
    },

    /// A module was replaced by a fresh instance
    ModuleReloaded {
        /// Module name
        module: String,
        /// New instance id
        instance: Uuid,
    },

    /// Reload failed part way
    ReloadFailed {
        /// Module name
        module: String,
        /// Error description
        error: String,
    },

    /// A health evaluation did not come back healthy
    ModuleUnhealthy {
        /// Module name
        module: String,
        /// Verdict description
        reason: String,
    },

    /// Recovery failed and the module left the active set
    ModuleDropped {
        /// Module name
        module: String,
    },

    /// One monitoring pass finished
    PassCompleted {
        /// Pass number, starting at 1
        pass: u64,
        /// Modules evaluated
        checked: usize,
        /// Modules found healthy
        healthy: usize,
        /// Modules reloaded successfully
        recovered: usize,
    },
}

impl SupervisorEvent {
    /// Severity of this event
    pub fn level(&self) -> Level {
        match self {
            Self::CacheHit { .. } | Self::PassCompleted { .. } => Level::DEBUG,
            Self::Started
            | Self::Stopping
            | Self::Stopped
            | Self::ModuleLoaded { .. }
            | Self::ModuleUnloaded { .. }
            | Self::ModuleReloaded { .. } => Level::INFO,
            Self::ModuleUnhealthy { .. } | Self::ModuleDropped { .. } => Level::WARN,
            Self::InitialLoadFailed { .. }
            | Self::LoadFailed { .. }
            | Self::UnloadFailed { .. }
            | Self::ReloadFailed { .. } => Level::ERROR,
        }
    }

    /// Module this event concerns, if any
    pub fn module(&self) -> Option<&str> {
        match self {
            Self::ModuleLoaded { module, .. }
            | Self::CacheHit { module }
            | Self::LoadFailed { module, .. }
            | Self::ModuleUnloaded { module, .. }
            | Self::UnloadFailed { module, .. }
            | Self::ModuleReloaded { module, .. }
            | Self::ReloadFailed { module, .. }
            | Self::ModuleUnhealthy { module, .. }
            | Self::ModuleDropped { module } => Some(module),
            Self::Started
            | Self::Stopping
            | Self::Stopped
            | Self::InitialLoadFailed { .. }
            | Self::PassCompleted { .. } => None,
        }
    }
}

/// Receiver of supervisor events
pub trait EventSink: Send + Sync + fmt::Debug {
    /// Record one event
    fn emit(&self, event: &SupervisorEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &SupervisorEvent) {
        match event {
            SupervisorEvent::Started => info!("Supervisor started"),
            SupervisorEvent::Stopping => info!("Supervisor stopping"),
            SupervisorEvent::Stopped => info!("Supervisor stopped"),
            SupervisorEvent::InitialLoadFailed { error } => {
                error!(error = %error, "Failed to load initial modules")
            }
            SupervisorEvent::ModuleLoaded { module, instance } => {
                info!(module = %module, instance = %instance, "Module loaded")
            }
            SupervisorEvent::CacheHit { module } => {
                debug!(module = %module, "Module served from cache")
            }
            SupervisorEvent::LoadFailed { module, error } => {
                error!(module = %module, error = %error, "Failed to load module")
            }
            SupervisorEvent::ModuleUnloaded { module, instance } => {
                info!(module = %module, instance = %instance, "Module unloaded")
            }
            SupervisorEvent::UnloadFailed { module, error } => {
                error!(module = %module, error = %error, "Failed to unload module")
            }
            SupervisorEvent::ModuleReloaded { module, instance } => {
                info!(module = %module, instance = %instance, "Module reloaded")
            }
            SupervisorEvent::ReloadFailed { module, error } => {
                error!(module = %module, error = %error, "Failed to reload module")
            }
            SupervisorEvent::ModuleUnhealthy { module, reason } => {
                warn!(module = %module, reason = %reason, "Module is unhealthy, unloading")
            }
            SupervisorEvent::ModuleDropped { module } => {
                warn!(module = %module, "Recovery failed, continuing without module")
            }
            SupervisorEvent::PassCompleted {
                pass,
                checked,
                healthy,
                recovered,
            } => debug!(
                pass = pass,
                checked = checked,
                healthy = healthy,
                recovered = recovered,
                "Monitoring pass completed"
            ),
        }
    }
}

/// An event with the time it was recorded
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    /// When the event was emitted
    pub timestamp: DateTime<Utc>,

    /// The event
    pub event: SupervisorEvent,
}

/// Keeps every event in memory, in emission order
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far
    pub fn events(&self) -> Vec<SupervisorEvent> {
        self.events.lock().iter().map(|r| r.event.clone()).collect()
    }

    /// All events recorded so far, with timestamps
    pub fn records(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Events concerning one module
    pub fn events_for(&self, module: &str) -> Vec<SupervisorEvent> {
        self.events
            .lock()
            .iter()
            .filter(|r| r.event.module() == Some(module))
            .map(|r| r.event.clone())
            .collect()
    }

    /// Forget recorded events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &SupervisorEvent) {
        self.events.lock().push(RecordedEvent {
            timestamp: Utc::now(),
            event: event.clone(),
        });
    }
}

/// Sends each event to several sinks in order
#[derive(Debug, Default)]
pub struct FanoutSink {
    sinks: Vec<std::sync::Arc<dyn EventSink>>,
}

impl FanoutSink {
    /// Create an empty fan-out
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn with(mut self, sink: std::sync::Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &SupervisorEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_event_levels() {
        assert_eq!(SupervisorEvent::Started.level(), Level::INFO);
        assert_eq!(
            SupervisorEvent::ModuleUnhealthy {
                module: "m".to_string(),
                reason: "r".to_string()
            }
            .level(),
            Level::WARN
        );
        assert_eq!(
            SupervisorEvent::ReloadFailed {
                module: "m".to_string(),
                error: "e".to_string()
            }
            .level(),
            Level::ERROR
        );
        assert_eq!(
            SupervisorEvent::CacheHit {
                module: "m".to_string()
            }
            .level(),
            Level::DEBUG
        );
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.emit(&SupervisorEvent::Started);
        sink.emit(&SupervisorEvent::ModuleDropped {
            module: "a".to_string(),
        });
        sink.emit(&SupervisorEvent::Stopped);

        assert_eq!(
            sink.events(),
            vec![
                SupervisorEvent::Started,
                SupervisorEvent::ModuleDropped {
                    module: "a".to_string()
                },
                SupervisorEvent::Stopped,
            ]
        );
        assert_eq!(sink.events_for("a").len(), 1);
        assert!(sink.events_for("b").is_empty());

        let records = sink.records();
        assert!(records[0].timestamp <= records[2].timestamp);

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_fanout_sink() {
        let first = Arc::new(MemorySink::new());
        let second = Arc::new(MemorySink::new());
        let fanout = FanoutSink::new()
            .with(first.clone())
            .with(second.clone())
            .with(Arc::new(TracingSink));

        fanout.emit(&SupervisorEvent::Stopping);

        assert_eq!(first.events(), vec![SupervisorEvent::Stopping]);
        assert_eq!(second.events(), vec![SupervisorEvent::Stopping]);
    }
}
