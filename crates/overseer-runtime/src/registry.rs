//! Module registry and cache

use crate::error::{HealthCheckError, LoadError, ReloadError, UnloadError};
use crate::events::{EventSink, SupervisorEvent, TracingSink};
use crate::handle::{HealthState, HealthVerdict, ModuleHandle, ModuleInfo, ModuleState};
use crate::resolver::ModuleResolver;
use chrono::{DateTime, Utc};
use overseer_module_api::{Capabilities, Module};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default upper bound for a single health check
pub const DEFAULT_HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Registry of loaded modules
///
/// The registry is the single owner of every loaded module and the single
/// point of load and unload. Its cache and its loaded set are one map, so an
/// entry is either present in both or in neither. Callers hold
/// [`ModuleHandle`]s, never the modules themselves.
#[derive(Debug)]
pub struct ModuleRegistry {
    resolver: Arc<dyn ModuleResolver>,
    entries: HashMap<String, ModuleEntry>,
    sink: Arc<dyn EventSink>,
    health_check_timeout: Duration,
}

#[derive(Debug)]
struct ModuleEntry {
    handle: ModuleHandle,
    module: Box<dyn Module>,
    state: ModuleState,
    health: HealthState,
    capabilities: Capabilities,
    loaded_at: DateTime<Utc>,
    last_checked: Option<DateTime<Utc>>,
}

impl ModuleEntry {
    fn info(&self) -> ModuleInfo {
        ModuleInfo {
            name: self.handle.name().to_string(),
            instance: self.handle.instance(),
            version: self.module.version().to_string(),
            state: self.state.clone(),
            health: self.health,
            capabilities: self.capabilities,
            loaded_at: self.loaded_at,
            last_checked: self.last_checked,
        }
    }
}

impl ModuleRegistry {
    /// Create a registry that resolves names through `resolver`
    pub fn new(resolver: Arc<dyn ModuleResolver>) -> Self {
        Self {
            resolver,
            entries: HashMap::new(),
            sink: Arc::new(TracingSink),
            health_check_timeout: DEFAULT_HEALTH_CHECK_TIMEOUT,
        }
    }

    /// Send events to `sink` instead of the default tracing sink
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Set the health check timeout
    pub fn with_health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self
    }

    /// Upper bound applied to each health check
    pub fn health_check_timeout(&self) -> Duration {
        self.health_check_timeout
    }

    pub(crate) fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    /// Load a module by name
    ///
    /// Answers from the cache when the module is already loaded; only a miss
    /// reaches the resolver.
    pub fn load(&mut self, name: &str) -> Result<ModuleHandle, LoadError> {
        if let Some(entry) = self.entries.get(name) {
            self.sink.emit(&SupervisorEvent::CacheHit {
                module: name.to_string(),
            });
            return Ok(entry.handle.clone());
        }

        let mut module = match self.resolver.resolve(name) {
            Ok(module) => module,
            Err(e) => {
                self.sink.emit(&SupervisorEvent::LoadFailed {
                    module: name.to_string(),
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        let handle = ModuleHandle::new(name);
        let capabilities = Capabilities::of(module.as_mut());
        debug!(module = %name, capabilities = %capabilities, "Module capabilities");

        self.entries.insert(
            name.to_string(),
            ModuleEntry {
                handle: handle.clone(),
                module,
                state: ModuleState::Loaded,
                health: HealthState::Unknown,
                capabilities,
                loaded_at: Utc::now(),
                last_checked: None,
            },
        );

        self.sink.emit(&SupervisorEvent::ModuleLoaded {
            module: name.to_string(),
            instance: handle.instance(),
        });

        Ok(handle)
    }

    /// Unload the module instance behind `handle`
    ///
    /// Runs the module's cleanup first, if it has one. A failed cleanup
    /// aborts the unload: the entry stays loaded and is marked
    /// [`ModuleState::CleanupFailed`].
    pub async fn unload(&mut self, handle: &ModuleHandle) -> Result<(), UnloadError> {
        let name = handle.name();

        let Some(entry) = self
            .entries
            .get_mut(name)
            .filter(|entry| entry.handle == *handle)
        else {
            let err = UnloadError::not_loaded(handle);
            self.sink.emit(&SupervisorEvent::UnloadFailed {
                module: name.to_string(),
                error: err.to_string(),
            });
            return Err(err);
        };

        if let Some(cleanable) = entry.module.as_cleanable() {
            if let Err(source) = cleanable.cleanup().await {
                entry.state = ModuleState::CleanupFailed(source.to_string());
                let err = UnloadError::cleanup(name, source);
                self.sink.emit(&SupervisorEvent::UnloadFailed {
                    module: name.to_string(),
                    error: err.to_string(),
                });
                return Err(err);
            }
        }

        self.entries.remove(name);
        self.sink.emit(&SupervisorEvent::ModuleUnloaded {
            module: name.to_string(),
            instance: handle.instance(),
        });

        Ok(())
    }

    /// Unload the current instance of `name` (if any), then load it fresh
    ///
    /// Partial effects are kept: if the unload succeeds and the load fails,
    /// the module stays unloaded.
    pub async fn reload(&mut self, name: &str) -> Result<ModuleHandle, ReloadError> {
        if let Some(current) = self.get(name) {
            if let Err(e) = self.unload(&current).await {
                let err = ReloadError::Unload(e);
                self.emit_reload_failed(name, &err);
                return Err(err);
            }
        }

        match self.load(name) {
            Ok(handle) => {
                self.sink.emit(&SupervisorEvent::ModuleReloaded {
                    module: name.to_string(),
                    instance: handle.instance(),
                });
                Ok(handle)
            }
            Err(e) => {
                let err = ReloadError::Load(e);
                self.emit_reload_failed(name, &err);
                Err(err)
            }
        }
    }

    fn emit_reload_failed(&self, name: &str, err: &ReloadError) {
        self.sink.emit(&SupervisorEvent::ReloadFailed {
            module: name.to_string(),
            error: err.to_string(),
        });
    }

    /// Evaluate the health of the module behind `handle`
    ///
    /// Never fails: a missing health check, an error raised by it, or a
    /// timeout all come back as [`HealthVerdict::Failed`]. A healthy verdict
    /// clears a [`ModuleState::CleanupFailed`] mark.
    pub async fn check_health(&mut self, handle: &ModuleHandle) -> HealthVerdict {
        let timeout = self.health_check_timeout;

        let Some(entry) = self
            .entries
            .get_mut(handle.name())
            .filter(|entry| entry.handle == *handle)
        else {
            return HealthVerdict::Failed(HealthCheckError::NotLoaded);
        };

        let verdict = match entry.module.as_health_checkable() {
            None => HealthVerdict::Failed(HealthCheckError::Missing),
            Some(checker) => match tokio::time::timeout(timeout, checker.health_check()).await {
                Ok(Ok(true)) => HealthVerdict::Healthy,
                Ok(Ok(false)) => HealthVerdict::Unhealthy,
                Ok(Err(e)) => HealthVerdict::Failed(HealthCheckError::Failed(e)),
                Err(_) => HealthVerdict::Failed(HealthCheckError::TimedOut(timeout)),
            },
        };

        entry.health = verdict.state();
        entry.last_checked = Some(Utc::now());
        if verdict.is_healthy() && matches!(entry.state, ModuleState::CleanupFailed(_)) {
            debug!(module = %handle.name(), "Healthy again after a failed cleanup");
            entry.state = ModuleState::Loaded;
        }
        debug!(module = %handle.name(), verdict = %verdict, "Health check evaluated");

        verdict
    }

    /// Unload every module, in name order
    ///
    /// Keeps going past failures and returns them.
    pub async fn unload_all(&mut self) -> Vec<UnloadError> {
        let mut handles: Vec<ModuleHandle> =
            self.entries.values().map(|e| e.handle.clone()).collect();
        handles.sort_by(|a, b| a.name().cmp(b.name()));

        let mut failures = Vec::new();
        for handle in handles {
            if let Err(e) = self.unload(&handle).await {
                failures.push(e);
            }
        }
        failures
    }

    /// Handle of the live instance of `name`
    pub fn get(&self, name: &str) -> Option<ModuleHandle> {
        self.entries.get(name).map(|e| e.handle.clone())
    }

    /// Check if `name` is loaded
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Check if `handle` refers to the live instance of its module
    pub fn is_live(&self, handle: &ModuleHandle) -> bool {
        self.entries
            .get(handle.name())
            .is_some_and(|e| e.handle == *handle)
    }

    /// Lifecycle state of `name`
    pub fn state(&self, name: &str) -> ModuleState {
        self.entries
            .get(name)
            .map(|e| e.state.clone())
            .unwrap_or(ModuleState::Unloaded)
    }

    /// Last observed health of `name`, if loaded
    pub fn health(&self, name: &str) -> Option<HealthState> {
        self.entries.get(name).map(|e| e.health)
    }

    /// Declared capabilities of `name`, if loaded
    pub fn capabilities(&self, name: &str) -> Option<Capabilities> {
        self.entries.get(name).map(|e| e.capabilities)
    }

    /// Snapshot of `name`, if loaded
    pub fn info(&self, name: &str) -> Option<ModuleInfo> {
        self.entries.get(name).map(ModuleEntry::info)
    }

    /// Snapshots of all loaded modules, sorted by name
    pub fn list(&self) -> Vec<ModuleInfo> {
        let mut infos: Vec<ModuleInfo> = self.entries.values().map(ModuleEntry::info).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Loaded module names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of loaded modules
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no module is loaded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
