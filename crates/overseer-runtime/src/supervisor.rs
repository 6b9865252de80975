//! Supervision loop

use crate::error::{LoadError, Result, SupervisorError, UnloadError};
use crate::events::{EventSink, SupervisorEvent};
use crate::handle::ModuleHandle;
use crate::registry::{ModuleRegistry, DEFAULT_HEALTH_CHECK_TIMEOUT};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

/// Supervisor configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Idle time between two passes
    pub interval: Duration,

    /// Upper bound for one module's health check
    pub health_check_timeout: Duration,

    /// Modules loaded by `start()`, in order
    pub initial_modules: Vec<String>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            health_check_timeout: DEFAULT_HEALTH_CHECK_TIMEOUT,
            initial_modules: vec!["data_collector".to_string(), "api_wrapper".to_string()],
        }
    }
}

impl SupervisorConfig {
    /// Set the pass interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the health check timeout
    pub fn with_health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self
    }

    /// Set the initial module set
    pub fn with_initial_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.initial_modules = modules.into_iter().map(Into::into).collect();
        self
    }
}

/// Cloneable control over a supervisor's running flag
///
/// Stopping is cooperative: the loop sees the flag at the next pass
/// boundary. A stop also cuts the idle wait short.
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
    sink: Arc<dyn EventSink>,
}

impl SupervisorHandle {
    fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
            sink,
        }
    }

    /// Check if the supervisor is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the supervisor to stop after its current pass
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_waiters();
        self.sink.emit(&SupervisorEvent::Stopping);
    }

    /// Set the flag; returns whether it was already set
    fn begin(&self) -> bool {
        self.running.swap(true, Ordering::SeqCst)
    }

    fn reset(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait `interval`, or less if stopped meanwhile
    ///
    /// `notify_waiters` leaves no permit behind, so the waiter is registered
    /// before the flag is read. A stop landing between the two is seen by
    /// one or the other.
    async fn idle(&self, interval: Duration) {
        let notified = self.wake.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if !self.is_running() {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = notified => {}
        }
    }
}

/// Outcome of one monitoring pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Modules evaluated
    pub checked: usize,

    /// Modules found healthy
    pub healthy: usize,

    /// Unhealthy modules replaced by a fresh instance
    pub recovered: usize,

    /// Unhealthy modules whose unload failed; kept as they were
    pub unload_failures: usize,

    /// Unhealthy modules whose reload failed; dropped from the active set
    pub reload_failures: usize,
}

impl PassReport {
    /// Check if every module was healthy
    pub fn all_healthy(&self) -> bool {
        self.checked == self.healthy
    }
}

/// Module lifecycle supervisor
///
/// Owns the registry and the ordered set of active modules, and runs the
/// health-check/recovery cycle until stopped.
#[derive(Debug)]
pub struct Supervisor {
    registry: ModuleRegistry,
    config: SupervisorConfig,
    active: Vec<ModuleHandle>,
    initialized: bool,
    passes: u64,
    control: SupervisorHandle,
}

impl Supervisor {
    /// Create a supervisor over `registry`
    ///
    /// Events go to the registry's sink, so a supervisor and its registry
    /// always log to the same place.
    pub fn new(registry: ModuleRegistry, config: SupervisorConfig) -> Self {
        let control = SupervisorHandle::new(registry.sink().clone());
        Self::with_control(registry, config, control)
    }

    fn with_control(
        registry: ModuleRegistry,
        config: SupervisorConfig,
        control: SupervisorHandle,
    ) -> Self {
        let registry = registry.with_health_check_timeout(config.health_check_timeout);
        Self {
            registry,
            config,
            active: Vec::new(),
            initialized: false,
            passes: 0,
            control,
        }
    }

    /// Get a handle that can stop this supervisor from another task
    pub fn handle(&self) -> SupervisorHandle {
        self.control.clone()
    }

    /// Check if the supervisor is running
    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    /// Ask the supervisor to stop after its current pass
    pub fn stop(&self) {
        self.control.stop();
    }

    /// Get the registry
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Get the registry mutably
    pub fn registry_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.registry
    }

    /// Get the configuration
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Active modules, in the order they are checked
    pub fn active_modules(&self) -> &[ModuleHandle] {
        &self.active
    }

    /// Number of passes completed so far
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Load the initial modules and supervise them until stopped
    ///
    /// Returns immediately if already running. A failed initial load is
    /// fatal: it is returned and no pass runs. Modules loaded before the
    /// failure stay registered. Once the initial set has loaded, later calls
    /// resume monitoring without loading it again.
    pub async fn start(&mut self) -> Result<()> {
        if self.control.begin() {
            debug!("Supervisor already running");
            return Ok(());
        }

        self.emit(SupervisorEvent::Started);

        if !self.initialized {
            if let Err(e) = self.load_initial_modules() {
                self.control.reset();
                self.emit(SupervisorEvent::InitialLoadFailed {
                    error: e.to_string(),
                });
                return Err(SupervisorError::InitialLoad(e));
            }
            self.initialized = true;
        }

        self.monitor().await;

        self.emit(SupervisorEvent::Stopped);
        Ok(())
    }

    fn load_initial_modules(&mut self) -> std::result::Result<(), LoadError> {
        for name in &self.config.initial_modules {
            let handle = self.registry.load(name)?;
            if !self.active.contains(&handle) {
                self.active.push(handle);
            }
        }
        Ok(())
    }

    async fn monitor(&mut self) {
        while self.control.is_running() {
            self.run_pass().await;
            self.control.idle(self.config.interval).await;
        }
    }

    /// Run one pass over the active modules
    ///
    /// Unhealthy modules are unloaded and reloaded. Failures are logged and
    /// contained; the pass always visits every module.
    pub async fn run_pass(&mut self) -> PassReport {
        let mut report = PassReport::default();
        let mut next = Vec::with_capacity(self.active.len());

        for handle in std::mem::take(&mut self.active) {
            report.checked += 1;

            let verdict = self.registry.check_health(&handle).await;
            if verdict.is_healthy() {
                report.healthy += 1;
                next.push(handle);
                continue;
            }

            self.emit(SupervisorEvent::ModuleUnhealthy {
                module: handle.name().to_string(),
                reason: verdict.to_string(),
            });

            match self.registry.unload(&handle).await {
                Ok(()) | Err(UnloadError::NotLoaded { .. }) => {}
                Err(UnloadError::Cleanup { .. }) => {
                    report.unload_failures += 1;
                    next.push(handle);
                    continue;
                }
            }

            match self.registry.reload(handle.name()).await {
                Ok(fresh) => {
                    report.recovered += 1;
                    next.push(fresh);
                }
                Err(_) => {
                    report.reload_failures += 1;
                    self.emit(SupervisorEvent::ModuleDropped {
                        module: handle.name().to_string(),
                    });
                }
            }
        }

        self.active = next;
        self.passes += 1;
        self.emit(SupervisorEvent::PassCompleted {
            pass: self.passes,
            checked: report.checked,
            healthy: report.healthy,
            recovered: report.recovered,
        });

        report
    }

    /// Stop and unload every module
    ///
    /// The next `start()` loads the initial set again.
    pub async fn shutdown(&mut self) -> Vec<UnloadError> {
        if self.control.is_running() {
            self.control.stop();
        }
        self.active.clear();
        self.initialized = false;
        self.registry.unload_all().await
    }

    fn emit(&self, event: SupervisorEvent) {
        self.registry.sink().emit(&event);
    }
}
