//! Scripted modules for unit tests

use crate::error::LoadError;
use crate::resolver::ModuleResolver;
use crate::supervisor::SupervisorHandle;
use async_trait::async_trait;
use overseer_module_api::{Cleanable, HealthCheckable, Module, ModuleError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HealthScript {
    Missing,
    Fixed(bool),
    Raising,
    /// The first `n` instances report unhealthy, later ones healthy
    UnhealthyFirst(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct Behavior {
    health: HealthScript,
    cleanup: Option<bool>,
    max_resolutions: Option<usize>,
    delay: Option<Duration>,
    stop_on_check: Option<SupervisorHandle>,
    /// Set once a one-shot stop has fired
    stop_fired: Option<Arc<AtomicBool>>,
}

impl Behavior {
    fn with_health(health: HealthScript) -> Self {
        Self {
            health,
            cleanup: Some(true),
            max_resolutions: None,
            delay: None,
            stop_on_check: None,
            stop_fired: None,
        }
    }

    pub(crate) fn healthy() -> Self {
        Self::with_health(HealthScript::Fixed(true))
    }

    pub(crate) fn unhealthy() -> Self {
        Self::with_health(HealthScript::Fixed(false))
    }

    pub(crate) fn raising() -> Self {
        Self::with_health(HealthScript::Raising)
    }

    pub(crate) fn unhealthy_first(n: usize) -> Self {
        Self::with_health(HealthScript::UnhealthyFirst(n))
    }

    /// No health check and no cleanup
    pub(crate) fn bare() -> Self {
        Self {
            cleanup: None,
            ..Self::with_health(HealthScript::Missing)
        }
    }

    pub(crate) fn failing_cleanup(mut self) -> Self {
        self.cleanup = Some(false);
        self
    }

    pub(crate) fn resolves_times(mut self, n: usize) -> Self {
        self.max_resolutions = Some(n);
        self
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn stopping(mut self, handle: SupervisorHandle) -> Self {
        self.stop_on_check = Some(handle);
        self
    }

    /// Stop the supervisor from the first health check only
    pub(crate) fn stopping_once(mut self, handle: SupervisorHandle) -> Self {
        self.stop_on_check = Some(handle);
        self.stop_fired = Some(Arc::new(AtomicBool::new(false)));
        self
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Stats {
    resolutions: usize,
    cleanups: usize,
    checks: usize,
}

type SharedStats = Arc<Mutex<HashMap<String, Stats>>>;

#[derive(Debug, Default)]
pub(crate) struct ScriptedResolver {
    behaviors: HashMap<String, Behavior>,
    stats: SharedStats,
}

impl ScriptedResolver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, name: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(name.to_string(), behavior);
        self
    }

    fn stat(&self, name: &str) -> Stats {
        self.stats.lock().get(name).copied().unwrap_or_default()
    }

    pub(crate) fn resolutions(&self, name: &str) -> usize {
        self.stat(name).resolutions
    }

    pub(crate) fn cleanups(&self, name: &str) -> usize {
        self.stat(name).cleanups
    }

    pub(crate) fn checks(&self, name: &str) -> usize {
        self.stat(name).checks
    }
}

impl ModuleResolver for ScriptedResolver {
    fn resolve(&self, name: &str) -> Result<Box<dyn Module>, LoadError> {
        let behavior = self
            .behaviors
            .get(name)
            .ok_or_else(|| LoadError::unknown(name))?;

        let mut stats = self.stats.lock();
        let stat = stats.entry(name.to_string()).or_default();
        if behavior.max_resolutions.is_some_and(|max| stat.resolutions >= max) {
            return Err(LoadError::instantiate(
                name,
                ModuleError::init("resolution budget exhausted"),
            ));
        }
        stat.resolutions += 1;

        Ok(Box::new(ScriptedModule {
            name: name.to_string(),
            instance: stat.resolutions,
            behavior: behavior.clone(),
            stats: self.stats.clone(),
        }))
    }
}

#[derive(Debug)]
struct ScriptedModule {
    name: String,
    instance: usize,
    behavior: Behavior,
    stats: SharedStats,
}

impl Module for ScriptedModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_health_checkable(&self) -> Option<&dyn HealthCheckable> {
        match self.behavior.health {
            HealthScript::Missing => None,
            _ => Some(self),
        }
    }

    fn as_cleanable(&mut self) -> Option<&mut dyn Cleanable> {
        match self.behavior.cleanup {
            Some(_) => Some(self),
            None => None,
        }
    }
}

#[async_trait]
impl HealthCheckable for ScriptedModule {
    async fn health_check(&self) -> overseer_module_api::Result<bool> {
        self.stats.lock().entry(self.name.clone()).or_default().checks += 1;

        if let Some(handle) = &self.behavior.stop_on_check {
            let first = self
                .behavior
                .stop_fired
                .as_ref()
                .map_or(true, |fired| !fired.swap(true, Ordering::SeqCst));
            if first {
                handle.stop();
            }
        }
        if let Some(delay) = self.behavior.delay {
            tokio::time::sleep(delay).await;
        }

        match self.behavior.health {
            HealthScript::Fixed(healthy) => Ok(healthy),
            HealthScript::Raising => Err(ModuleError::health_check("probe exploded")),
            HealthScript::UnhealthyFirst(n) => Ok(self.instance > n),
            HealthScript::Missing => Err(ModuleError::health_check("no health check")),
        }
    }
}

#[async_trait]
impl Cleanable for ScriptedModule {
    async fn cleanup(&mut self) -> overseer_module_api::Result<()> {
        if self.behavior.cleanup == Some(false) {
            return Err(ModuleError::cleanup("resource still busy"));
        }
        self.stats.lock().entry(self.name.clone()).or_default().cleanups += 1;
        Ok(())
    }
}
