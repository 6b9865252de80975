//! Name-to-module resolution

use crate::error::LoadError;
use overseer_module_api::Module;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves a module name into a fresh module instance
pub trait ModuleResolver: Send + Sync + fmt::Debug {
    /// Build a new instance of the named module
    fn resolve(&self, name: &str) -> Result<Box<dyn Module>, LoadError>;
}

/// Factory producing a module from its settings block
pub type ModuleFactory =
    Arc<dyn Fn(&serde_json::Value) -> overseer_module_api::Result<Box<dyn Module>> + Send + Sync>;

/// Catalog of named module factories, populated at startup
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    factories: HashMap<String, ModuleFactory>,
    settings: HashMap<String, serde_json::Value>,
}

impl fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleCatalog")
            .field("modules", &self.names())
            .field("configured", &self.settings.len())
            .finish()
    }
}

impl ModuleCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous one
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&serde_json::Value) -> overseer_module_api::Result<Box<dyn Module>>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            warn!(module = %name, "Replacing previously registered module factory");
        } else {
            debug!(module = %name, "Module factory registered");
        }
        self
    }

    /// Builder-style variant of [`register`](Self::register)
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&serde_json::Value) -> overseer_module_api::Result<Box<dyn Module>>
            + Send
            + Sync
            + 'static,
    {
        self.register(name, factory);
        self
    }

    /// Set the settings block passed to the named factory
    pub fn configure(&mut self, name: impl Into<String>, settings: serde_json::Value) -> &mut Self {
        self.settings.insert(name.into(), settings);
        self
    }

    /// Check if a factory is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered module names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered factories
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl ModuleResolver for ModuleCatalog {
    fn resolve(&self, name: &str) -> Result<Box<dyn Module>, LoadError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| LoadError::unknown(name))?;

        let null = serde_json::Value::Null;
        let settings = self.settings.get(name).unwrap_or(&null);

        let module = factory(settings).map_err(|e| LoadError::instantiate(name, e))?;

        if module.name() != name {
            warn!(
                module = %name,
                reported = %module.name(),
                "Module reports a different name than it was registered under"
            );
        }

        Ok(module)
    }
}
