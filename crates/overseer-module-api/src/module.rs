//! Core module trait and optional capabilities

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Core trait every supervised module implements
///
/// Health checking and cleanup are separate, optional capabilities. A module
/// opts into them by implementing [`HealthCheckable`] / [`Cleanable`] and
/// returning `Some(self)` from the matching accessor.
pub trait Module: Send + Sync + fmt::Debug {
    /// Module name
    fn name(&self) -> &str;

    /// Module version
    fn version(&self) -> &str {
        "0.0.0"
    }

    /// Module description
    fn description(&self) -> &str {
        ""
    }

    /// Health check capability, if the module has one
    fn as_health_checkable(&self) -> Option<&dyn HealthCheckable> {
        None
    }

    /// Cleanup capability, if the module has one
    fn as_cleanable(&mut self) -> Option<&mut dyn Cleanable> {
        None
    }

    /// Get module metadata
    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            name: self.name().to_string(),
            version: self.version().to_string(),
            description: self.description().to_string(),
        }
    }
}

/// Self-assessment of module health
#[async_trait]
pub trait HealthCheckable: Send + Sync {
    /// Returns `true` if the module considers itself healthy
    async fn health_check(&self) -> Result<bool>;
}

/// Release of module-held resources
#[async_trait]
pub trait Cleanable: Send + Sync {
    /// Release resources held by the module
    async fn cleanup(&mut self) -> Result<()>;
}

/// Capability set a module declared when it was loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Module implements [`HealthCheckable`]
    pub health_check: bool,

    /// Module implements [`Cleanable`]
    pub cleanup: bool,
}

impl Capabilities {
    /// Inspect a module's declared capabilities
    pub fn of(module: &mut dyn Module) -> Self {
        Self {
            health_check: module.as_health_checkable().is_some(),
            cleanup: module.as_cleanable().is_some(),
        }
    }

    /// Module declares no optional capability
    pub fn is_empty(&self) -> bool {
        !self.health_check && !self.cleanup
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.health_check, self.cleanup) {
            (true, true) => write!(f, "health_check+cleanup"),
            (true, false) => write!(f, "health_check"),
            (false, true) => write!(f, "cleanup"),
            (false, false) => write!(f, "none"),
        }
    }
}

/// Module metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// Module name
    pub name: String,

    /// Module version
    pub version: String,

    /// Module description
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModuleError;

    #[derive(Debug)]
    struct Bare;

    impl Module for Bare {
        fn name(&self) -> &str {
            "bare"
        }
    }

    #[derive(Debug)]
    struct Full {
        cleaned: bool,
    }

    impl Module for Full {
        fn name(&self) -> &str {
            "full"
        }

        fn version(&self) -> &str {
            "1.2.0"
        }

        fn as_health_checkable(&self) -> Option<&dyn HealthCheckable> {
            Some(self)
        }

        fn as_cleanable(&mut self) -> Option<&mut dyn Cleanable> {
            Some(self)
        }
    }

    #[async_trait]
    impl HealthCheckable for Full {
        async fn health_check(&self) -> Result<bool> {
            if self.cleaned {
                return Err(ModuleError::health_check("already cleaned"));
            }
            Ok(true)
        }
    }

    #[async_trait]
    impl Cleanable for Full {
        async fn cleanup(&mut self) -> Result<()> {
            self.cleaned = true;
            Ok(())
        }
    }

    #[test]
    fn test_capabilities_of_bare_module() {
        let mut module = Bare;
        let caps = Capabilities::of(&mut module);
        assert!(caps.is_empty());
        assert_eq!(caps.to_string(), "none");
    }

    #[test]
    fn test_capabilities_of_full_module() {
        let mut module = Full { cleaned: false };
        let caps = Capabilities::of(&mut module);
        assert!(caps.health_check);
        assert!(caps.cleanup);
        assert_eq!(caps.to_string(), "health_check+cleanup");
    }

    #[test]
    fn test_metadata_defaults() {
        let meta = Bare.metadata();
        assert_eq!(meta.name, "bare");
        assert_eq!(meta.version, "0.0.0");
        assert_eq!(meta.description, "");

        let meta = Full { cleaned: false }.metadata();
        assert_eq!(meta.version, "1.2.0");
    }

    #[tokio::test]
    async fn test_capabilities_through_trait_object() {
        let mut module: Box<dyn Module> = Box::new(Full { cleaned: false });

        let healthy = module
            .as_health_checkable()
            .expect("health check capability")
            .health_check()
            .await
            .unwrap();
        assert!(healthy);

        module
            .as_cleanable()
            .expect("cleanup capability")
            .cleanup()
            .await
            .unwrap();

        let result = module
            .as_health_checkable()
            .expect("health check capability")
            .health_check()
            .await;
        assert!(result.is_err());
    }
}
