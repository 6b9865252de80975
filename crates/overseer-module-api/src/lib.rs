//! # Overseer Module API
//!
//! The contract a module implements to be supervised by Overseer.
//!
//! ## Capabilities
//!
//! - **Health check** ([`HealthCheckable`]): optional. A module without one is
//!   classified unhealthy by the supervisor.
//! - **Cleanup** ([`Cleanable`]): optional. A module without one unloads
//!   without any teardown step.
//!
//! ## Example
//!
//! ```rust,no_run
//! use overseer_module_api::prelude::*;
//!
//! #[derive(Debug)]
//! struct Heartbeat;
//!
//! impl Module for Heartbeat {
//!     fn name(&self) -> &str { "heartbeat" }
//!
//!     fn as_health_checkable(&self) -> Option<&dyn HealthCheckable> {
//!         Some(self)
//!     }
//! }
//!
//! #[async_trait]
//! impl HealthCheckable for Heartbeat {
//!     async fn health_check(&self) -> Result<bool, ModuleError> {
//!         Ok(true)
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod module;

pub use error::{ModuleError, Result};
pub use module::{Capabilities, Cleanable, HealthCheckable, Module, ModuleMetadata};

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::error::ModuleError;
    pub use crate::module::{Capabilities, Cleanable, HealthCheckable, Module, ModuleMetadata};
    pub use async_trait::async_trait;
}
