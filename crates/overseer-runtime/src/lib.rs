//! # Overseer Runtime
//!
//! Module lifecycle supervision for Overseer.
//!
//! ## Features
//!
//! - **Module Registry**: single owner of loaded modules, cached by name
//! - **Catalog Resolution**: names resolve through startup-registered factories
//! - **Supervision Loop**: sequential health passes with unload-then-reload recovery
//! - **Event Sink**: every lifecycle step is reported to an injected sink
//!
//! ## Example
//!
//! ```rust,no_run
//! use overseer_runtime::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> overseer_runtime::Result<()> {
//! let catalog = ModuleCatalog::new();
//! // catalog.register("my_module", |settings| Ok(Box::new(MyModule::new(settings)?)));
//!
//! let registry = ModuleRegistry::new(Arc::new(catalog));
//! let mut supervisor = Supervisor::new(registry, SupervisorConfig::default());
//!
//! let handle = supervisor.handle();
//! tokio::spawn(SignalHandler::new(handle).run());
//!
//! supervisor.start().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod events;
pub mod handle;
pub mod registry;
pub mod resolver;
pub mod shutdown;
pub mod supervisor;

#[cfg(test)]
mod test_support;

pub use error::{
    HealthCheckError, LoadError, ReloadError, Result, SupervisorError, UnloadError,
};
pub use events::{EventSink, FanoutSink, MemorySink, RecordedEvent, SupervisorEvent, TracingSink};
pub use handle::{HealthState, HealthVerdict, ModuleHandle, ModuleInfo, ModuleState};
pub use registry::{ModuleRegistry, DEFAULT_HEALTH_CHECK_TIMEOUT};
pub use resolver::{ModuleCatalog, ModuleFactory, ModuleResolver};
pub use shutdown::SignalHandler;
pub use supervisor::{PassReport, Supervisor, SupervisorConfig, SupervisorHandle};

// Re-export module API types for convenience
pub use overseer_module_api::{
    Capabilities, Cleanable, HealthCheckable, Module, ModuleError, ModuleMetadata,
};

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::error::{LoadError, ReloadError, SupervisorError, UnloadError};
    pub use crate::events::{EventSink, SupervisorEvent, TracingSink};
    pub use crate::registry::ModuleRegistry;
    pub use crate::resolver::{ModuleCatalog, ModuleResolver};
    pub use crate::shutdown::SignalHandler;
    pub use crate::supervisor::{Supervisor, SupervisorConfig, SupervisorHandle};
    pub use overseer_module_api::prelude::*;
}
