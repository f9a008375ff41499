//! Plugin System
//!
//! Providers ("plugins") implement one or more capabilities (translate,
//! dictionary, text-to-speech). Each configured instance of a plugin is a
//! *service* with its own id, settings blob, enabled flag and rank.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          Plugin Discovery                            │
//! │  inventory::submit! ──▶ PluginCatalog (PHF aliases + DashMap)        │
//! └──────────────────────────────────┬───────────────────────────────────┘
//!                                    │ instantiate + init(ctx)
//!                                    ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  ServiceManager: ArcSwap<Vec<Arc<Service>>>, per-service lease gate  │
//! └───────────────┬──────────────────────────────────────┬───────────────┘
//!                 │ acquire(service_id)                  │ find(plugin, service)
//!                 ▼                                      ▼
//!           Dispatcher ──▶ HistorySink ──────────▶ CapabilityRouter
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use lingo_gateway::plugin::prelude::*;
//!
//! let catalog = PluginCatalog::discover();
//! let registry = Arc::new(ServiceManager::new(host));
//! let service = registry.register_from_catalog(&catalog, "microsoft-builtin", None).await?;
//!
//! let dispatcher = Dispatcher::new(Arc::clone(&registry), history, localizer);
//! let request = CapabilityRequest::new(LangEnum::Auto, LangEnum::French, "hello");
//! let outcome = dispatcher
//!     .dispatch(service.service_id(), Capability::Translate, request, &CancellationToken::new())
//!     .await;
//! ```

pub mod builtin;
pub mod capabilities;
pub mod catalog;
pub mod dispatch;
pub mod isolation;
pub mod lifecycle;
#[macro_use]
pub mod macros;
pub mod metadata;
pub mod registry;
pub mod router;

// Re-exports for convenience
pub use capabilities::{
    Capability, CapabilityRequest, CapabilitySet, DictionaryEntry, DictionaryPlugin,
    LanguageMapping, MappedRequest, Plugin, ProviderError, TranslatePlugin, TtsPlugin,
};
pub use catalog::{PluginCatalog, PluginConstructor};
pub use dispatch::{Dispatched, Dispatcher, Failure, InvocationResult, Payload};
pub use isolation::PluginError;
pub use lifecycle::{HostContext, PluginContext, ServiceState, ServiceStats};
pub use metadata::PluginManifest;
pub use registry::{Service, ServiceLease, ServiceManager, ServiceRecord};
pub use router::{CapabilityRouter, RenderPath, Route};

/// Prelude module for convenient imports
///
/// Use this for plugin development:
/// ```ignore
/// use lingo_gateway::plugin::prelude::*;
/// ```
pub mod prelude {
    pub use super::capabilities::{
        Capability, CapabilityRequest, CapabilitySet, DictionaryEntry, DictionaryPlugin,
        LanguageMapping, MappedRequest, Plugin, ProviderError, TranslatePlugin, TtsPlugin,
    };
    pub use super::catalog::{PluginCatalog, PluginConstructor};
    pub use super::dispatch::{Dispatched, Dispatcher, InvocationResult, Payload};
    pub use super::isolation::PluginError;
    pub use super::lifecycle::{HostContext, PluginContext};
    pub use super::metadata::PluginManifest;
    pub use super::registry::ServiceManager;

    // Re-export commonly needed external crates
    pub use async_trait::async_trait;
    pub use bytes::Bytes;
    pub use inventory;
    pub use std::sync::Arc;
    pub use tokio_util::sync::CancellationToken;

    // Host capabilities a provider typically touches
    pub use crate::core::http::HttpService;
    pub use crate::core::lang::LangEnum;
    pub use crate::settings::{ScopedSettings, SettingsView};
}
