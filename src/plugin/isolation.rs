//! Plugin Isolation and Panic Safety
//!
//! Provider code runs behind `catch_unwind`. A panic inside `init`, a
//! capability call or a constructor is converted to an error instead of
//! unwinding into the registry or the dispatcher.
//!
//! `catch_unwind` only catches panics, not aborts; the crate must not be
//! built with `panic = "abort"`.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, UnwindSafe, catch_unwind};

/// Plugin lifecycle and registry error
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Plugin panicked during execution
    #[error("Plugin panicked: {0}")]
    Panic(String),

    /// Plugin initialization failed
    #[error("Plugin initialization failed: {0}")]
    InitializationFailed(String),

    /// Plugin configuration error
    #[error("Plugin configuration error: {0}")]
    ConfigurationError(String),

    /// No plugin registered under this id
    #[error("Plugin not found: {0}")]
    NotFound(String),

    /// No service registered under this id
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// A service with this id is already registered
    #[error("Duplicate service id: {0}")]
    DuplicateService(String),

    /// Declared capabilities disagree with the accessors the plugin exposes
    #[error("Plugin '{plugin_id}' declares {declared} but implements {implemented}")]
    CapabilityMismatch {
        plugin_id: String,
        declared: String,
        implemented: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] crate::errors::StorageError),
}

/// Call a synchronous plugin function, converting a panic into
/// [`PluginError::Panic`]
pub fn call_plugin_safely_value<F, T>(plugin_fn: F) -> Result<T, PluginError>
where
    F: FnOnce() -> T + UnwindSafe,
{
    match catch_unwind(plugin_fn) {
        Ok(result) => Ok(result),
        Err(panic_info) => {
            let msg = extract_panic_message(&panic_info);
            tracing::error!(message = %msg, "Plugin panicked");
            Err(PluginError::Panic(msg))
        }
    }
}

/// Await a plugin future, converting a panic during polling into the
/// message it carried
///
/// Only the direct poll path is covered; panics in tasks the plugin spawns
/// itself are not.
pub async fn catch_plugin_panic<Fut, T>(future: Fut) -> Result<T, String>
where
    Fut: Future<Output = T>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(value) => Ok(value),
        Err(panic_info) => {
            let msg = extract_panic_message(&panic_info);
            tracing::error!(message = %msg, "Plugin panicked during async execution");
            Err(msg)
        }
    }
}

/// Extract a human-readable message from a panic payload
fn extract_panic_message(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic (non-string payload)".to_string()
    }
}
