//! Service Lifecycle
//!
//! Every registered service moves through a fixed sequence of states:
//!
//! ```text
//!     +-------------+
//!     | Registered  |  (constructed, not yet visible)
//!     +------+------+
//!            |
//!            v
//!     +------+------+
//!     | Initializing|  (init(ctx) called)
//!     +------+------+
//!            |
//!     +------+------+
//!     |             |
//!     v             v
//! +---+---+    +----+----+
//! | Ready |    |  Failed |  (never becomes visible)
//! +---+---+    +---------+
//!     |
//!     v
//! +---+------+
//! | Retiring |  (removed from the snapshot, draining in-flight calls)
//! +---+------+
//!     |
//!     v
//! +---+------+
//! | Disposed |
//! +----------+
//! ```
//!
//! This module also defines the [`PluginContext`] capability bundle handed to
//! a provider at init, and the per-service call statistics.

use std::sync::Arc;
use std::time::Instant;

use crate::core::http::HttpService;
use crate::core::i18n::Localizer;
use crate::settings::{ScopedSettings, SettingsStore};

/// Service lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Registered,
    Initializing,
    Ready,
    Retiring,
    Disposed,
    Failed,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceState::Registered => write!(f, "registered"),
            ServiceState::Initializing => write!(f, "initializing"),
            ServiceState::Ready => write!(f, "ready"),
            ServiceState::Retiring => write!(f, "retiring"),
            ServiceState::Disposed => write!(f, "disposed"),
            ServiceState::Failed => write!(f, "failed"),
        }
    }
}

impl ServiceState {
    /// Check if the service can accept dispatches
    pub fn can_process(&self) -> bool {
        matches!(self, ServiceState::Ready)
    }

    /// Check if the provider has been (or is being) released
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceState::Disposed | ServiceState::Failed)
    }
}

/// Host capabilities handed to a provider at init
///
/// This is the only way a provider reaches the outside world. There is no
/// ambient global to fall back on.
#[derive(Clone)]
pub struct PluginContext {
    pub plugin_id: String,
    pub service_id: String,
    pub http: Arc<dyn HttpService>,
    /// Settings restricted to this service's blob
    pub settings: ScopedSettings,
    pub localizer: Arc<dyn Localizer>,
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("plugin_id", &self.plugin_id)
            .field("service_id", &self.service_id)
            .finish_non_exhaustive()
    }
}

/// Shared host capabilities from which per-service contexts are cut
#[derive(Clone)]
pub struct HostContext {
    pub http: Arc<dyn HttpService>,
    pub store: Arc<SettingsStore>,
    pub localizer: Arc<dyn Localizer>,
}

impl HostContext {
    pub fn new(
        http: Arc<dyn HttpService>,
        store: Arc<SettingsStore>,
        localizer: Arc<dyn Localizer>,
    ) -> Self {
        Self {
            http,
            store,
            localizer,
        }
    }

    /// Context for one service
    pub fn context_for(&self, plugin_id: &str, service_id: &str) -> PluginContext {
        PluginContext {
            plugin_id: plugin_id.to_string(),
            service_id: service_id.to_string(),
            http: Arc::clone(&self.http),
            settings: self.store.scoped(service_id),
            localizer: Arc::clone(&self.localizer),
        }
    }
}

/// Call statistics for one service
#[derive(Debug, Clone)]
pub struct ServiceStats {
    /// Time when the service was registered
    pub loaded_at: Instant,

    /// Time of the last completed dispatch
    pub last_active: Instant,

    /// Number of successful dispatches
    pub call_count: u64,

    /// Number of failed dispatches
    pub error_count: u64,

    pub last_error: Option<String>,
}

impl ServiceStats {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            loaded_at: now,
            last_active: now,
            call_count: 0,
            error_count: 0,
            last_error: None,
        }
    }

    pub fn record_success(&mut self) {
        self.last_active = Instant::now();
        self.call_count += 1;
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.last_active = Instant::now();
        self.error_count += 1;
        self.last_error = Some(error.into());
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.loaded_at.elapsed()
    }

    pub fn idle_time(&self) -> std::time::Duration {
        self.last_active.elapsed()
    }
}

impl Default for ServiceStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_state_display() {
        assert_eq!(format!("{}", ServiceState::Ready), "ready");
        assert_eq!(format!("{}", ServiceState::Retiring), "retiring");
    }

    #[test]
    fn test_service_state_predicates() {
        assert!(ServiceState::Ready.can_process());
        assert!(!ServiceState::Retiring.can_process());
        assert!(ServiceState::Disposed.is_terminal());
        assert!(!ServiceState::Initializing.is_terminal());
    }

    #[test]
    fn test_service_stats() {
        let mut stats = ServiceStats::new();
        assert_eq!(stats.call_count, 0);

        stats.record_success();
        assert_eq!(stats.call_count, 1);

        stats.record_error("timeout");
        assert_eq!(stats.error_count, 1);
        assert_eq!(stats.last_error.as_deref(), Some("timeout"));
    }
}
