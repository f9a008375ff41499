//! Capability routing for stored history
//!
//! Given a history record, decide how the UI should present it by asking the
//! live registry what the owning service can do. The decision is an explicit
//! capability lookup; provider types are never inspected.

use std::sync::Arc;

use super::capabilities::Capability;
use super::registry::ServiceManager;
use crate::core::history::HistoryRecord;

/// Presentation path for a history record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    Dictionary,
    Translate,
    Speech,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Render(RenderPath),
    /// The owning service was removed, disabled or no longer matches
    Unavailable,
}

pub struct CapabilityRouter {
    registry: Arc<ServiceManager>,
}

impl CapabilityRouter {
    pub fn new(registry: Arc<ServiceManager>) -> Self {
        Self { registry }
    }

    pub fn route_for(&self, record: &HistoryRecord) -> Route {
        self.route(&record.plugin_id, &record.service_id)
    }

    /// Route by identity; a plugin implementing both dictionary and translate
    /// renders through the dictionary path
    pub fn route(&self, plugin_id: &str, service_id: &str) -> Route {
        let Some(service) = self.registry.find(plugin_id, service_id) else {
            tracing::debug!(
                plugin_id = %plugin_id,
                service_id = %service_id,
                "History owner unavailable"
            );
            return Route::Unavailable;
        };
        if !service.is_enabled() {
            return Route::Unavailable;
        }

        let path = if service.supports(Capability::Dictionary) {
            RenderPath::Dictionary
        } else if service.supports(Capability::Translate) {
            RenderPath::Translate
        } else if service.supports(Capability::TextToSpeech) {
            RenderPath::Speech
        } else {
            return Route::Unavailable;
        };
        Route::Render(path)
    }
}
