//! Mock host capabilities for integration tests
//!
//! - [`MockHttp`]: recording `HttpService` with a scripted response
//! - [`test_host`]: host context over an in-memory settings store

#![allow(dead_code)]

pub mod http_mock;

use std::sync::Arc;

use lingo_gateway::core::history::MemoryHistory;
use lingo_gateway::core::i18n::StaticLocalizer;
use lingo_gateway::plugin::catalog::PluginCatalog;
use lingo_gateway::plugin::dispatch::Dispatcher;
use lingo_gateway::plugin::lifecycle::HostContext;
use lingo_gateway::plugin::registry::ServiceManager;
use lingo_gateway::settings::SettingsStore;

pub use http_mock::{MockHttp, MockReply, RecordedCall};

/// Host context whose HTTP capability is `http`
pub fn test_host(http: Arc<MockHttp>) -> HostContext {
    HostContext::new(
        http,
        Arc::new(SettingsStore::in_memory()),
        Arc::new(StaticLocalizer::english()),
    )
}

/// Registry, dispatcher and history wired to one mock transport
pub struct Harness {
    pub http: Arc<MockHttp>,
    pub catalog: PluginCatalog,
    pub registry: Arc<ServiceManager>,
    pub history: Arc<MemoryHistory>,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub fn new(http: MockHttp) -> Self {
        let http = Arc::new(http);
        let registry = Arc::new(ServiceManager::new(test_host(Arc::clone(&http))));
        let history = Arc::new(MemoryHistory::new());
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            history.clone(),
            Arc::new(StaticLocalizer::english()),
        );
        Self {
            http,
            catalog: PluginCatalog::discover(),
            registry,
            history,
            dispatcher,
        }
    }

    /// Register a service of `plugin_id` and return its service id
    pub async fn add(&self, plugin_id: &str) -> String {
        self.registry
            .register_from_catalog(&self.catalog, plugin_id, None)
            .await
            .unwrap()
            .service_id()
            .to_string()
    }
}
