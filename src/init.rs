//! Startup wiring for the gateway.
//!
//! [`bootstrap`] turns a [`GatewayConfig`] into a running [`Gateway`]:
//!
//! ```text
//! GatewayConfig ─▶ FileSettingsBackend ─▶ SettingsStore ─┐
//!               ─▶ ReqwestHttpService ───────────────────┼─▶ HostContext ─▶ ServiceManager
//!               ─▶ StaticLocalizer ──────────────────────┘                      │
//! PluginCatalog::discover() ─▶ restore saved services (or defaults) ◀───────────┘
//!               ─▶ JsonlHistory ─▶ Dispatcher, CapabilityRouter
//! ```
//!
//! Typical usage from the host application:
//!
//! ```rust,no_run
//! use lingo_gateway::init;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = init::load_config(None)?;
//! init::init_tracing(&config.log_filter);
//! let gateway = init::bootstrap(config).await?;
//! // ... dispatch requests ...
//! gateway.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::config::GatewayConfig;
use crate::core::history::JsonlHistory;
use crate::core::http::ReqwestHttpService;
use crate::core::i18n::StaticLocalizer;
use crate::plugin::catalog::PluginCatalog;
use crate::plugin::dispatch::Dispatcher;
use crate::plugin::lifecycle::HostContext;
use crate::plugin::registry::ServiceManager;
use crate::plugin::router::CapabilityRouter;
use crate::settings::{FileSettingsBackend, SettingsStore};

/// Install the global fmt subscriber
///
/// `RUST_LOG` wins over `default_filter`. Calling this again after a
/// subscriber is installed is a no-op.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Load `.env`, then configuration from `path` (YAML) or the environment
pub fn load_config(path: Option<&PathBuf>) -> Result<GatewayConfig> {
    let _ = dotenvy::dotenv();

    match path {
        Some(path) => GatewayConfig::from_file(path)
            .map_err(|e| anyhow!("Failed to load config from {}: {e}", path.display())),
        None => GatewayConfig::from_env().map_err(|e| anyhow!(e.to_string())),
    }
}

/// Everything the host needs after startup
pub struct Gateway {
    pub config: GatewayConfig,
    pub catalog: Arc<PluginCatalog>,
    pub registry: Arc<ServiceManager>,
    pub dispatcher: Dispatcher,
    pub router: CapabilityRouter,
    pub history: Arc<JsonlHistory>,
}

impl Gateway {
    /// Persist the service list and dispose every provider
    pub async fn shutdown(&self) -> Result<()> {
        self.registry
            .save_records()
            .context("Failed to save service records")?;
        self.registry.shutdown().await;
        tracing::info!("Gateway shut down");
        Ok(())
    }
}

/// Build the gateway from `config`
pub async fn bootstrap(config: GatewayConfig) -> Result<Gateway> {
    let backend = FileSettingsBackend::new(&config.settings_dir).with_context(|| {
        format!(
            "Failed to open settings directory {}",
            config.settings_dir.display()
        )
    })?;
    let store = Arc::new(SettingsStore::new(Arc::new(backend)));
    let http = ReqwestHttpService::new(&config.http).context("Failed to build HTTP client")?;
    let localizer = Arc::new(StaticLocalizer::english());

    let catalog = PluginCatalog::discover();
    catalog.retain(|id| !config.plugins.is_disabled(id));
    let catalog = Arc::new(catalog);

    let host = HostContext::new(Arc::new(http), store, localizer.clone());
    let registry = Arc::new(ServiceManager::new(host));

    if registry.has_saved_records()? {
        registry.restore(&catalog).await?;
    } else if config.plugins.default_services {
        for manifest in catalog.manifests() {
            if let Err(e) = registry
                .register_from_catalog(&catalog, &manifest.id, None)
                .await
            {
                tracing::warn!(
                    plugin_id = %manifest.id,
                    error = %e,
                    "Failed to register default service"
                );
            }
        }
        registry.save_records()?;
    }

    let history = Arc::new(
        JsonlHistory::open(&config.history_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open history file {}",
                    config.history_path.display()
                )
            })?,
    );

    let dispatcher = Dispatcher::new(Arc::clone(&registry), history.clone(), localizer);
    let router = CapabilityRouter::new(Arc::clone(&registry));

    tracing::info!(
        plugins = catalog.len(),
        services = registry.len(),
        settings_dir = %config.settings_dir.display(),
        "Gateway ready"
    );

    Ok(Gateway {
        config,
        catalog,
        registry,
        dispatcher,
        router,
        history,
    })
}
