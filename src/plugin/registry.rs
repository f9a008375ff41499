//! Service Registry
//!
//! The [`ServiceManager`] owns every configured service: an initialized
//! provider instance wrapped with its identity (plugin id, service id),
//! enabled flag and rank.
//!
//! # Concurrency
//!
//! Readers never lock the registry. The ordered service list is an immutable
//! snapshot behind an `ArcSwap`; mutations (register, unregister, reorder)
//! serialize on an async mutex, build a new list and swap it in.
//!
//! Each service also carries a gate (`tokio::sync::RwLock<()>`). A dispatch
//! holds a read guard for its whole duration through a [`ServiceLease`];
//! disposal takes the write guard. Unregistering therefore:
//!
//! 1. removes the service from the snapshot, so new lookups miss it,
//! 2. fires the service's shutdown token, so in-flight calls may stop early,
//! 3. waits for outstanding leases to drop,
//! 4. calls the provider's `dispose` exactly once.
//!
//! A lease acquired after step 3 began observes the service as retired and is
//! refused, so no call ever interleaves with disposal.
//!
//! # Persistence
//!
//! The service list is saved under [`REGISTRY_KEY`] after every mutation.
//! Saved services that [`ServiceManager::restore`] could not rebuild (plugin
//! disabled or missing, init failure) are kept aside and written back with
//! every save, so their service ids survive until the plugin returns.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{OwnedRwLockReadGuard, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::capabilities::{Capability, CapabilitySet, Plugin, implemented_capabilities};
use super::catalog::PluginCatalog;
use super::isolation::{PluginError, call_plugin_safely_value, catch_plugin_panic};
use super::lifecycle::{HostContext, ServiceState, ServiceStats};
use super::metadata::PluginManifest;
use crate::settings::{ScopedSettings, validate_key};

/// Settings key under which the service list is persisted
pub const REGISTRY_KEY: &str = "_registry";

/// Persisted form of one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub plugin_id: String,
    pub service_id: String,
    pub enabled: bool,
    pub rank: usize,
}

/// A configured, initialized instance of a plugin
pub struct Service {
    service_id: String,
    manifest: PluginManifest,
    capabilities: CapabilitySet,
    provider: Box<dyn Plugin>,
    enabled: AtomicBool,
    state: Mutex<ServiceState>,
    stats: Mutex<ServiceStats>,
    gate: Arc<RwLock<()>>,
    shutdown: CancellationToken,
    disposed: AtomicBool,
}

impl Service {
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn plugin_id(&self) -> &str {
        &self.manifest.id
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    /// Declared capability set, checked at dispatch time
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn state(&self) -> ServiceState {
        *self.state.lock()
    }

    pub fn stats(&self) -> ServiceStats {
        self.stats.lock().clone()
    }

    pub fn provider(&self) -> &dyn Plugin {
        self.provider.as_ref()
    }

    /// Fires when the service starts retiring
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub(crate) fn record_success(&self) {
        self.stats.lock().record_success();
    }

    pub(crate) fn record_error(&self, error: impl Into<String>) {
        self.stats.lock().record_error(error);
    }

    fn transition(&self, next: ServiceState) {
        let mut state = self.state.lock();
        let previous = *state;
        tracing::debug!(
            service_id = %self.service_id,
            from = %previous,
            to = %next,
            "Service state transition"
        );
        *state = next;
    }

    /// Retire the service and release its provider
    ///
    /// Waits for outstanding [`ServiceLease`]s to drop, then calls the
    /// provider's `dispose`. Safe to call any number of times; only the first
    /// call reaches the provider. Must not be called while holding a lease on
    /// this same service.
    pub async fn dispose(&self) {
        if !self.state().is_terminal() {
            self.transition(ServiceState::Retiring);
        }
        self.shutdown.cancel();

        let _exclusive = self.gate.write().await;
        if self.disposed.swap(true, Ordering::AcqRel) {
            tracing::debug!(service_id = %self.service_id, "Service already disposed");
            return;
        }

        if let Err(msg) = catch_plugin_panic(self.provider.dispose()).await {
            tracing::warn!(
                service_id = %self.service_id,
                error = %msg,
                "Provider panicked during dispose"
            );
        }
        self.transition(ServiceState::Disposed);
    }

    fn record(&self, rank: usize) -> ServiceRecord {
        ServiceRecord {
            plugin_id: self.manifest.id.clone(),
            service_id: self.service_id.clone(),
            enabled: self.is_enabled(),
            rank,
        }
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("service_id", &self.service_id)
            .field("plugin_id", &self.manifest.id)
            .field("capabilities", &self.capabilities)
            .field("enabled", &self.is_enabled())
            .field("state", &self.state())
            .finish()
    }
}

/// Handle guaranteeing the service stays undisposed while held
pub struct ServiceLease {
    service: Arc<Service>,
    _guard: OwnedRwLockReadGuard<()>,
}

impl ServiceLease {
    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }
}

impl std::ops::Deref for ServiceLease {
    type Target = Service;

    fn deref(&self) -> &Self::Target {
        &self.service
    }
}

/// Registry of configured services
pub struct ServiceManager {
    services: ArcSwap<Vec<Arc<Service>>>,
    mutation: tokio::sync::Mutex<()>,
    /// Saved records not restored in this session
    retained: Mutex<Vec<ServiceRecord>>,
    /// Serializes building and writing the saved list
    persist_lock: Mutex<()>,
    host: HostContext,
}

impl ServiceManager {
    pub fn new(host: HostContext) -> Self {
        Self {
            services: ArcSwap::from_pointee(Vec::new()),
            mutation: tokio::sync::Mutex::new(()),
            retained: Mutex::new(Vec::new()),
            persist_lock: Mutex::new(()),
            host,
        }
    }

    pub fn host(&self) -> &HostContext {
        &self.host
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Initialize `provider` and make it visible as a new service
    ///
    /// A fresh UUID is assigned when `service_id` is `None`. The provider's
    /// `init` runs before the service enters the snapshot; if it fails the
    /// provider is disposed and never becomes visible.
    pub async fn register(
        &self,
        provider: Box<dyn Plugin>,
        service_id: Option<String>,
    ) -> Result<Arc<Service>, PluginError> {
        let _guard = self.mutation.lock().await;
        let service = self.register_locked(provider, service_id).await?;
        self.retained
            .lock()
            .retain(|r| r.service_id != service.service_id);
        self.persist();
        Ok(service)
    }

    async fn register_locked(
        &self,
        mut provider: Box<dyn Plugin>,
        service_id: Option<String>,
    ) -> Result<Arc<Service>, PluginError> {
        let service_id = service_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        validate_key(&service_id)?;
        if service_id == REGISTRY_KEY || self.resolve(&service_id).is_some() {
            return Err(PluginError::DuplicateService(service_id));
        }

        let manifest = call_plugin_safely_value(AssertUnwindSafe(|| provider.manifest()))?;
        let capabilities = checked_capabilities(&manifest, provider.as_ref())?;

        tracing::debug!(
            plugin_id = %manifest.id,
            service_id = %service_id,
            "Initializing service"
        );
        let ctx = self.host.context_for(&manifest.id, &service_id);
        match catch_plugin_panic(provider.init(ctx)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(
                    plugin_id = %manifest.id,
                    service_id = %service_id,
                    error = %e,
                    "Service init failed"
                );
                dispose_unregistered(provider.as_ref(), &service_id).await;
                return Err(e);
            }
            Err(msg) => {
                dispose_unregistered(provider.as_ref(), &service_id).await;
                return Err(PluginError::Panic(msg));
            }
        }

        let service = Arc::new(Service {
            service_id,
            manifest,
            capabilities,
            provider,
            enabled: AtomicBool::new(true),
            state: Mutex::new(ServiceState::Ready),
            stats: Mutex::new(ServiceStats::new()),
            gate: Arc::new(RwLock::new(())),
            shutdown: CancellationToken::new(),
            disposed: AtomicBool::new(false),
        });

        let mut next = Vec::clone(&self.services.load());
        next.push(Arc::clone(&service));
        self.services.store(Arc::new(next));

        tracing::info!(
            plugin_id = %service.plugin_id(),
            service_id = %service.service_id(),
            capabilities = %service.capabilities(),
            "Registered service"
        );
        Ok(service)
    }

    /// Instantiate `plugin_id` from `catalog` and register it
    pub async fn register_from_catalog(
        &self,
        catalog: &PluginCatalog,
        plugin_id: &str,
        service_id: Option<String>,
    ) -> Result<Arc<Service>, PluginError> {
        let provider = catalog.instantiate(plugin_id)?;
        self.register(provider, service_id).await
    }

    /// Remove a service and dispose its provider
    ///
    /// The service leaves the snapshot first, so lookups miss it immediately;
    /// disposal then waits for dispatches already holding a lease.
    pub async fn unregister(&self, service_id: &str) -> Result<(), PluginError> {
        self.unregister_inner(service_id, true).await
    }

    async fn unregister_inner(&self, service_id: &str, persist: bool) -> Result<(), PluginError> {
        let service = {
            let _guard = self.mutation.lock().await;
            let current = self.services.load_full();
            let position = current
                .iter()
                .position(|s| s.service_id == service_id)
                .ok_or_else(|| PluginError::ServiceNotFound(service_id.to_string()))?;

            let mut next = Vec::clone(&current);
            let service = next.remove(position);
            self.services.store(Arc::new(next));
            if persist {
                self.persist();
            }
            service
        };

        service.dispose().await;
        tracing::info!(
            plugin_id = %service.plugin_id(),
            service_id = %service_id,
            "Unregistered service"
        );
        Ok(())
    }

    /// Unregister and delete the service's settings blob
    pub async fn remove_service(&self, service_id: &str) -> Result<(), PluginError> {
        self.unregister(service_id).await?;
        self.host.store.remove(service_id)?;
        Ok(())
    }

    /// Move a service to `index` in rank order (clamped to the end)
    pub async fn move_to(&self, service_id: &str, index: usize) -> Result<(), PluginError> {
        let _guard = self.mutation.lock().await;
        let current = self.services.load_full();
        let position = current
            .iter()
            .position(|s| s.service_id == service_id)
            .ok_or_else(|| PluginError::ServiceNotFound(service_id.to_string()))?;

        let mut next = Vec::clone(&current);
        let service = next.remove(position);
        let index = index.min(next.len());
        next.insert(index, service);
        self.services.store(Arc::new(next));
        self.persist();

        tracing::debug!(service_id = %service_id, rank = index, "Moved service");
        Ok(())
    }

    pub fn set_enabled(&self, service_id: &str, enabled: bool) -> Result<(), PluginError> {
        let service = self
            .resolve(service_id)
            .ok_or_else(|| PluginError::ServiceNotFound(service_id.to_string()))?;
        service.set_enabled(enabled);
        tracing::debug!(service_id = %service_id, enabled, "Service toggled");
        self.persist();
        Ok(())
    }

    /// Unregister every service, last-ranked first
    ///
    /// The saved list is left as it was, so the same services come back on
    /// the next [`restore`](Self::restore).
    pub async fn shutdown(&self) {
        let ids: Vec<String> = self
            .services
            .load()
            .iter()
            .rev()
            .map(|s| s.service_id.clone())
            .collect();
        for id in ids {
            if let Err(e) = self.unregister_inner(&id, false).await {
                tracing::debug!(service_id = %id, error = %e, "Service already gone at shutdown");
            }
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Current ordered service list
    pub fn snapshot(&self) -> Arc<Vec<Arc<Service>>> {
        self.services.load_full()
    }

    pub fn resolve(&self, service_id: &str) -> Option<Arc<Service>> {
        self.services
            .load()
            .iter()
            .find(|s| s.service_id == service_id)
            .cloned()
    }

    /// Resolve by the `(plugin_id, service_id)` pair stored in history
    pub fn find(&self, plugin_id: &str, service_id: &str) -> Option<Arc<Service>> {
        self.resolve(service_id)
            .filter(|s| s.plugin_id().eq_ignore_ascii_case(plugin_id))
    }

    /// Resolve and pin a service for the duration of one dispatch
    ///
    /// Returns `None` if the service is unknown or already retiring.
    pub async fn acquire(&self, service_id: &str) -> Option<ServiceLease> {
        let service = self.resolve(service_id)?;
        let guard = Arc::clone(&service.gate).read_owned().await;
        if !service.state().can_process() {
            return None;
        }
        Some(ServiceLease {
            service,
            _guard: guard,
        })
    }

    /// Services declaring `capability`, in rank order
    pub fn filter_by_capability(&self, capability: Capability) -> Vec<Arc<Service>> {
        self.services
            .load()
            .iter()
            .filter(|s| s.supports(capability))
            .cloned()
            .collect()
    }

    /// Enabled services declaring `capability`, in rank order
    pub fn enabled_by_capability(&self, capability: Capability) -> Vec<Arc<Service>> {
        self.services
            .load()
            .iter()
            .filter(|s| s.supports(capability) && s.is_enabled())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.services.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.load().is_empty()
    }

    /// Settings handle for a service, for host-side editors
    pub fn settings_for(&self, service_id: &str) -> Option<ScopedSettings> {
        self.resolve(service_id)
            .map(|s| self.host.store.scoped(s.service_id()))
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn records(&self) -> Vec<ServiceRecord> {
        self.services
            .load()
            .iter()
            .enumerate()
            .map(|(rank, s)| s.record(rank))
            .collect()
    }

    /// Saved records this session could not restore
    pub fn retained_records(&self) -> Vec<ServiceRecord> {
        self.retained.lock().clone()
    }

    /// Live records with the retained ones put back at their saved rank
    fn records_to_save(&self) -> Vec<ServiceRecord> {
        let mut merged = self.records();
        let mut retained = self.retained.lock().clone();
        retained.sort_by_key(|r| r.rank);
        for record in retained {
            if merged.iter().any(|r| r.service_id == record.service_id) {
                continue;
            }
            let index = record.rank.min(merged.len());
            merged.insert(index, record);
        }
        for (rank, record) in merged.iter_mut().enumerate() {
            record.rank = rank;
        }
        merged
    }

    /// Write the service list, including retained records
    pub fn save_records(&self) -> Result<(), PluginError> {
        let _guard = self.persist_lock.lock();
        let records = self.records_to_save();
        self.host.store.save(REGISTRY_KEY, &records)?;
        tracing::debug!(count = records.len(), "Saved service records");
        Ok(())
    }

    /// Save after a mutation that has already taken effect; the next save
    /// retries on failure
    fn persist(&self) {
        if let Err(e) = self.save_records() {
            tracing::warn!(error = %e, "Failed to persist service records");
        }
    }

    /// Whether a service list has been saved before
    pub fn has_saved_records(&self) -> Result<bool, PluginError> {
        Ok(self.host.store.contains(REGISTRY_KEY)?)
    }

    /// Re-register every saved service, reusing its service id
    ///
    /// Records naming a plugin the catalog does not know, or whose init
    /// fails, are skipped with a warning and retained for later saves.
    /// Returns the number restored.
    pub async fn restore(&self, catalog: &PluginCatalog) -> Result<usize, PluginError> {
        let mut records: Vec<ServiceRecord> = self.host.store.load(REGISTRY_KEY)?;
        records.sort_by_key(|r| r.rank);

        let _guard = self.mutation.lock().await;
        let mut restored = 0;
        let mut skipped = Vec::new();
        for record in records {
            let provider = match catalog.instantiate(&record.plugin_id) {
                Ok(provider) => provider,
                Err(e) => {
                    tracing::warn!(
                        plugin_id = %record.plugin_id,
                        service_id = %record.service_id,
                        error = %e,
                        "Skipping saved service"
                    );
                    skipped.push(record);
                    continue;
                }
            };

            match self
                .register_locked(provider, Some(record.service_id.clone()))
                .await
            {
                Ok(service) => {
                    service.set_enabled(record.enabled);
                    restored += 1;
                }
                // Already live; keeping the record would duplicate the id
                Err(PluginError::DuplicateService(id)) => {
                    tracing::warn!(service_id = %id, "Duplicate saved service dropped");
                }
                Err(e) => {
                    tracing::warn!(
                        plugin_id = %record.plugin_id,
                        service_id = %record.service_id,
                        error = %e,
                        "Failed to restore service"
                    );
                    skipped.push(record);
                }
            }
        }

        let retained = skipped.len();
        self.retained.lock().extend(skipped);
        self.save_records()?;

        tracing::info!(count = restored, retained, "Restored services");
        Ok(restored)
    }
}

/// Release a provider that never became a service
async fn dispose_unregistered(provider: &dyn Plugin, service_id: &str) {
    if let Err(msg) = catch_plugin_panic(provider.dispose()).await {
        tracing::warn!(
            service_id = %service_id,
            error = %msg,
            "Provider panicked during dispose"
        );
    }
}

/// Declared capabilities, after checking the plugin exposes an accessor for each
fn checked_capabilities(
    manifest: &PluginManifest,
    provider: &dyn Plugin,
) -> Result<CapabilitySet, PluginError> {
    let declared = manifest.capabilities;
    let implemented = implemented_capabilities(provider);

    if declared.iter().any(|c| !implemented.contains(c)) {
        return Err(PluginError::CapabilityMismatch {
            plugin_id: manifest.id.clone(),
            declared: declared.to_string(),
            implemented: implemented.to_string(),
        });
    }
    if implemented != declared {
        tracing::warn!(
            plugin_id = %manifest.id,
            declared = %declared,
            implemented = %implemented,
            "Plugin implements undeclared capabilities; they will not be dispatched"
        );
    }
    Ok(declared)
}
