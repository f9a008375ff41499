use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::backend::{MemorySettingsBackend, SettingsBackend};
use super::view::SettingsView;
use crate::errors::{StorageError, StorageResult};

/// Typed settings store
///
/// Values are encoded as JSON and written through the backend on every
/// [`save`](Self::save). Writes to the same key are serialized by a per-key
/// lock; writes to different keys proceed independently.
pub struct SettingsStore {
    backend: Arc<dyn SettingsBackend>,
    key_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SettingsStore {
    pub fn new(backend: Arc<dyn SettingsBackend>) -> Self {
        Self {
            backend,
            key_locks: DashMap::new(),
        }
    }

    /// Store backed by [`MemorySettingsBackend`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySettingsBackend::new()))
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.key_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Load the value stored under `key`, or `T::default()` if nothing was saved
    pub fn load<T>(&self, key: &str) -> StorageResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let lock = self.lock_for(key);
        let _guard = lock.lock();

        match self.backend.read(key)? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|source| StorageError::Decode {
                key: key.to_string(),
                source,
            }),
            None => Ok(T::default()),
        }
    }

    /// Whether a value has ever been saved under `key`
    pub fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.backend.read(key)?.is_some())
    }

    /// Persist `value` under `key`
    pub fn save<T>(&self, key: &str, value: &T) -> StorageResult<()>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;

        let lock = self.lock_for(key);
        let _guard = lock.lock();
        self.backend.write(key, &bytes)?;

        tracing::trace!(key = %key, bytes = bytes.len(), "Saved settings");
        Ok(())
    }

    /// Delete the value stored under `key`
    pub fn remove(&self, key: &str) -> StorageResult<()> {
        let lock = self.lock_for(key);
        let _guard = lock.lock();
        self.backend.remove(key)?;
        drop(_guard);
        self.key_locks.remove(key);
        Ok(())
    }

    /// Settings handle restricted to one service
    pub fn scoped(self: &Arc<Self>, service_id: impl Into<String>) -> ScopedSettings {
        ScopedSettings {
            store: Arc::clone(self),
            service_id: service_id.into(),
        }
    }
}

/// Settings access for a single service instance
///
/// This is what a provider receives in its
/// [`PluginContext`](crate::plugin::lifecycle::PluginContext): it can only
/// reach its own blob.
#[derive(Clone)]
pub struct ScopedSettings {
    store: Arc<SettingsStore>,
    service_id: String,
}

impl ScopedSettings {
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn load<T>(&self) -> StorageResult<T>
    where
        T: DeserializeOwned + Default,
    {
        self.store.load(&self.service_id)
    }

    pub fn save<T>(&self, value: &T) -> StorageResult<()>
    where
        T: Serialize,
    {
        self.store.save(&self.service_id, value)
    }

    /// Load the current value and wrap it in a live view that saves on
    /// every mutation
    pub fn view<T>(&self) -> StorageResult<SettingsView<T>>
    where
        T: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static,
    {
        let initial = self.load::<T>()?;
        Ok(SettingsView::new(self.clone(), initial))
    }
}

impl std::fmt::Debug for ScopedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedSettings")
            .field("service_id", &self.service_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct Sample {
        name: String,
        count: u32,
        ratio: f64,
    }

    #[test]
    fn test_load_missing_returns_default() {
        let store = SettingsStore::in_memory();
        let value: Sample = store.load("svc-1").unwrap();
        assert_eq!(value, Sample::default());
        assert!(!store.contains("svc-1").unwrap());
    }

    #[test]
    fn test_save_then_load() {
        let store = SettingsStore::in_memory();
        let value = Sample {
            name: "alpha".to_string(),
            count: 3,
            ratio: 1.5,
        };
        store.save("svc-1", &value).unwrap();
        assert_eq!(store.load::<Sample>("svc-1").unwrap(), value);
    }

    #[test]
    fn test_keys_are_isolated() {
        let store = Arc::new(SettingsStore::in_memory());
        let a = store.scoped("svc-a");
        let b = store.scoped("svc-b");

        a.save(&Sample {
            count: 1,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(a.load::<Sample>().unwrap().count, 1);
        assert_eq!(b.load::<Sample>().unwrap().count, 0);
    }

    #[test]
    fn test_corrupt_blob_is_decode_error() {
        let backend = Arc::new(MemorySettingsBackend::new());
        backend.write("svc", b"not json").unwrap();
        let store = SettingsStore::new(backend);

        assert!(matches!(
            store.load::<Sample>("svc"),
            Err(StorageError::Decode { .. })
        ));
    }

    #[test]
    fn test_remove() {
        let store = SettingsStore::in_memory();
        store.save("svc", &Sample::default()).unwrap();
        store.remove("svc").unwrap();
        assert!(!store.contains("svc").unwrap());
    }

    #[test]
    fn test_concurrent_saves_same_key() {
        let store = Arc::new(SettingsStore::in_memory());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        store
                            .save(
                                "shared",
                                &Sample {
                                    count: i,
                                    ..Default::default()
                                },
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Last write wins; the blob is always a complete value
        let value: Sample = store.load("shared").unwrap();
        assert!(value.count < 8);
    }
}
