use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::store::ScopedSettings;
use crate::errors::StorageResult;

type Observer<T> = Arc<dyn Fn(&T) -> StorageResult<()> + Send + Sync>;

struct ViewInner<T> {
    value: RwLock<T>,
    /// Held from mutation through the last observer so saves land in order
    commit: Mutex<()>,
    observers: Mutex<Vec<(u64, Observer<T>)>>,
    next_id: AtomicU64,
}

impl<T> ViewInner<T> {
    fn remove_observer(&self, id: u64) {
        self.observers.lock().retain(|(observer_id, _)| *observer_id != id);
    }
}

/// Handle to a registered observer; dropping it unregisters the observer
#[must_use = "dropping a Subscription immediately unregisters the observer"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Unregister now rather than at drop
    pub fn cancel(mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

/// Live, shared view of one service's settings
///
/// Every call to [`update`](Self::update) mutates the in-memory value and
/// then notifies observers synchronously. The first observer, registered at
/// construction, saves the whole value through the store, so a mutation that
/// returned `Ok` is on disk. There is no batching window.
///
/// ```rust,ignore
/// let view = ctx.settings.view::<EdgeTtsSettings>()?;
/// view.update(|s| s.voice = "en-US-AriaNeural".to_string())?;
/// ```
pub struct SettingsView<T> {
    inner: Arc<ViewInner<T>>,
    _persist: Subscription,
}

impl<T> SettingsView<T>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(settings: ScopedSettings, initial: T) -> Self {
        let inner = Arc::new(ViewInner {
            value: RwLock::new(initial),
            commit: Mutex::new(()),
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        });

        let persist =
            Self::subscribe_inner(&inner, Arc::new(move |value: &T| settings.save(value)));

        Self {
            inner,
            _persist: persist,
        }
    }

    fn subscribe_inner(inner: &Arc<ViewInner<T>>, observer: Observer<T>) -> Subscription {
        let id = inner.next_id.fetch_add(1, Ordering::Relaxed);
        inner.observers.lock().push((id, observer));

        let weak: Weak<ViewInner<T>> = Arc::downgrade(inner);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.remove_observer(id);
                }
            })),
        }
    }

    /// Register an observer called after every mutation
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self::subscribe_inner(
            &self.inner,
            Arc::new(move |value: &T| {
                observer(value);
                Ok(())
            }),
        )
    }

    /// Snapshot of the current value
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Read through a borrow without cloning
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Apply a mutation and save immediately
    ///
    /// Updates are serialized end to end: the next mutation starts only after
    /// every observer has seen this one, so the saved blob never goes back to
    /// an older snapshot. Readers are blocked only during the mutation itself.
    /// Observers must not call `update` on the same view.
    ///
    /// Returns the first observer error, which for the built-in persist
    /// observer is a storage failure.
    pub fn update(&self, mutate: impl FnOnce(&mut T)) -> StorageResult<()> {
        let _commit = self.inner.commit.lock();
        let snapshot = {
            let mut value = self.inner.value.write();
            mutate(&mut value);
            value.clone()
        };

        let observers: Vec<Observer<T>> = self
            .inner
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        let mut first_error = None;
        for observer in observers {
            if let Err(e) = observer(&snapshot) {
                tracing::warn!(error = %e, "Settings observer failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Number of registered observers, including the persist observer
    pub fn observer_count(&self) -> usize {
        self.inner.observers.lock().len()
    }
}
