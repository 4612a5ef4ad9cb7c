use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use log::warn;
use parking_lot::RwLock;

type Entry = Arc<dyn Any + Send + Sync>;

/// Namespace shared by every module, e.g. the scene graph or the canvas id.
///
/// The kernel never reads it; it only hands it to `init` and `destroy`.
/// Each key belongs to the module that inserts it, and nothing beyond that
/// convention prevents two modules from writing the same key.
#[derive(Default)]
pub struct SharedResources {
    entries: Arc<RwLock<IndexMap<String, Entry>>>,
}

impl Clone for SharedResources {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl SharedResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn insert<T>(&self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        let key = key.into();
        if self.entries.write().insert(key.clone(), Arc::new(value)).is_some() {
            warn!("shared resource '{key}' was overwritten");
        }
    }

    /// Returns the value stored under `key` if it has type `T`.
    pub fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let entry = self.entries.read().get(key).cloned()?;
        entry.downcast::<T>().ok()
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().shift_remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

impl fmt::Debug for SharedResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedResources")
            .field("keys", &self.keys())
            .finish()
    }
}
