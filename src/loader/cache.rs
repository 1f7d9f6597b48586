//! Process-shared module cache

use super::Module;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Imported modules keyed by fully qualified name
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct ModuleCache {
    modules: Arc<Mutex<HashMap<String, Arc<Module>>>>,
}

impl ModuleCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Module>>> {
        self.modules.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached module, if any
    pub fn get(&self, name: &str) -> Option<Arc<Module>> {
        self.lock().get(name).cloned()
    }

    /// Insert a module unless one is already cached; returns the cached one
    pub fn insert(&self, name: &str, module: Arc<Module>) -> Arc<Module> {
        self.lock()
            .entry(name.to_string())
            .or_insert(module)
            .clone()
    }

    /// Remove a module from the cache
    pub fn remove(&self, name: &str) -> Option<Arc<Module>> {
        self.lock().remove(name)
    }

    /// True if a module is cached under this name
    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Cached module names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of cached modules
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every cached module
    pub fn clear(&self) {
        self.lock().clear();
    }
}
