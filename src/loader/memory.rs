//! In-memory module importer

use super::{ImportSpec, ModuleBody, ModuleImporter, ModuleLoader};
use crate::error::ExecError;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Modules defined up front, keyed by fully qualified name
#[derive(Debug, Clone, Default)]
pub struct InMemoryImporter {
    modules: HashMap<String, ModuleBody>,
    without_loader: HashSet<String>,
    executions: Arc<AtomicUsize>,
}

impl InMemoryImporter {
    /// Creates an importer with no modules
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module (builder pattern)
    pub fn with_module(mut self, name: impl Into<String>, body: ModuleBody) -> Self {
        self.modules.insert(name.into(), body);
        self
    }

    /// Adds a module that is found but has no loader (builder pattern)
    pub fn with_unloadable(mut self, name: impl Into<String>) -> Self {
        self.without_loader.insert(name.into());
        self
    }

    /// How many module bodies have been executed so far
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

impl ModuleImporter for InMemoryImporter {
    fn find_spec(&self, name: &str) -> Option<ImportSpec> {
        if self.without_loader.contains(name) {
            return Some(ImportSpec::new(name));
        }
        let body = self.modules.get(name)?.clone();
        Some(ImportSpec::new(name).with_loader(Arc::new(MemoryLoader {
            body,
            executions: Arc::clone(&self.executions),
        })))
    }
}

struct MemoryLoader {
    body: ModuleBody,
    executions: Arc<AtomicUsize>,
}

impl ModuleLoader for MemoryLoader {
    fn exec_module(&self, _spec: &ImportSpec) -> Result<ModuleBody, ExecError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
}
