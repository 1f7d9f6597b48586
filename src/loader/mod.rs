//! Module location and lazy execution
//!
//! This module provides:
//! - The `ModuleImporter` / `ModuleLoader` traits
//! - `FileSystemImporter` for site-packages style trees
//! - `InMemoryImporter` for embedding and tests
//! - `Module`, whose body runs on first attribute access
//! - `ModuleCache`, shared by every descriptor of an environment

mod cache;
mod filesystem;
mod memory;
mod module;

pub use cache::ModuleCache;
pub use filesystem::{ExtensionLoader, FileSystemImporter, NamespaceLoader, SourceLoader};
pub use memory::InMemoryImporter;
pub use module::{Attribute, ImportSpec, Module, ModuleBody};

use crate::error::ExecError;

/// Locates modules by fully qualified name
pub trait ModuleImporter: Send + Sync {
    /// Find a module; `None` if it does not exist
    fn find_spec(&self, name: &str) -> Option<ImportSpec>;
}

/// Executes a located module
pub trait ModuleLoader: Send + Sync {
    /// Run the module and collect the names it defines
    fn exec_module(&self, spec: &ImportSpec) -> Result<ModuleBody, ExecError>;
}
