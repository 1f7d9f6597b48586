//! Wrappers that load declared dependencies on first use
//!
//! - `DependentClass<T>` / `Dependent<T>`: a value plus a lazily loaded
//!   alias to module view, populated on the first `modules()` call
//! - `DependentFn<F>`: a function that receives the module view as its first
//!   argument, loaded on the first call

use crate::domain::{LoadFailureKind, Target};
use crate::error::DependencyError;
use crate::loader::Module;
use crate::manager::Shared;
use crate::module_spec::{ModuleSpec, ResolvedLoad};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Loaded modules keyed by alias, in declaration order
#[derive(Debug, Clone, Default)]
pub struct ModuleMap {
    entries: Vec<(String, Arc<Module>)>,
}

impl ModuleMap {
    /// The module exposed under `alias`
    pub fn get(&self, alias: &str) -> Option<&Arc<Module>> {
        self.entries
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, m)| m)
    }

    /// True if a module is exposed under `alias`
    pub fn contains(&self, alias: &str) -> bool {
        self.get(alias).is_some()
    }

    /// Aliases in declaration order
    pub fn aliases(&self) -> Vec<&str> {
        self.entries.iter().map(|(a, _)| a.as_str()).collect()
    }

    /// Iterate over (alias, module) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Module>)> {
        self.entries.iter().map(|(a, m)| (a.as_str(), m))
    }

    /// Number of modules
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the target declared no dependencies
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, alias: &str, module: Arc<Module>) {
        match self.entries.iter_mut().find(|(a, _)| a == alias) {
            Some(entry) => entry.1 = module,
            None => self.entries.push((alias.to_string(), module)),
        }
    }
}

/// The dependencies declared for one target
pub struct Declaration {
    target: Target,
    specs: Vec<Arc<ModuleSpec>>,
    shared: Arc<Shared>,
}

impl Declaration {
    pub(crate) fn new(target: Target, specs: Vec<Arc<ModuleSpec>>, shared: Arc<Shared>) -> Self {
        Self {
            target,
            specs,
            shared,
        }
    }

    /// The declaring target
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Declared specs, in declaration order
    pub fn specs(&self) -> &[Arc<ModuleSpec>] {
        &self.specs
    }

    /// Load every spec and collect the modules, or every failure
    ///
    /// A relative module name is reported on its own since it is a mistake
    /// in the declaration, not a missing dependency.
    pub fn load_all(&self) -> Result<ModuleMap, DependencyError> {
        let results: Vec<&ResolvedLoad> = self
            .specs
            .iter()
            .map(|spec| spec.load(&self.shared.env))
            .collect();

        {
            let mut registry = self.shared.registry();
            for (spec, resolved) in self.specs.iter().zip(&results) {
                registry.record_load(spec.module_name(), resolved);
            }
        }

        let mut modules = ModuleMap::default();
        let mut failures = Vec::new();
        for (spec, resolved) in self.specs.iter().zip(results) {
            match resolved {
                ResolvedLoad::Loaded { module, .. } => {
                    modules.insert(spec.alias(), Arc::clone(module))
                }
                ResolvedLoad::Failed(failure) if failure.kind == LoadFailureKind::RelativeImport => {
                    return Err(DependencyError::RelativeImport {
                        module: failure.module_name.clone(),
                    });
                }
                ResolvedLoad::Failed(failure) => failures.push(failure.clone()),
            }
        }

        if failures.is_empty() {
            debug!(target = %self.target, modules = modules.len(), "dependencies loaded");
            Ok(modules)
        } else {
            debug!(target = %self.target, failures = failures.len(), "dependencies unsatisfied");
            Err(DependencyError::Unsatisfied { failures })
        }
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("target", &self.target)
            .field("specs", &self.specs)
            .finish()
    }
}

/// A type whose instances load its declared dependencies on first use
pub struct DependentClass<T> {
    declaration: Arc<Declaration>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> DependentClass<T> {
    pub(crate) fn new(declaration: Declaration) -> Self {
        Self {
            declaration: Arc::new(declaration),
            _marker: std::marker::PhantomData,
        }
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.declaration.target.name
    }

    /// The declared dependencies
    pub fn declaration(&self) -> &Declaration {
        &self.declaration
    }

    /// Wrap a value; always succeeds, dependencies are not touched
    pub fn construct(&self, value: T) -> Dependent<T> {
        Dependent {
            value,
            declaration: Arc::clone(&self.declaration),
            modules: OnceLock::new(),
        }
    }
}

impl<T> Clone for DependentClass<T> {
    fn clone(&self) -> Self {
        Self {
            declaration: Arc::clone(&self.declaration),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T> fmt::Debug for DependentClass<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependentClass")
            .field("declaration", &self.declaration)
            .finish()
    }
}

/// An instance of a `DependentClass`
pub struct Dependent<T> {
    value: T,
    declaration: Arc<Declaration>,
    modules: OnceLock<Result<ModuleMap, DependencyError>>,
}

impl<T> Dependent<T> {
    /// The loaded dependencies; loads them on the first call
    pub fn modules(&self) -> Result<&ModuleMap, DependencyError> {
        self.modules
            .get_or_init(|| self.declaration.load_all())
            .as_ref()
            .map_err(|e| e.clone())
    }

    /// Unwrap the original value
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Dependent<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Dependent<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Dependent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependent")
            .field("value", &self.value)
            .field("loaded", &self.modules.get().is_some())
            .finish()
    }
}

/// A function that receives its loaded dependencies as first argument
pub struct DependentFn<F> {
    declaration: Declaration,
    f: F,
    modules: OnceLock<Result<ModuleMap, DependencyError>>,
}

impl<F> DependentFn<F> {
    pub(crate) fn new(declaration: Declaration, f: F) -> Self {
        Self {
            declaration,
            f,
            modules: OnceLock::new(),
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.declaration.target.name
    }

    /// The declared dependencies
    pub fn declaration(&self) -> &Declaration {
        &self.declaration
    }

    /// Call the function, loading dependencies on the first call
    pub fn call<A, R>(&self, args: A) -> Result<R, DependencyError>
    where
        F: Fn(&ModuleMap, A) -> R,
    {
        let modules = self
            .modules
            .get_or_init(|| self.declaration.load_all())
            .as_ref()
            .map_err(|e| e.clone())?;
        Ok((self.f)(modules, args))
    }
}

impl<F> fmt::Debug for DependentFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependentFn")
            .field("declaration", &self.declaration)
            .field("loaded", &self.modules.get().is_some())
            .finish()
    }
}
