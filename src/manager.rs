//! Dependency manager: the public entry point
//!
//! A manager owns its registry and, optionally, the metadata of a source
//! package used to derive version ranges. Declaring dependencies only parses
//! and records them; nothing is imported until first use.

use crate::attach::{Declaration, DependentClass, DependentFn, ModuleMap};
use crate::domain::{DependencyDescriptor, ModuleReport, Target};
use crate::environment::Environment;
use crate::error::{DeclarationError, OptDepsError};
use crate::metadata::MetaSource;
use crate::module_spec::ModuleSpec;
use crate::parser::ModuleDeclarations;
use crate::registry::Registry;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub(crate) struct Shared {
    pub(crate) env: Environment,
    meta_source: Option<MetaSource>,
    registry: Mutex<Registry>,
}

impl Shared {
    pub(crate) fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Declares optional dependencies and reports on them
///
/// Clones share the same registry.
#[derive(Clone)]
pub struct DependencyManager {
    shared: Arc<Shared>,
}

impl DependencyManager {
    /// Creates a manager without a source package
    pub fn new(env: Environment) -> Self {
        Self::build(env, None)
    }

    /// Creates a manager deriving ranges from an installed source package
    pub fn with_source(env: Environment, source: &str) -> Result<Self, DeclarationError> {
        let meta_source = MetaSource::new(source, env.distributions.as_ref())?;
        Ok(Self::build(env, Some(meta_source)))
    }

    /// Creates a manager from already loaded source metadata
    pub fn with_meta_source(env: Environment, meta_source: MetaSource) -> Self {
        Self::build(env, Some(meta_source))
    }

    fn build(env: Environment, meta_source: Option<MetaSource>) -> Self {
        Self {
            shared: Arc::new(Shared {
                env,
                meta_source,
                registry: Mutex::new(Registry::new()),
            }),
        }
    }

    /// The environment loads run against
    pub fn environment(&self) -> &Environment {
        &self.shared.env
    }

    /// The source package metadata, if any
    pub fn meta_source(&self) -> Option<&MetaSource> {
        self.shared.meta_source.as_ref()
    }

    /// Declare the dependencies of a target
    ///
    /// Every declaration is parsed and meta-derived ranges are resolved
    /// before anything is recorded, so a failing call leaves the registry
    /// untouched. Nothing is imported.
    pub fn decorate(
        &self,
        target: &Target,
        declarations: impl Into<ModuleDeclarations>,
    ) -> Result<Declaration, OptDepsError> {
        if !target.kind.accepts_dependencies() {
            return Err(
                DeclarationError::unsupported_target(&target.name, target.kind.clone()).into(),
            );
        }

        let declarations: ModuleDeclarations = declarations.into();
        let descriptors = declarations
            .into_descriptors()?
            .into_iter()
            .map(|descriptor| -> Result<DependencyDescriptor, DeclarationError> {
                if !descriptor.needs_meta_resolution() {
                    return Ok(descriptor);
                }
                let meta_source = self
                    .shared
                    .meta_source
                    .as_ref()
                    .ok_or_else(|| DeclarationError::missing_source(&descriptor.module_name))?;
                meta_source.resolve(&descriptor, &self.shared.env.markers)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let specs: Vec<Arc<ModuleSpec>> = descriptors
            .into_iter()
            .map(|descriptor| Arc::new(ModuleSpec::new(descriptor)))
            .collect();

        {
            let mut registry = self.shared.registry();
            for spec in &specs {
                registry.record_usage(spec.module_name(), &target.name);
                registry.log_spec(Arc::clone(spec), &target.name);
            }
        }

        debug!(target = %target, dependencies = specs.len(), "declared dependencies");
        Ok(Declaration::new(
            target.clone(),
            specs,
            Arc::clone(&self.shared),
        ))
    }

    /// Declare the dependencies of a type
    pub fn class<T>(
        &self,
        name: &str,
        declarations: impl Into<ModuleDeclarations>,
    ) -> Result<DependentClass<T>, OptDepsError> {
        let declaration = self.decorate(&Target::class(name), declarations)?;
        Ok(DependentClass::new(declaration))
    }

    /// Declare the dependencies of a function and wrap it
    pub fn function<F, A, R>(
        &self,
        name: &str,
        declarations: impl Into<ModuleDeclarations>,
        f: F,
    ) -> Result<DependentFn<F>, OptDepsError>
    where
        F: Fn(&ModuleMap, A) -> R,
    {
        let declaration = self.decorate(&Target::function(name), declarations)?;
        Ok(DependentFn::new(declaration, f))
    }

    /// Force every declared dependency and describe the outcome
    ///
    /// Individual failures become statuses; only calling this before any
    /// declaration is an error.
    pub fn report(&self) -> Result<Vec<ModuleReport>, OptDepsError> {
        let mut registry = self.shared.registry();
        if registry.is_empty() {
            return Err(OptDepsError::NothingDeclared);
        }
        Ok(registry.report(&self.shared.env))
    }

    /// Consumers of each declared module, in declaration order
    pub fn usage_register(&self) -> BTreeMap<String, Vec<String>> {
        self.shared.registry().usage().clone()
    }

    /// Installed version of each module whose load has run
    pub fn version_register(&self) -> BTreeMap<String, String> {
        self.shared.registry().versions().clone()
    }

    /// Forget every declaration and recorded version
    pub fn reset(&self) {
        self.shared.registry().reset();
    }
}

impl std::fmt::Debug for DependencyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyManager")
            .field(
                "source",
                &self.shared.meta_source.as_ref().map(|m| m.source()),
            )
            .field("declared", &self.shared.registry().spec_log().len())
            .finish()
    }
}
