//! One declared dependency and its memoized load result
//!
//! Loading runs these checks in order and stops at the first failure:
//! 1. Relative module names are rejected
//! 2. The installable distribution must be installed
//! 3. The declared range must parse
//! 4. The installed version must satisfy the range
//! 5. The module must be importable

use crate::domain::{DependencyDescriptor, LoadFailure, LoadFailureKind, MetaKind};
use crate::environment::Environment;
use crate::loader::Module;
use crate::version::{SpecifierSet, Version};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Outcome of loading one descriptor
#[derive(Debug, Clone)]
pub enum ResolvedLoad {
    /// The module was found and the installed version satisfies the range
    Loaded {
        module: Arc<Module>,
        installed_version: String,
    },
    /// The dependency cannot be used
    Failed(LoadFailure),
}

impl ResolvedLoad {
    /// True for a successful load
    pub fn is_loaded(&self) -> bool {
        matches!(self, ResolvedLoad::Loaded { .. })
    }

    /// The loaded module
    pub fn module(&self) -> Option<&Arc<Module>> {
        match self {
            ResolvedLoad::Loaded { module, .. } => Some(module),
            ResolvedLoad::Failed(_) => None,
        }
    }

    /// Installed version, also known for mismatches and bad ranges
    pub fn installed_version(&self) -> Option<&str> {
        match self {
            ResolvedLoad::Loaded {
                installed_version, ..
            } => Some(installed_version),
            ResolvedLoad::Failed(failure) => failure.installed_version.as_deref(),
        }
    }

    /// The failure, if the load failed
    pub fn failure(&self) -> Option<&LoadFailure> {
        match self {
            ResolvedLoad::Loaded { .. } => None,
            ResolvedLoad::Failed(failure) => Some(failure),
        }
    }
}

/// A declared dependency that is loaded at most once
pub struct ModuleSpec {
    descriptor: DependencyDescriptor,
    resolved: OnceLock<ResolvedLoad>,
}

impl ModuleSpec {
    /// Wrap a descriptor; nothing is checked yet
    pub fn new(descriptor: DependencyDescriptor) -> Self {
        Self {
            descriptor,
            resolved: OnceLock::new(),
        }
    }

    /// The descriptor this spec was created from
    pub fn descriptor(&self) -> &DependencyDescriptor {
        &self.descriptor
    }

    /// Dotted module name
    pub fn module_name(&self) -> &str {
        &self.descriptor.module_name
    }

    /// Key the module is exposed under
    pub fn alias(&self) -> &str {
        &self.descriptor.alias
    }

    /// The load result, if `load` has already run
    pub fn resolved(&self) -> Option<&ResolvedLoad> {
        self.resolved.get()
    }

    /// Resolve and import the dependency on the first call
    ///
    /// Later calls return the same result without touching the environment.
    /// Concurrent first calls are single-flight.
    pub fn load(&self, env: &Environment) -> &ResolvedLoad {
        self.resolved
            .get_or_init(|| resolve_load(&self.descriptor, env))
    }
}

impl fmt::Debug for ModuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleSpec")
            .field("descriptor", &self.descriptor)
            .field("resolved", &self.resolved.get())
            .finish()
    }
}

fn resolve_load(descriptor: &DependencyDescriptor, env: &Environment) -> ResolvedLoad {
    let module_name = descriptor.module_name.as_str();
    let fail = |kind: LoadFailureKind,
                installed_version: Option<&str>,
                message: String,
                hint: String| {
        debug!(module = module_name, %kind, "dependency load failed");
        ResolvedLoad::Failed(LoadFailure {
            module_name: module_name.to_string(),
            kind,
            installed_version: installed_version.map(str::to_string),
            message,
            hint: Some(hint),
        })
    };

    if descriptor.is_relative() {
        return fail(
            LoadFailureKind::RelativeImport,
            None,
            format!("relative import '{}' is not supported", module_name),
            "use the absolute module path".to_string(),
        );
    }

    let name = descriptor.installable_name();
    let spec_text = descriptor.specifier_text();
    debug!(module = module_name, distribution = name, specifier = spec_text, "loading dependency");

    let Some(installed) = env.distributions.version(name) else {
        return fail(
            LoadFailureKind::NotInstalled,
            None,
            format!("{} is not installed", name),
            install_hint(descriptor),
        );
    };

    let specifiers = match SpecifierSet::parse(spec_text) {
        Ok(specifiers) => specifiers,
        Err(e) => {
            return fail(
                LoadFailureKind::InvalidSpecifier,
                Some(&installed),
                format!("{} is not a valid specifier", spec_text),
                format!("fix the version range declared for {} ({})", module_name, e),
            );
        }
    };

    let satisfied = Version::parse(&installed)
        .map(|v| specifiers.contains(&v, true))
        .unwrap_or(false);
    if !satisfied {
        return fail(
            LoadFailureKind::VersionMismatch,
            Some(&installed),
            format!(
                "{} version {} does not meet requirement {}",
                name, installed, specifiers
            ),
            install_hint(descriptor),
        );
    }

    let module = match env.modules.get(module_name) {
        Some(module) => {
            debug!(module = module_name, "reusing cached module");
            module
        }
        None => match env.importer.find_spec(module_name) {
            Some(spec) if spec.loader.is_some() => {
                env.modules.insert(module_name, Arc::new(Module::new(spec)))
            }
            _ => {
                return fail(
                    LoadFailureKind::NoLoader,
                    Some(&installed),
                    format!(
                        "{} {} is installed but module {} could not be imported",
                        name, installed, module_name
                    ),
                    format!(
                        "check that {} provides module {} or declare the distribution with '{}->DIST'",
                        name, module_name, module_name
                    ),
                );
            }
        },
    };

    debug!(module = module_name, version = %installed, "dependency loaded");
    ResolvedLoad::Loaded {
        module,
        installed_version: installed,
    }
}

fn install_hint(descriptor: &DependencyDescriptor) -> String {
    match &descriptor.resolved_from {
        Some(resolution) => match (resolution.kind, &descriptor.extra_or_group) {
            (Some(MetaKind::Extra), Some(extra)) => {
                format!("install it with: pip install '{}[{}]'", resolution.source, extra)
            }
            (Some(MetaKind::Group), Some(group)) => format!(
                "install dependency group '{}' of {}",
                group, resolution.source
            ),
            _ => format!(
                "install it with: pip install '{}{}'",
                descriptor.installable_name(),
                descriptor.specifier_text()
            ),
        },
        None => format!(
            "install it with: pip install '{}{}'",
            descriptor.installable_name(),
            descriptor.specifier_text()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MetaResolution;
    use crate::loader::{InMemoryImporter, ModuleBody};
    use crate::metadata::InMemoryDistributions;

    fn env(importer: InMemoryImporter) -> Environment {
        let dists = InMemoryDistributions::new()
            .with_distribution("packaging", "23.0")
            .with_distribution("scikit-learn", "1.3.2")
            .with_distribution("weird", "not-a-version")
            .with_distribution("nightly", "2.0.0rc1");
        Environment::new(Arc::new(dists), Arc::new(importer))
    }

    fn importer() -> InMemoryImporter {
        InMemoryImporter::new()
            .with_module("packaging", ModuleBody::new().with_value("__version__", "23.0"))
            .with_module("sklearn", ModuleBody::new())
            .with_module("nightly", ModuleBody::new())
    }

    #[test]
    fn test_load_satisfied() {
        let env = env(importer());
        let spec = ModuleSpec::new(
            DependencyDescriptor::new("packaging").with_specifiers(">=20.9,<=30.0"),
        );
        let result = spec.load(&env);
        assert!(result.is_loaded());
        assert_eq!(result.installed_version(), Some("23.0"));
        assert_eq!(result.module().unwrap().name(), "packaging");
    }

    #[test]
    fn test_load_any_version() {
        let env = env(importer());
        let spec = ModuleSpec::new(DependencyDescriptor::new("packaging"));
        assert!(spec.load(&env).is_loaded());
    }

    #[test]
    fn test_load_version_mismatch() {
        let env = env(importer());
        let spec = ModuleSpec::new(DependencyDescriptor::new("packaging").with_specifiers(">=9999.0"));
        let failure = spec.load(&env).failure().unwrap().clone();
        assert_eq!(failure.kind, LoadFailureKind::VersionMismatch);
        assert_eq!(failure.installed_version.as_deref(), Some("23.0"));
        assert!(failure.message.contains("does not meet requirement"));
        assert!(failure.hint.unwrap().contains("pip install 'packaging>=9999.0'"));
    }

    #[test]
    fn test_load_not_installed() {
        let env = env(importer());
        let spec = ModuleSpec::new(DependencyDescriptor::new("dummy_not_installed"));
        let failure = spec.load(&env).failure().unwrap();
        assert_eq!(failure.kind, LoadFailureKind::NotInstalled);
        assert!(failure.installed_version.is_none());
        assert_eq!(failure.message, "dummy_not_installed is not installed");
    }

    #[test]
    fn test_load_invalid_specifier_keeps_version() {
        let env = env(importer());
        let spec = ModuleSpec::new(DependencyDescriptor::new("packaging").with_specifiers(">=>=1"));
        let failure = spec.load(&env).failure().unwrap();
        assert_eq!(failure.kind, LoadFailureKind::InvalidSpecifier);
        assert_eq!(failure.installed_version.as_deref(), Some("23.0"));
        assert!(failure.message.contains("is not a valid specifier"));
    }

    #[test]
    fn test_unparsable_installed_version_is_mismatch() {
        let env = env(importer());
        let spec = ModuleSpec::new(DependencyDescriptor::new("weird"));
        let failure = spec.load(&env).failure().unwrap();
        assert_eq!(failure.kind, LoadFailureKind::VersionMismatch);
    }

    #[test]
    fn test_installed_prerelease_accepted() {
        let env = env(importer());
        let spec = ModuleSpec::new(DependencyDescriptor::new("nightly").with_specifiers(">=1.0"));
        assert!(spec.load(&env).is_loaded());
    }

    #[test]
    fn test_relative_import_rejected() {
        let env = env(importer());
        let spec = ModuleSpec::new(DependencyDescriptor::new(".local"));
        let failure = spec.load(&env).failure().unwrap();
        assert_eq!(failure.kind, LoadFailureKind::RelativeImport);
    }

    #[test]
    fn test_no_loader() {
        let env = env(InMemoryImporter::new().with_unloadable("packaging"));
        let spec = ModuleSpec::new(DependencyDescriptor::new("packaging"));
        let failure = spec.load(&env).failure().unwrap();
        assert_eq!(failure.kind, LoadFailureKind::NoLoader);
        assert_eq!(failure.installed_version.as_deref(), Some("23.0"));

        let env = env_without_module();
        let spec = ModuleSpec::new(DependencyDescriptor::new("packaging"));
        assert_eq!(
            spec.load(&env).failure().unwrap().kind,
            LoadFailureKind::NoLoader
        );
    }

    fn env_without_module() -> Environment {
        env(InMemoryImporter::new())
    }

    #[test]
    fn test_distribution_mapping() {
        let env = env(importer());
        let spec = ModuleSpec::new(
            DependencyDescriptor::new("sklearn")
                .with_distribution("scikit-learn")
                .with_specifiers(">=1.3"),
        );
        assert_eq!(spec.load(&env).installed_version(), Some("1.3.2"));
    }

    #[test]
    fn test_load_is_idempotent_and_imports_once() {
        let importer = importer();
        let env = env(importer.clone());
        let spec = ModuleSpec::new(DependencyDescriptor::new("packaging"));

        let first = spec.load(&env) as *const ResolvedLoad;
        let second = spec.load(&env) as *const ResolvedLoad;
        assert_eq!(first, second);

        let module = spec.load(&env).module().unwrap();
        module.version().unwrap();
        module.version().unwrap();
        assert_eq!(importer.executions(), 1);
    }

    #[test]
    fn test_concurrent_first_load_runs_once() {
        let importer = importer();
        let env = env(importer.clone());
        let spec = ModuleSpec::new(DependencyDescriptor::new("packaging"));

        let (a, b) = std::thread::scope(|scope| {
            let first = scope.spawn(|| {
                let module = spec.load(&env).module().unwrap().clone();
                module.version().unwrap();
                module
            });
            let second = scope.spawn(|| {
                let module = spec.load(&env).module().unwrap().clone();
                module.version().unwrap();
                module
            });
            (first.join().unwrap(), second.join().unwrap())
        });

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.version().unwrap(), Some("23.0"));
        assert_eq!(importer.executions(), 1);
    }

    #[test]
    fn test_module_cache_shared_between_specs() {
        let env = env(importer());
        let a = ModuleSpec::new(DependencyDescriptor::new("packaging"));
        let b = ModuleSpec::new(DependencyDescriptor::new("packaging").with_alias("pkg"));
        let ma = a.load(&env).module().unwrap().clone();
        let mb = b.load(&env).module().unwrap().clone();
        assert!(Arc::ptr_eq(&ma, &mb));
    }

    #[test]
    fn test_extra_hint() {
        let env = env(importer());
        let mut desc = DependencyDescriptor::new("numpy").with_extra("array");
        desc.version_specifiers = Some(">=1.20".into());
        desc.resolved_from = Some(MetaResolution {
            source: "mytool".into(),
            kind: Some(MetaKind::Extra),
        });
        let spec = ModuleSpec::new(desc);
        let failure = spec.load(&env).failure().unwrap();
        assert_eq!(
            failure.hint.as_deref(),
            Some("install it with: pip install 'mytool[array]'")
        );
    }
}
