//! Integration tests for optdeps
//!
//! These tests verify:
//! - Declarations against a real site-packages layout on disk
//! - Version ranges derived from a source package's extras and groups
//! - Deferred, at-most-once loading and aggregated failures
//! - Report rows and the usage/version registers

use optdeps::domain::{ModuleStatus, Target};
use optdeps::error::{DeclarationError, DependencyError, OptDepsError};
use optdeps::metadata::MetaSource;
use optdeps::parser::parse_declaration;
use optdeps::{DependencyManager, Environment, ResolvedLoad};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Test fixture directory creation helper
fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Install a distribution: dist-info metadata plus the given module files
fn install(site: &Path, name: &str, version: &str, headers: &str, files: &[(&str, &str)]) {
    let dist_info = site.join(format!("{}-{}.dist-info", name.replace('-', "_"), version));
    fs::create_dir_all(&dist_info).unwrap();
    fs::write(
        dist_info.join("METADATA"),
        format!(
            "Metadata-Version: 2.1\nName: {}\nVersion: {}\n{}\n\nLong description body.\n",
            name, version, headers
        ),
    )
    .unwrap();
    for (path, content) in files {
        let path = site.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// A site-packages with packaging, numpy, scikit-learn and a source package
fn create_site() -> TempDir {
    let site = create_test_dir();
    let root = site.path();
    install(
        root,
        "packaging",
        "23.0",
        "",
        &[("packaging/__init__.py", "__version__ = \"23.0\"\n\ndef parse(v):\n    pass\n")],
    );
    install(
        root,
        "numpy",
        "1.26.0",
        "",
        &[
            ("numpy/__init__.py", "__version__ = '1.26.0'\nclass ndarray:\n    pass\n"),
            ("numpy/linalg/__init__.py", "def norm(x):\n    pass\n"),
        ],
    );
    install(
        root,
        "scikit-learn",
        "1.3.2",
        "",
        &[("sklearn/__init__.py", "__version__ = \"1.3.2\"\n")],
    );
    install(
        root,
        "mytool",
        "0.1.0",
        "Requires-Dist: packaging>=20.9\n\
         Requires-Dist: numpy>=1.20; extra == \"array\"\n\
         Requires-Dist: scikit-learn<2,>=1.0; extra == \"ml\"\n\
         Requires-Dist: pandas>=2; extra == \"frames\"\n\
         Requires-Dist: pywin32>=300; sys_platform == \"win32\"\n\
         Provides-Extra: array\n\
         Provides-Extra: ml\n\
         Provides-Extra: frames",
        &[("mytool/__init__.py", "")],
    );
    site
}

fn environment(site: &TempDir) -> Environment {
    Environment::from_site_packages([site.path()])
}

mod declaration {
    use super::*;

    /// The alias defaults to the module name
    #[test]
    fn test_default_alias() {
        let descriptor = parse_declaration("numpy").unwrap();
        assert_eq!(descriptor.alias, "numpy");
        assert!(descriptor.version_specifiers.is_none());
    }

    /// Every grammar segment is honoured
    #[test]
    fn test_full_compact_grammar() {
        let descriptor = parse_declaration("sklearn@ml->scikit-learn as sk").unwrap();
        assert_eq!(descriptor.module_name, "sklearn");
        assert_eq!(descriptor.extra_or_group.as_deref(), Some("ml"));
        assert_eq!(descriptor.distribution_name.as_deref(), Some("scikit-learn"));
        assert_eq!(descriptor.alias, "sk");
        assert!(descriptor.from_meta);
    }

    /// Declaring never imports or checks versions
    #[test]
    fn test_declaration_is_lazy() {
        let site = create_site();
        let env = environment(&site);
        let manager = DependencyManager::new(env.clone());
        let declaration = manager
            .decorate(&Target::class("Model"), ["numpy", "dummy_not_installed"])
            .unwrap();
        assert!(declaration.specs().iter().all(|s| s.resolved().is_none()));
        assert!(env.modules.is_empty());
        assert!(manager.version_register().is_empty());
        assert_eq!(manager.usage_register()["dummy_not_installed"], vec!["Model"]);
    }
}

mod metadata_resolution {
    use super::*;

    fn manager(site: &TempDir) -> DependencyManager {
        DependencyManager::with_source(environment(site), "mytool").unwrap()
    }

    /// Ranges come from the source's Requires-Dist entries
    #[test]
    fn test_extra_range() {
        let site = create_site();
        let manager = manager(&site);
        let declaration = manager
            .decorate(&Target::class("Model"), ["sklearn@ml->scikit-learn as sk"])
            .unwrap();
        let descriptor = declaration.specs()[0].descriptor();
        assert_eq!(descriptor.version_specifiers.as_deref(), Some("<2,>=1.0"));
    }

    /// Same source, target and extra always yield the same range
    #[test]
    fn test_resolution_is_deterministic() {
        let site = create_site();
        let manager = manager(&site);
        let first = manager
            .decorate(&Target::function("a"), ["numpy@array"])
            .unwrap();
        let second = manager
            .decorate(&Target::function("b"), ["numpy@array"])
            .unwrap();
        assert_eq!(
            first.specs()[0].descriptor().version_specifiers,
            second.specs()[0].descriptor().version_specifiers
        );
    }

    /// Unknown extras fail at declaration
    #[test]
    fn test_unknown_extra() {
        let site = create_site();
        let err = manager(&site)
            .decorate(&Target::class("Model"), ["numpy@nope"])
            .unwrap_err();
        assert!(matches!(
            err,
            OptDepsError::Declaration(DeclarationError::InvalidExtraOrGroup { .. })
        ));
        assert!(err.to_string().contains("is not a valid extra or dependency group"));
    }

    /// A target absent from the extra is not listed
    #[test]
    fn test_not_listed() {
        let site = create_site();
        let err = manager(&site)
            .decorate(&Target::class("Model"), ["scipy@array"])
            .unwrap_err();
        assert!(err.to_string().contains("is not listed as a dependency"));
    }

    /// Requirements whose markers do not hold are ignored
    #[test]
    fn test_unsatisfied_platform_marker() {
        let site = create_site();
        let mut markers = optdeps::requirement::MarkerEnvironment::host();
        markers.set("sys_platform", "linux");
        let env = environment(&site).with_markers(markers);
        let manager = DependencyManager::with_source(env, "mytool").unwrap();
        let record = optdeps::DescriptorRecord::new().with_from_meta(true);
        let err = manager
            .decorate(&Target::class("Model"), [("pywin32", record)])
            .unwrap_err();
        assert!(err.to_string().contains("sys_platform == \"win32\""));
    }

    /// Dependency groups come from pyproject.toml and win over extras
    #[test]
    fn test_dependency_group_from_pyproject() {
        let site = create_site();
        let project = create_test_dir();
        let pyproject = project.path().join("pyproject.toml");
        fs::write(
            &pyproject,
            r#"
[project]
name = "mytool"

[dependency-groups]
lint = ["packaging>=22"]
dev = ["numpy>=1.24", { include-group = "lint" }]
"#,
        )
        .unwrap();

        let env = environment(&site);
        let meta_source = MetaSource::new("mytool", env.distributions.as_ref())
            .unwrap()
            .with_pyproject(&pyproject)
            .unwrap();
        let manager = DependencyManager::with_meta_source(env, meta_source);
        let declaration = manager
            .decorate(&Target::function("lint"), ["packaging@dev", "numpy@dev"])
            .unwrap();
        let ranges: Vec<_> = declaration
            .specs()
            .iter()
            .map(|s| s.descriptor().specifier_text().to_string())
            .collect();
        assert_eq!(ranges, vec![">=22", ">=1.24"]);

        let rows = manager.report().unwrap();
        assert!(rows.iter().all(|r| r.status == ModuleStatus::Satisfied));
        assert_eq!(rows[0].extra_or_group.as_deref(), Some("dev"));
    }

    /// A group that includes itself is rejected
    #[test]
    fn test_group_cycle() {
        let site = create_site();
        let project = create_test_dir();
        let pyproject = project.path().join("pyproject.toml");
        fs::write(
            &pyproject,
            "[dependency-groups]\na = [{ include-group = \"b\" }]\nb = [{ include-group = \"a\" }]\n",
        )
        .unwrap();
        let env = environment(&site);
        let err = MetaSource::new("mytool", env.distributions.as_ref())
            .unwrap()
            .with_pyproject(&pyproject)
            .unwrap_err();
        assert!(err.to_string().contains("includes itself"));
    }
}

mod loading {
    use super::*;

    /// An installed version inside the range satisfies it
    #[test]
    fn test_range_satisfied() {
        let site = create_site();
        let manager = DependencyManager::new(environment(&site));
        let declaration = manager
            .decorate(&Target::function("f"), ["packaging>=20.9,<=30.0"])
            .unwrap();
        let resolved = declaration.specs()[0].load(manager.environment());
        assert!(resolved.is_loaded());
        assert_eq!(resolved.installed_version(), Some("23.0"));
    }

    /// No range accepts any installed version
    #[test]
    fn test_absent_specifier_accepts_any_version() {
        let site = create_site();
        let manager = DependencyManager::new(environment(&site));
        let declaration = manager
            .decorate(&Target::function("f"), ["numpy", "numpy.linalg as la"])
            .unwrap();
        let modules = declaration.load_all().unwrap();
        assert_eq!(modules.aliases(), vec!["numpy", "la"]);
        assert!(modules.get("la").unwrap().attribute("norm").unwrap().is_some());
    }

    /// An out-of-range version is reported as a mismatch
    #[test]
    fn test_version_mismatch() {
        let site = create_site();
        let manager = DependencyManager::new(environment(&site));
        let declaration = manager
            .decorate(&Target::function("f"), ["packaging>=9999.0"])
            .unwrap();
        match declaration.specs()[0].load(manager.environment()) {
            ResolvedLoad::Failed(failure) => {
                assert!(failure.message.contains("does not meet requirement"));
                assert_eq!(failure.installed_version.as_deref(), Some("23.0"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    /// A missing distribution is reported as not installed
    #[test]
    fn test_not_installed() {
        let site = create_site();
        let manager = DependencyManager::new(environment(&site));
        let declaration = manager
            .decorate(&Target::function("f"), ["dummy_not_installed"])
            .unwrap();
        let failure = declaration.specs()[0]
            .load(manager.environment())
            .failure()
            .cloned()
            .unwrap();
        assert!(failure.message.contains("is not installed"));
        assert!(failure.hint.unwrap().contains("pip install"));
    }

    /// Loading twice returns the same module and executes it once
    #[test]
    fn test_load_is_idempotent() {
        let site = create_site();
        let manager = DependencyManager::new(environment(&site));
        let declaration = manager
            .decorate(&Target::function("f"), ["numpy"])
            .unwrap();
        let spec = &declaration.specs()[0];
        let first = spec.load(manager.environment()).module().cloned().unwrap();
        let second = spec.load(manager.environment()).module().cloned().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(!first.is_executed());
        assert_eq!(first.version().unwrap(), Some("1.26.0"));
        assert!(first.is_executed());
    }

    /// Separate declarations of one module share the cached module
    #[test]
    fn test_module_cache_is_shared() {
        let site = create_site();
        let manager = DependencyManager::new(environment(&site));
        let a = manager.decorate(&Target::function("a"), ["numpy"]).unwrap();
        let b = manager.decorate(&Target::function("b"), ["numpy"]).unwrap();
        let ma = a.load_all().unwrap();
        let mb = b.load_all().unwrap();
        assert!(Arc::ptr_eq(ma.get("numpy").unwrap(), mb.get("numpy").unwrap()));
    }

    /// The distribution name maps to a differently named module
    #[test]
    fn test_distribution_mapping() {
        let site = create_site();
        let manager = DependencyManager::new(environment(&site));
        let declaration = manager
            .decorate(&Target::function("f"), ["sklearn->scikit-learn>=1.0 as sk"])
            .unwrap();
        let modules = declaration.load_all().unwrap();
        assert_eq!(modules.get("sk").unwrap().name(), "sklearn");
        assert_eq!(manager.version_register()["sklearn"], "1.3.2");
    }
}

mod attachment {
    use super::*;

    struct Model {
        layers: usize,
    }

    /// Construction succeeds; first use names only the unsatisfied module
    #[test]
    fn test_mixed_class() {
        let site = create_site();
        let manager = DependencyManager::new(environment(&site));
        let class = manager
            .class::<Model>("Model", ["numpy>=1.20 as np", "dummy_not_installed"])
            .unwrap();
        let instance = class.construct(Model { layers: 3 });
        assert_eq!(instance.layers, 3);

        let err = instance.modules().unwrap_err();
        assert_eq!(err.module_names(), vec!["dummy_not_installed"]);
        assert!(err.to_string().contains("dummy_not_installed is not installed"));
    }

    /// The aggregated error names every failed module
    #[test]
    fn test_aggregated_failures() {
        let site = create_site();
        let manager = DependencyManager::new(environment(&site));
        let class = manager
            .class::<()>(
                "Pipeline",
                ["missing_one", "packaging>=9999.0", "numpy", "missing_two"],
            )
            .unwrap();
        let err = class.construct(()).modules().unwrap_err();
        match &err {
            DependencyError::Unsatisfied { failures } => assert_eq!(failures.len(), 3),
            other => panic!("unexpected error {:?}", other),
        }
        let message = err.to_string();
        for name in ["'missing_one'", "'packaging'", "'missing_two'"] {
            assert!(message.contains(name), "{} not in {}", name, message);
        }
    }

    /// Wrapped functions receive the modules and load once
    #[test]
    fn test_function_receives_modules() {
        let site = create_site();
        let manager = DependencyManager::new(environment(&site));
        let describe = manager
            .function("describe", ["numpy as np"], |modules, suffix: char| {
                let np = modules.get("np").unwrap();
                format!("{}{}", np.version().unwrap().unwrap_or("?"), suffix)
            })
            .unwrap();
        assert_eq!(describe.call('!').unwrap(), "1.26.0!");
        assert_eq!(describe.call('?').unwrap(), "1.26.0?");
        assert_eq!(manager.environment().modules.len(), 1);
    }
}

mod reporting {
    use super::*;

    /// One row per (descriptor, consumer), in declaration order
    #[test]
    fn test_report_order_and_statuses() {
        let site = create_site();
        let manager = DependencyManager::new(environment(&site));
        manager
            .decorate(&Target::class("Model"), ["numpy", "packaging>=9999.0"])
            .unwrap();
        manager
            .decorate(&Target::function("fit"), ["dummy_not_installed", "numpy"])
            .unwrap();

        let rows = manager.report().unwrap();
        let summary: Vec<_> = rows
            .iter()
            .map(|r| (r.module_name.as_str(), r.used_by.as_str(), r.status))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("numpy", "Model", ModuleStatus::Satisfied),
                ("packaging", "Model", ModuleStatus::VersionMismatch),
                ("dummy_not_installed", "fit", ModuleStatus::Missing),
                ("numpy", "fit", ModuleStatus::Satisfied),
            ]
        );
        assert_eq!(manager.usage_register()["numpy"], vec!["Model", "fit"]);

        let versions = manager.version_register();
        assert_eq!(versions["packaging"], "23.0");
        assert!(!versions.contains_key("dummy_not_installed"));
    }

    /// Reports serialise with snake_case statuses
    #[test]
    fn test_report_json() {
        let site = create_site();
        let manager = DependencyManager::new(environment(&site));
        manager
            .decorate(&Target::function("f"), ["packaging>=9999.0"])
            .unwrap();
        let json = serde_json::to_value(manager.report().unwrap()).unwrap();
        assert_eq!(json[0]["status"], "version_mismatch");
        assert_eq!(json[0]["installed_version"], "23.0");
    }
}
