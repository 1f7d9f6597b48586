//! Audit orchestrator for the command-line workflow
//!
//! This module provides:
//! - Workflow coordination: config → environment → declare → report
//! - Precedence of command-line values over config file values
//! - Site-packages discovery from the active virtualenv

use crate::cli::CliArgs;
use crate::config::{resolve_site_packages, Config};
use crate::domain::{ModuleReport, ModuleStatus, Target};
use crate::environment::Environment;
use crate::error::OptDepsError;
use crate::manager::DependencyManager;
use crate::metadata::MetaSource;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Orchestrator for one audit run
pub struct Orchestrator {
    /// CLI arguments, taking precedence over the config
    args: CliArgs,
    /// Loaded config file, if any
    config: Config,
    /// Value of `$VIRTUAL_ENV`
    virtual_env: Option<PathBuf>,
}

/// Result of running the orchestrator
#[derive(Debug, Clone)]
pub struct AuditResult {
    /// Source package ranges were derived from
    pub source: Option<String>,
    /// Directories that were inspected
    pub site_packages: Vec<PathBuf>,
    /// One row per (dependency, consumer) declaration
    pub reports: Vec<ModuleReport>,
}

impl AuditResult {
    /// Number of rows with the given status
    pub fn count(&self, status: ModuleStatus) -> usize {
        self.reports.iter().filter(|r| r.status == status).count()
    }

    /// True if every declared dependency is usable
    pub fn all_satisfied(&self) -> bool {
        self.reports.iter().all(ModuleReport::is_satisfied)
    }
}

impl Orchestrator {
    /// Create an orchestrator, loading the config named by the arguments
    /// or `optdeps.toml` from the working directory
    pub fn new(args: CliArgs) -> Result<Self, OptDepsError> {
        let config = match &args.config {
            Some(path) => Config::load(path)?,
            None => Config::discover(&std::env::current_dir().unwrap_or_default())?
                .unwrap_or_default(),
        };
        let virtual_env = std::env::var_os("VIRTUAL_ENV").map(PathBuf::from);
        Ok(Self::with_config(args, config, virtual_env))
    }

    /// Create an orchestrator from an already loaded config (for testing)
    pub fn with_config(args: CliArgs, config: Config, virtual_env: Option<PathBuf>) -> Self {
        Self {
            args,
            config,
            virtual_env,
        }
    }

    /// Build the manager, declare every configured dependency and report
    pub fn run(&self) -> Result<AuditResult, OptDepsError> {
        let site_packages = resolve_site_packages(
            &self.args.site_packages,
            &self.config.site_packages,
            self.virtual_env.as_deref(),
        )?;
        debug!(dirs = ?site_packages, "inspecting site-packages");

        let mut markers = self.config.marker_environment()?;
        if let Some(version) = &self.args.python_version {
            markers = markers.with_python_version(version);
        }
        let env = Environment::from_site_packages(site_packages.clone()).with_markers(markers);

        let source = self.args.source.clone().or_else(|| self.config.source.clone());
        let pyproject = self
            .args
            .pyproject
            .clone()
            .or_else(|| self.config.pyproject.clone());

        let manager = match &source {
            Some(name) => {
                let mut meta_source = MetaSource::new(name, env.distributions.as_ref())?;
                if let Some(path) = &pyproject {
                    meta_source = meta_source.with_pyproject(path)?;
                }
                DependencyManager::with_meta_source(env, meta_source)
            }
            None => {
                if let Some(path) = &pyproject {
                    warn!(path = %path.display(), "ignoring pyproject without a source package");
                }
                DependencyManager::new(env)
            }
        };

        for consumer in &self.config.consumers {
            manager.decorate(&consumer.target(), consumer.descriptors()?)?;
        }
        if self.args.has_specs() {
            manager.decorate(
                &Target::function(&self.args.consumer),
                self.args.specs.clone(),
            )?;
        }

        let reports = manager.report()?;
        Ok(AuditResult {
            source,
            site_packages,
            reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsumerConfig;
    use clap::Parser;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_dist(site: &Path, name: &str, version: &str, extra_headers: &str) {
        let dir = site.join(format!("{}-{}.dist-info", name, version));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("METADATA"),
            format!(
                "Metadata-Version: 2.1\nName: {}\nVersion: {}\n{}",
                name, version, extra_headers
            ),
        )
        .unwrap();
        let pkg = site.join(name.replace('-', "_"));
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("__init__.py"), "").unwrap();
    }

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_dist(dir.path(), "packaging", "23.0", "");
        write_dist(
            dir.path(),
            "mytool",
            "0.1.0",
            "Provides-Extra: array\nRequires-Dist: packaging>=20.9; extra == \"array\"\n",
        );
        dir
    }

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["optdeps"];
        argv.extend_from_slice(extra);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn test_run_with_cli_specs() {
        let site = site();
        let site_arg = site.path().to_str().unwrap();
        let orchestrator = Orchestrator::with_config(
            args(&["--site-packages", site_arg, "packaging>=20.9", "dummy_not_installed"]),
            Config::default(),
            None,
        );
        let result = orchestrator.run().unwrap();
        assert_eq!(result.reports.len(), 2);
        assert_eq!(result.count(ModuleStatus::Satisfied), 1);
        assert_eq!(result.count(ModuleStatus::Missing), 1);
        assert!(!result.all_satisfied());
        assert!(result.reports.iter().all(|r| r.used_by == "cli"));
    }

    #[test]
    fn test_run_with_source_from_config() {
        let site = site();
        let config = Config {
            site_packages: vec![site.path().to_path_buf()],
            source: Some("mytool".into()),
            consumers: vec![ConsumerConfig::new("fit", vec!["packaging@array".into()])],
            ..Config::default()
        };
        let result = Orchestrator::with_config(args(&[]), config, None)
            .run()
            .unwrap();
        assert_eq!(result.source.as_deref(), Some("mytool"));
        assert_eq!(result.reports[0].specifier, ">=20.9");
        assert_eq!(result.reports[0].used_by, "fit");
        assert!(result.all_satisfied());
    }

    #[test]
    fn test_cli_site_packages_override_config() {
        let site = site();
        let config = Config {
            site_packages: vec![PathBuf::from("/nonexistent")],
            ..Config::default()
        };
        let site_arg = site.path().to_str().unwrap();
        let result = Orchestrator::with_config(
            args(&["--site-packages", site_arg, "packaging"]),
            config,
            None,
        )
        .run()
        .unwrap();
        assert_eq!(result.site_packages, vec![site.path().to_path_buf()]);
        assert!(result.all_satisfied());
    }

    #[test]
    fn test_nothing_declared() {
        let site = site();
        let site_arg = site.path().to_str().unwrap();
        let err = Orchestrator::with_config(args(&["--site-packages", site_arg]), Config::default(), None)
            .run()
            .unwrap_err();
        assert!(matches!(err, OptDepsError::NothingDeclared));
    }

    #[test]
    fn test_missing_source_package() {
        let site = site();
        let site_arg = site.path().to_str().unwrap();
        let err = Orchestrator::with_config(
            args(&["--site-packages", site_arg, "--source", "nothere", "packaging"]),
            Config::default(),
            None,
        )
        .run()
        .unwrap_err();
        assert_eq!(err.to_string(), "source package 'nothere' is not installed");
    }

    #[test]
    fn test_no_site_packages() {
        let err = Orchestrator::with_config(args(&["packaging"]), Config::default(), None)
            .run()
            .unwrap_err();
        assert!(matches!(
            err,
            OptDepsError::Config(crate::error::ConfigError::NoSitePackages)
        ));
    }
}
