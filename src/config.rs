//! Configuration file support
//!
//! An `optdeps.toml` describes the Python environment to inspect and the
//! consumers whose dependencies should be audited:
//!
//! ```toml
//! site-packages = [".venv/lib/python3.12/site-packages"]
//! source = "mytool"
//! pyproject = "pyproject.toml"
//! python-version = "3.11"
//!
//! [markers]
//! sys_platform = "linux"
//!
//! [[consumers]]
//! name = "Model"
//! kind = "class"
//! specs = ["numpy>=1.20 as np"]
//!
//! [consumers.modules.sklearn]
//! extra = "ml"
//! distribution = "scikit-learn"
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use crate::domain::{DependencyDescriptor, Target, TargetKind};
use crate::error::{ConfigError, OptDepsError};
use crate::metadata::find_site_packages;
use crate::parser::{parse_declaration, DescriptorRecord};
use crate::requirement::MarkerEnvironment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the working directory when no config is given
pub const DEFAULT_CONFIG_FILE: &str = "optdeps.toml";

/// Contents of an `optdeps.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Directories scanned for distributions and modules, first match wins
    pub site_packages: Vec<PathBuf>,
    /// Package whose metadata supplies meta-derived ranges
    pub source: Option<String>,
    /// pyproject.toml declaring the source's dependency groups
    pub pyproject: Option<PathBuf>,
    /// Interpreter version markers are evaluated against
    pub python_version: Option<String>,
    /// Marker variable overrides
    pub markers: BTreeMap<String, String>,
    /// Consumers and their declarations, in file order
    pub consumers: Vec<ConsumerConfig>,
}

/// One consumer entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsumerConfig {
    /// Name recorded in the usage register
    pub name: String,
    /// `class` or `function`
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Compact declarations
    #[serde(default)]
    pub specs: Vec<String>,
    /// Structured declarations keyed by module name, in file order
    #[serde(default)]
    pub modules: toml::Table,
}

fn default_kind() -> String {
    "function".to_string()
}

impl Config {
    /// Read and parse a config file, resolving its relative paths
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let config = Self::parse(path, &content)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.resolve_paths(base))
    }

    /// Parse config content; `path` is only used in error messages
    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::parse_error(path, e.message()))
    }

    /// Load `optdeps.toml` from `dir` if present
    pub fn discover(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        debug!(path = %path.display(), "using config file");
        Self::load(&path).map(Some)
    }

    /// Make relative paths relative to `base`
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        self.site_packages = self
            .site_packages
            .into_iter()
            .map(|p| resolve_path(base, p))
            .collect();
        self.pyproject = self.pyproject.map(|p| resolve_path(base, p));
        self
    }

    /// Host markers with the configured overrides applied
    pub fn marker_environment(&self) -> Result<MarkerEnvironment, ConfigError> {
        let mut markers = MarkerEnvironment::host();
        if let Some(version) = &self.python_version {
            markers = markers.with_python_version(version);
        }
        for (name, value) in &self.markers {
            if !markers.set(name, value.as_str()) {
                return Err(ConfigError::UnknownMarker { name: name.clone() });
            }
        }
        Ok(markers)
    }
}

impl ConsumerConfig {
    /// Creates a function consumer with compact declarations
    pub fn new(name: impl Into<String>, specs: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: default_kind(),
            specs,
            modules: toml::Table::new(),
        }
    }

    /// The target this consumer declares for
    pub fn target(&self) -> Target {
        Target::new(&self.name, TargetKind::from_name(&self.kind))
    }

    /// Parse every declaration: compact specs first, then structured modules
    pub fn descriptors(&self) -> Result<Vec<DependencyDescriptor>, OptDepsError> {
        let mut descriptors = Vec::with_capacity(self.specs.len() + self.modules.len());
        for spec in &self.specs {
            descriptors.push(parse_declaration(spec)?);
        }
        for (module, value) in &self.modules {
            let record: DescriptorRecord =
                value
                    .clone()
                    .try_into()
                    .map_err(|e: toml::de::Error| ConfigError::InvalidModule {
                        consumer: self.name.clone(),
                        module: module.clone(),
                        message: e.message().to_string(),
                    })?;
            descriptors.push(record.into_descriptor(module)?);
        }
        Ok(descriptors)
    }
}

fn resolve_path(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Pick the site-packages directories to inspect
///
/// Explicit directories win over configured ones, which win over the
/// active virtualenv.
pub fn resolve_site_packages(
    explicit: &[PathBuf],
    configured: &[PathBuf],
    virtual_env: Option<&Path>,
) -> Result<Vec<PathBuf>, ConfigError> {
    if !explicit.is_empty() {
        return Ok(explicit.to_vec());
    }
    if !configured.is_empty() {
        return Ok(configured.to_vec());
    }
    if let Some(venv) = virtual_env {
        let found = find_site_packages(venv);
        debug!(venv = %venv.display(), found = found.len(), "searched virtualenv");
        if !found.is_empty() {
            return Ok(found);
        }
    }
    Err(ConfigError::NoSitePackages)
}
