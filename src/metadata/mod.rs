//! Installed distribution metadata
//!
//! This module provides:
//! - The `DistributionProvider` trait used to look up installed packages
//! - `SitePackages`, which scans `*.dist-info` / `*.egg-info` directories
//! - `InMemoryDistributions` for embedding and tests
//! - `MetaSource`, which derives version ranges from a source package

mod dist_info;
mod groups;
mod memory;
mod meta_source;
mod site_packages;

pub use dist_info::{parse_metadata, read_metadata};
pub use groups::{parse_dependency_groups, read_dependency_groups};
pub use memory::InMemoryDistributions;
pub use meta_source::MetaSource;
pub use site_packages::{find_site_packages, SitePackages};

use serde::{Deserialize, Serialize};

/// Core metadata of one installed distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionMetadata {
    /// Project name as written in the `Name` header
    pub name: String,
    /// Installed version as written in the `Version` header
    pub version: String,
    /// Raw `Requires-Dist` entries, in file order
    pub requires_dist: Vec<String>,
    /// `Provides-Extra` names, in file order
    pub provides_extra: Vec<String>,
}

impl DistributionMetadata {
    /// Creates metadata without requirements or extras
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            requires_dist: Vec::new(),
            provides_extra: Vec::new(),
        }
    }

    /// Adds a `Requires-Dist` entry (builder pattern)
    pub fn with_requirement(mut self, requirement: impl Into<String>) -> Self {
        self.requires_dist.push(requirement.into());
        self
    }

    /// Adds a `Provides-Extra` entry (builder pattern)
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.provides_extra.push(extra.into());
        self
    }
}

/// Lookup of installed distributions by project name
///
/// Names are compared in canonical form, so `PyYAML`, `pyyaml` and `py_yaml`
/// all refer to the same distribution.
pub trait DistributionProvider: Send + Sync {
    /// Metadata of the named distribution, if installed
    fn metadata(&self, name: &str) -> Option<DistributionMetadata>;

    /// Installed version of the named distribution
    fn version(&self, name: &str) -> Option<String> {
        self.metadata(name).map(|m| m.version)
    }
}
