//! The collaborators a load runs against

use crate::loader::{FileSystemImporter, ModuleCache, ModuleImporter};
use crate::metadata::{DistributionProvider, SitePackages};
use crate::requirement::MarkerEnvironment;
use std::path::PathBuf;
use std::sync::Arc;

/// Installed distributions, module lookup, module cache and marker values
#[derive(Clone)]
pub struct Environment {
    /// Installed distribution metadata
    pub distributions: Arc<dyn DistributionProvider>,
    /// Module lookup
    pub importer: Arc<dyn ModuleImporter>,
    /// Imported modules shared by every descriptor
    pub modules: ModuleCache,
    /// Values environment markers are evaluated against
    pub markers: MarkerEnvironment,
}

impl Environment {
    /// Creates an environment with an empty module cache and host markers
    pub fn new(
        distributions: Arc<dyn DistributionProvider>,
        importer: Arc<dyn ModuleImporter>,
    ) -> Self {
        Self {
            distributions,
            importer,
            modules: ModuleCache::new(),
            markers: MarkerEnvironment::host(),
        }
    }

    /// Metadata and modules both come from the given site-packages directories
    pub fn from_site_packages(dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        let dirs: Vec<PathBuf> = dirs.into_iter().map(Into::into).collect();
        Self::new(
            Arc::new(SitePackages::new(dirs.clone())),
            Arc::new(FileSystemImporter::new(dirs)),
        )
    }

    /// Replaces the marker environment (builder pattern)
    pub fn with_markers(mut self, markers: MarkerEnvironment) -> Self {
        self.markers = markers;
        self
    }

    /// Shares an existing module cache (builder pattern)
    pub fn with_module_cache(mut self, modules: ModuleCache) -> Self {
        self.modules = modules;
        self
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("modules", &self.modules.names())
            .field("markers", &self.markers)
            .finish()
    }
}
