//! Installed distributions found in site-packages directories
//!
//! Handles:
//! - Wheel installs: `name-1.0.dist-info/METADATA`
//! - Legacy installs: `name-1.0.egg-info/PKG-INFO` (directory) or a bare
//!   `name-1.0.egg-info` file
//!
//! Directories are scanned once, on the first lookup.

use super::{read_metadata, DistributionMetadata, DistributionProvider};
use crate::requirement::canonicalize_name;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// An installed distribution and where its metadata lives
#[derive(Debug, Clone)]
struct IndexedDistribution {
    metadata: DistributionMetadata,
    path: PathBuf,
}

/// Distribution lookup over one or more site-packages directories
#[derive(Debug)]
pub struct SitePackages {
    roots: Vec<PathBuf>,
    index: OnceLock<HashMap<String, IndexedDistribution>>,
}

impl SitePackages {
    /// Creates a provider over the given directories, searched in order
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            index: OnceLock::new(),
        }
    }

    /// The directories searched, in priority order
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Canonical names of every installed distribution, sorted
    pub fn distributions(&self) -> Vec<String> {
        let mut names: Vec<_> = self.index().keys().cloned().collect();
        names.sort();
        names
    }

    /// Path of the metadata file backing a distribution
    pub fn locate(&self, name: &str) -> Option<&Path> {
        self.index()
            .get(&canonicalize_name(name))
            .map(|d| d.path.as_path())
    }

    fn index(&self) -> &HashMap<String, IndexedDistribution> {
        self.index.get_or_init(|| {
            let mut index = HashMap::new();
            for root in &self.roots {
                scan_root(root, &mut index);
            }
            debug!(
                distributions = index.len(),
                roots = self.roots.len(),
                "indexed site-packages"
            );
            index
        })
    }
}

impl DistributionProvider for SitePackages {
    fn metadata(&self, name: &str) -> Option<DistributionMetadata> {
        self.index()
            .get(&canonicalize_name(name))
            .map(|d| d.metadata.clone())
    }
}

fn scan_root(root: &Path, index: &mut HashMap<String, IndexedDistribution>) {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %root.display(), error = %e, "cannot read site-packages directory");
            return;
        }
    };

    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        let Some(metadata_path) = metadata_file(&path) else {
            continue;
        };
        match read_metadata(&metadata_path) {
            Ok(metadata) => {
                let key = canonicalize_name(&metadata.name);
                if index.contains_key(&key) {
                    debug!(name = %key, path = %metadata_path.display(), "shadowed distribution skipped");
                    continue;
                }
                index.insert(
                    key,
                    IndexedDistribution {
                        metadata,
                        path: metadata_path,
                    },
                );
            }
            Err(e) => warn!(error = %e, "skipping unreadable distribution metadata"),
        }
    }
}

fn metadata_file(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    if name.ends_with(".dist-info") && path.is_dir() {
        Some(path.join("METADATA"))
    } else if name.ends_with(".egg-info") {
        if path.is_dir() {
            Some(path.join("PKG-INFO"))
        } else {
            Some(path.to_path_buf())
        }
    } else {
        None
    }
}

/// Locate the site-packages directories of a virtual environment
///
/// Handles POSIX layouts (`lib/pythonX.Y/site-packages`, also under
/// `lib64`) and Windows layouts (`Lib/site-packages`).
pub fn find_site_packages(venv: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();

    let windows = venv.join("Lib").join("site-packages");
    if windows.is_dir() {
        found.push(windows);
    }

    for lib in ["lib", "lib64"] {
        let Ok(entries) = std::fs::read_dir(venv.join(lib)) else {
            continue;
        };
        let mut candidates: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("python"))
            })
            .map(|p| p.join("site-packages"))
            .filter(|p| p.is_dir())
            .collect();
        candidates.sort();
        for candidate in candidates {
            if !found.contains(&candidate) {
                found.push(candidate);
            }
        }
    }

    found
}
