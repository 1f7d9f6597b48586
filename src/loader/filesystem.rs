//! Module lookup on the filesystem
//!
//! Resolution order for `a.b` within each search root:
//! - Regular package: `a/b/__init__.py`
//! - Plain module: `a/b.py`
//! - Extension module: `a/b.*.so`, `a/b.so`, `a/b.*.pyd`, `a/b.pyd`
//! - Namespace portion: `a/b/` without `__init__.py`
//!
//! A regular package, module or extension in any root beats namespace
//! portions; namespace portions from every root are merged.

use super::{Attribute, ImportSpec, ModuleBody, ModuleImporter, ModuleLoader};
use crate::error::ExecError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Finds modules below a list of search roots, in order
#[derive(Debug, Clone)]
pub struct FileSystemImporter {
    roots: Vec<PathBuf>,
}

impl FileSystemImporter {
    /// Creates an importer over the given roots
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    /// The search roots, in priority order
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

enum Found {
    Package(PathBuf, PathBuf),
    Source(PathBuf),
    Extension(PathBuf),
    Namespace(PathBuf),
}

impl ModuleImporter for FileSystemImporter {
    fn find_spec(&self, name: &str) -> Option<ImportSpec> {
        let parts: Vec<&str> = name.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        let (last, parents) = parts.split_last()?;

        let mut namespace_portions = Vec::new();
        for root in &self.roots {
            let base = parents.iter().fold(root.clone(), |dir, p| dir.join(p));
            if !base.is_dir() {
                continue;
            }
            match find_in(&base, last) {
                Some(Found::Package(init, dir)) => {
                    debug!(module = name, origin = %init.display(), "found package");
                    return Some(
                        ImportSpec::new(name)
                            .with_origin(init)
                            .with_search_location(dir)
                            .with_loader(Arc::new(SourceLoader)),
                    );
                }
                Some(Found::Source(path)) => {
                    debug!(module = name, origin = %path.display(), "found module");
                    return Some(
                        ImportSpec::new(name)
                            .with_origin(path)
                            .with_loader(Arc::new(SourceLoader)),
                    );
                }
                Some(Found::Extension(path)) => {
                    debug!(module = name, origin = %path.display(), "found extension module");
                    return Some(
                        ImportSpec::new(name)
                            .with_origin(path)
                            .with_loader(Arc::new(ExtensionLoader)),
                    );
                }
                Some(Found::Namespace(dir)) => namespace_portions.push(dir),
                None => {}
            }
        }

        if namespace_portions.is_empty() {
            return None;
        }
        debug!(module = name, portions = namespace_portions.len(), "found namespace package");
        let spec = namespace_portions
            .into_iter()
            .fold(ImportSpec::new(name), |spec, dir| spec.with_search_location(dir));
        Some(spec.with_loader(Arc::new(NamespaceLoader)))
    }
}

fn find_in(base: &Path, name: &str) -> Option<Found> {
    let dir = base.join(name);
    let init = dir.join("__init__.py");
    if init.is_file() {
        return Some(Found::Package(init, dir));
    }

    let source = base.join(format!("{}.py", name));
    if source.is_file() {
        return Some(Found::Source(source));
    }

    if let Some(extension) = find_extension(base, name) {
        return Some(Found::Extension(extension));
    }

    if dir.is_dir() {
        return Some(Found::Namespace(dir));
    }
    None
}

fn find_extension(base: &Path, name: &str) -> Option<PathBuf> {
    let prefix = format!("{}.", name);
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(base)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| {
                        n.starts_with(&prefix) && (n.ends_with(".so") || n.ends_with(".pyd"))
                    })
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

fn base_body(spec: &ImportSpec) -> ModuleBody {
    let mut body = ModuleBody::new().with_value("__name__", spec.name.clone());
    if let Some(origin) = &spec.origin {
        body.insert("__file__", Attribute::Value(origin.display().to_string()));
    }
    body
}

/// Executes `.py` sources by collecting their top-level definitions
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceLoader;

impl ModuleLoader for SourceLoader {
    fn exec_module(&self, spec: &ImportSpec) -> Result<ModuleBody, ExecError> {
        let origin = spec.origin.as_ref().ok_or_else(|| ExecError::NoOrigin {
            module: spec.name.clone(),
        })?;
        let source = std::fs::read_to_string(origin).map_err(|e| ExecError::ReadError {
            module: spec.name.clone(),
            path: origin.clone(),
            message: e.to_string(),
        })?;

        let mut body = ModuleBody::from_source(&source);
        for (name, attribute) in [
            ("__name__", Attribute::Value(spec.name.clone())),
            ("__file__", Attribute::Value(origin.display().to_string())),
        ] {
            body.insert(name, attribute);
        }
        Ok(body)
    }
}

/// Compiled extension modules; only the module metadata is visible
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionLoader;

impl ModuleLoader for ExtensionLoader {
    fn exec_module(&self, spec: &ImportSpec) -> Result<ModuleBody, ExecError> {
        if spec.origin.is_none() {
            return Err(ExecError::NoOrigin {
                module: spec.name.clone(),
            });
        }
        Ok(base_body(spec))
    }
}

/// Namespace packages expose their submodules and subpackages
#[derive(Debug, Clone, Copy, Default)]
pub struct NamespaceLoader;

impl ModuleLoader for NamespaceLoader {
    fn exec_module(&self, spec: &ImportSpec) -> Result<ModuleBody, ExecError> {
        let mut body = base_body(spec);
        for dir in &spec.search_locations {
            let entries = std::fs::read_dir(dir).map_err(|e| ExecError::ReadError {
                module: spec.name.clone(),
                path: dir.clone(),
                message: e.to_string(),
            })?;
            for path in entries.flatten().map(|e| e.path()) {
                if let Some(name) = submodule_name(&path) {
                    body.insert(name, Attribute::Submodule);
                }
            }
        }
        Ok(body)
    }
}

fn submodule_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    if file_name.starts_with('.') || file_name == "__pycache__" {
        return None;
    }
    if path.is_dir() {
        return (!file_name.contains('.')).then(|| file_name.to_string());
    }
    if let Some(stem) = file_name.strip_suffix(".py") {
        return Some(stem.to_string());
    }
    if file_name.ends_with(".so") || file_name.ends_with(".pyd") {
        return file_name.split('.').next().map(str::to_string);
    }
    None
}
