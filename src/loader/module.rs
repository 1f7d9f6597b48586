//! Located and lazily executed modules

use super::ModuleLoader;
use crate::error::ExecError;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock, OnceLock};
use tracing::debug;

static DEF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(?:async\s+)?def\s+([A-Za-z_]\w*)").unwrap());

static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^class\s+([A-Za-z_]\w*)").unwrap());

static ASSIGN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([A-Za-z_]\w*)\s*(?::[^=\n]*)?=[ \t]*([^=\n].*?)\s*$").unwrap()
});

/// Where a module was found and how to execute it
#[derive(Clone)]
pub struct ImportSpec {
    /// Fully qualified module name
    pub name: String,
    /// File the module is loaded from; `None` for namespace packages
    pub origin: Option<PathBuf>,
    /// Directories searched for submodules; non-empty for packages
    pub search_locations: Vec<PathBuf>,
    /// Executes the module; a spec without a loader cannot be imported
    pub loader: Option<Arc<dyn ModuleLoader>>,
}

impl ImportSpec {
    /// Creates a spec with no origin and no loader
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: None,
            search_locations: Vec::new(),
            loader: None,
        }
    }

    /// Sets the origin file (builder pattern)
    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Adds a submodule search location (builder pattern)
    pub fn with_search_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.search_locations.push(location.into());
        self
    }

    /// Sets the loader (builder pattern)
    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// True for packages, including namespace packages
    pub fn is_package(&self) -> bool {
        !self.search_locations.is_empty()
    }
}

impl fmt::Debug for ImportSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportSpec")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("search_locations", &self.search_locations)
            .field("has_loader", &self.loader.is_some())
            .finish()
    }
}

/// A top-level name defined by a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// `def name(...)`
    Function,
    /// `class Name`
    Class,
    /// `name = value`, right-hand side with string quotes removed
    Value(String),
    /// A submodule of a (namespace) package
    Submodule,
}

/// The names a module defines once executed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleBody {
    attributes: BTreeMap<String, Attribute>,
}

impl ModuleBody {
    /// Creates an empty body
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the top-level definitions of a Python source file
    pub fn from_source(source: &str) -> Self {
        let mut body = Self::new();
        for caps in ASSIGN_RE.captures_iter(source) {
            body.attributes
                .insert(caps[1].to_string(), Attribute::Value(unquote(&caps[2])));
        }
        for caps in DEF_RE.captures_iter(source) {
            body.attributes.insert(caps[1].to_string(), Attribute::Function);
        }
        for caps in CLASS_RE.captures_iter(source) {
            body.attributes.insert(caps[1].to_string(), Attribute::Class);
        }
        body
    }

    /// Adds an attribute (builder pattern)
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.insert(name, attribute);
        self
    }

    /// Adds a string value (builder pattern)
    pub fn with_value(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_attribute(name, Attribute::Value(value.into()))
    }

    /// Adds or replaces an attribute
    pub fn insert(&mut self, name: impl Into<String>, attribute: Attribute) {
        self.attributes.insert(name.into(), attribute);
    }

    /// Look up one attribute
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Every defined name, sorted
    pub fn names(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }
    value.to_string()
}

/// An imported module whose body runs on first attribute access
pub struct Module {
    spec: ImportSpec,
    body: OnceLock<Result<ModuleBody, ExecError>>,
}

impl Module {
    /// Wrap a spec; nothing is executed yet
    pub fn new(spec: ImportSpec) -> Self {
        Self {
            spec,
            body: OnceLock::new(),
        }
    }

    /// Fully qualified module name
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// The spec the module was created from
    pub fn spec(&self) -> &ImportSpec {
        &self.spec
    }

    /// True once the body has run
    pub fn is_executed(&self) -> bool {
        self.body.get().is_some()
    }

    /// Execute the body if needed and return it
    pub fn body(&self) -> Result<&ModuleBody, ExecError> {
        self.body
            .get_or_init(|| {
                debug!(module = %self.spec.name, "executing module");
                match &self.spec.loader {
                    Some(loader) => loader.exec_module(&self.spec),
                    None => Err(ExecError::NoOrigin {
                        module: self.spec.name.clone(),
                    }),
                }
            })
            .as_ref()
            .map_err(|e| e.clone())
    }

    /// Look up an attribute, executing the module on first use
    pub fn attribute(&self, name: &str) -> Result<Option<&Attribute>, ExecError> {
        Ok(self.body()?.get(name))
    }

    /// Every name the module defines
    pub fn names(&self) -> Result<Vec<&str>, ExecError> {
        Ok(self.body()?.names())
    }

    /// The module's `__version__` value, if it defines one
    pub fn version(&self) -> Result<Option<&str>, ExecError> {
        Ok(match self.attribute("__version__")? {
            Some(Attribute::Value(v)) => Some(v.as_str()),
            _ => None,
        })
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.spec.name)
            .field("origin", &self.spec.origin)
            .field("executed", &self.is_executed())
            .finish()
    }
}
