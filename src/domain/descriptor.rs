//! Dependency descriptor: one not-yet-resolved request for an optional module

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an `extra_or_group` reference is looked up in the source metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaLookup {
    /// Try a dependency group first, then a legacy extra
    #[default]
    Auto,
    /// Only consult extras
    Extra,
    /// Only consult dependency groups
    Group,
}

/// Which mechanism a meta-derived specifier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaKind {
    /// `Provides-Extra` + `extra == "..."` markers
    Extra,
    /// PEP 735 dependency group
    Group,
}

impl fmt::Display for MetaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaKind::Extra => write!(f, "extra"),
            MetaKind::Group => write!(f, "group"),
        }
    }
}

/// Where a meta-derived specifier was resolved from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaResolution {
    /// Source package whose metadata was consulted
    pub source: String,
    /// Extra or group; `None` for the source's unconditional requirements
    pub kind: Option<MetaKind>,
}

/// A fully specified request to load one optional dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDescriptor {
    /// Dotted import path
    pub module_name: String,
    /// Installable package name when it differs from the import name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_name: Option<String>,
    /// Version range; `None` means any version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_specifiers: Option<String>,
    /// Key under which the loaded module is exposed
    pub alias: String,
    /// Extra or dependency group of the source package
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_or_group: Option<String>,
    /// How `extra_or_group` is looked up
    #[serde(default)]
    pub meta_lookup: MetaLookup,
    /// Whether the version range comes from the source package's metadata
    pub from_meta: bool,
    /// Filled in once a meta-derived specifier has been resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_from: Option<MetaResolution>,
}

impl DependencyDescriptor {
    /// Creates a descriptor accepting any installed version
    pub fn new(module_name: impl Into<String>) -> Self {
        let module_name = module_name.into();
        Self {
            alias: module_name.clone(),
            module_name,
            distribution_name: None,
            version_specifiers: None,
            extra_or_group: None,
            meta_lookup: MetaLookup::Auto,
            from_meta: false,
            resolved_from: None,
        }
    }

    /// Sets the version range (builder pattern)
    pub fn with_specifiers(mut self, specifiers: impl Into<String>) -> Self {
        self.version_specifiers = Some(specifiers.into());
        self
    }

    /// Sets the alias (builder pattern)
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Sets the distribution name (builder pattern)
    pub fn with_distribution(mut self, distribution: impl Into<String>) -> Self {
        self.distribution_name = Some(distribution.into());
        self
    }

    /// Derives the range from an extra or group, group first
    pub fn with_extra_or_group(mut self, name: impl Into<String>) -> Self {
        self.extra_or_group = Some(name.into());
        self.meta_lookup = MetaLookup::Auto;
        self.from_meta = true;
        self
    }

    /// Derives the range from an extra only
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra_or_group = Some(extra.into());
        self.meta_lookup = MetaLookup::Extra;
        self.from_meta = true;
        self
    }

    /// Derives the range from a dependency group only
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.extra_or_group = Some(group.into());
        self.meta_lookup = MetaLookup::Group;
        self.from_meta = true;
        self
    }

    /// Derives the range from the source's unconditional requirements
    pub fn from_meta(mut self) -> Self {
        self.from_meta = true;
        self
    }

    /// The package name used for metadata lookups
    pub fn installable_name(&self) -> &str {
        match &self.distribution_name {
            Some(dist) => dist,
            None => self
                .module_name
                .split('.')
                .next()
                .unwrap_or(&self.module_name),
        }
    }

    /// True if the module name is a relative import path
    pub fn is_relative(&self) -> bool {
        self.module_name.starts_with('.')
    }

    /// True if the range still has to be looked up in source metadata
    pub fn needs_meta_resolution(&self) -> bool {
        self.from_meta && self.version_specifiers.is_none() && self.resolved_from.is_none()
    }

    /// The range as text; empty when any version is accepted
    pub fn specifier_text(&self) -> &str {
        self.version_specifiers.as_deref().unwrap_or("")
    }
}

impl fmt::Display for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.module_name)?;
        if let Some(meta) = &self.extra_or_group {
            write!(f, "@{}", meta)?;
        }
        if let Some(dist) = &self.distribution_name {
            write!(f, "->{}", dist)?;
        }
        write!(f, "{}", self.specifier_text())?;
        if self.alias != self.module_name {
            write!(f, " as {}", self.alias)?;
        }
        Ok(())
    }
}
