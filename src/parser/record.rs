//! Structured dependency records
//!
//! A record describes one dependency keyed by its module name, e.g. in TOML:
//!
//! ```toml
//! [consumers.modules.sklearn]
//! distribution = "scikit-learn"
//! extra = "ml"
//! alias = "sk"
//! ```

use super::grammar::validate_module_name;
use crate::domain::DependencyDescriptor;
use crate::error::SpecParseError;
use serde::{Deserialize, Serialize};

/// One dependency in structured form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DescriptorRecord {
    /// Version range
    #[serde(alias = "specifier")]
    pub specifiers: Option<String>,
    /// Exposed name
    pub alias: Option<String>,
    /// Legacy extra of the source package
    pub extra: Option<String>,
    /// Dependency group of the source package
    pub group: Option<String>,
    /// Group-then-extra reference
    pub extra_or_group: Option<String>,
    /// Installable package name
    #[serde(alias = "distribution_name")]
    pub distribution: Option<String>,
    /// Whether to derive the range from the source metadata
    pub from_meta: Option<bool>,
}

impl DescriptorRecord {
    /// Creates an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the version range (builder pattern)
    pub fn with_specifiers(mut self, specifiers: impl Into<String>) -> Self {
        self.specifiers = Some(specifiers.into());
        self
    }

    /// Sets the alias (builder pattern)
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the extra (builder pattern)
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    /// Sets the dependency group (builder pattern)
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Sets the distribution name (builder pattern)
    pub fn with_distribution(mut self, distribution: impl Into<String>) -> Self {
        self.distribution = Some(distribution.into());
        self
    }

    /// Sets from_meta explicitly (builder pattern)
    pub fn with_from_meta(mut self, from_meta: bool) -> Self {
        self.from_meta = Some(from_meta);
        self
    }

    /// Validate the record and turn it into a descriptor
    pub fn into_descriptor(
        self,
        module_name: &str,
    ) -> Result<DependencyDescriptor, SpecParseError> {
        validate_module_name(module_name)?;
        let module_name = module_name.trim();

        let meta_refs = [
            self.extra.as_deref(),
            self.group.as_deref(),
            self.extra_or_group.as_deref(),
        ];
        if meta_refs.iter().flatten().count() > 1 {
            return Err(SpecParseError::ExtraAndGroup {
                module: module_name.to_string(),
                extra: self
                    .extra
                    .clone()
                    .or_else(|| self.extra_or_group.clone())
                    .unwrap_or_default(),
                group: self
                    .group
                    .clone()
                    .or_else(|| self.extra_or_group.clone())
                    .unwrap_or_default(),
            });
        }

        let mut descriptor = DependencyDescriptor::new(module_name);
        if let Some(extra) = self.extra {
            descriptor = descriptor.with_extra(extra);
        } else if let Some(group) = self.group {
            descriptor = descriptor.with_group(group);
        } else if let Some(name) = self.extra_or_group {
            descriptor = descriptor.with_extra_or_group(name);
        }

        match (self.from_meta, &descriptor.extra_or_group) {
            (Some(false), Some(name)) => {
                return Err(SpecParseError::FromMetaConflict {
                    module: module_name.to_string(),
                    extra_or_group: name.clone(),
                });
            }
            (Some(true), _) => descriptor = descriptor.from_meta(),
            _ => {}
        }

        if let Some(spec) = self.specifiers {
            descriptor = descriptor.with_specifiers(spec.trim());
        }
        if let Some(dist) = self.distribution {
            descriptor = descriptor.with_distribution(dist.trim());
        }
        if let Some(alias) = self.alias {
            descriptor = descriptor.with_alias(alias.trim());
        }
        Ok(descriptor)
    }
}
