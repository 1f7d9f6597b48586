//! Dependency declaration parsers
//!
//! This module provides parsers for the two declaration forms:
//! - Compact strings: `name[@extra_or_group][->distribution][specifier][ as alias]`
//! - Structured records keyed by module name

mod grammar;
mod record;

pub use grammar::{parse_declaration, validate_module_name};
pub use record::DescriptorRecord;

use crate::domain::DependencyDescriptor;
use crate::error::SpecParseError;

/// The dependencies declared for one target, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleDeclarations {
    /// Compact grammar strings
    Compact(Vec<String>),
    /// Structured records keyed by module name
    Records(Vec<(String, DescriptorRecord)>),
    /// Ready-made descriptors
    Descriptors(Vec<DependencyDescriptor>),
}

impl ModuleDeclarations {
    /// Parse every declaration, failing on the first malformed one
    pub fn into_descriptors(self) -> Result<Vec<DependencyDescriptor>, SpecParseError> {
        match self {
            ModuleDeclarations::Compact(lines) => {
                lines.iter().map(|l| parse_declaration(l)).collect()
            }
            ModuleDeclarations::Records(records) => records
                .into_iter()
                .map(|(name, record)| record.into_descriptor(&name))
                .collect(),
            ModuleDeclarations::Descriptors(descriptors) => {
                descriptors.into_iter().map(check_descriptor).collect()
            }
        }
    }

    /// Number of declared dependencies
    pub fn len(&self) -> usize {
        match self {
            ModuleDeclarations::Compact(v) => v.len(),
            ModuleDeclarations::Records(v) => v.len(),
            ModuleDeclarations::Descriptors(v) => v.len(),
        }
    }

    /// True if nothing is declared
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ready-made descriptors must keep `extra_or_group` and `from_meta` in step
fn check_descriptor(
    descriptor: DependencyDescriptor,
) -> Result<DependencyDescriptor, SpecParseError> {
    match &descriptor.extra_or_group {
        Some(extra_or_group) if !descriptor.from_meta => {
            Err(SpecParseError::FromMetaConflict {
                module: descriptor.module_name.clone(),
                extra_or_group: extra_or_group.clone(),
            })
        }
        _ => Ok(descriptor),
    }
}

impl From<&str> for ModuleDeclarations {
    fn from(line: &str) -> Self {
        ModuleDeclarations::Compact(vec![line.to_string()])
    }
}

impl From<Vec<&str>> for ModuleDeclarations {
    fn from(lines: Vec<&str>) -> Self {
        ModuleDeclarations::Compact(lines.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ModuleDeclarations {
    fn from(lines: [&str; N]) -> Self {
        ModuleDeclarations::Compact(lines.iter().map(|l| l.to_string()).collect())
    }
}

impl From<Vec<String>> for ModuleDeclarations {
    fn from(lines: Vec<String>) -> Self {
        ModuleDeclarations::Compact(lines)
    }
}

impl From<Vec<(String, DescriptorRecord)>> for ModuleDeclarations {
    fn from(records: Vec<(String, DescriptorRecord)>) -> Self {
        ModuleDeclarations::Records(records)
    }
}

impl<const N: usize> From<[(&str, DescriptorRecord); N]> for ModuleDeclarations {
    fn from(records: [(&str, DescriptorRecord); N]) -> Self {
        ModuleDeclarations::Records(
            records
                .into_iter()
                .map(|(name, record)| (name.to_string(), record))
                .collect(),
        )
    }
}

impl From<DependencyDescriptor> for ModuleDeclarations {
    fn from(descriptor: DependencyDescriptor) -> Self {
        ModuleDeclarations::Descriptors(vec![descriptor])
    }
}

impl From<Vec<DependencyDescriptor>> for ModuleDeclarations {
    fn from(descriptors: Vec<DependencyDescriptor>) -> Self {
        ModuleDeclarations::Descriptors(descriptors)
    }
}
