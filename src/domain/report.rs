//! Dependency report types
//!
//! Provides the read-only projection of one spec-log entry after its load has
//! been forced.

use super::LoadFailureKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a forced load, as reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    /// Installed, compatible and importable
    Satisfied,
    /// Not installed, not importable, or declared incorrectly
    Missing,
    /// Installed at a version outside the declared range
    VersionMismatch,
}

impl ModuleStatus {
    /// Classify a failure kind
    pub fn from_failure(kind: LoadFailureKind) -> Self {
        match kind {
            LoadFailureKind::VersionMismatch => ModuleStatus::VersionMismatch,
            _ => ModuleStatus::Missing,
        }
    }

    /// Plain label
    pub fn label(&self) -> &'static str {
        match self {
            ModuleStatus::Satisfied => "satisfied",
            ModuleStatus::Missing => "missing",
            ModuleStatus::VersionMismatch => "version mismatch",
        }
    }

    /// True if the dependency is usable
    pub fn is_satisfied(&self) -> bool {
        matches!(self, ModuleStatus::Satisfied)
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Report row for one (descriptor, consumer) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleReport {
    /// Declared module
    pub module_name: String,
    /// Effective version range (empty for any)
    pub specifier: String,
    /// Extra or group the range was derived from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_or_group: Option<String>,
    /// Installed version, if the distribution is present
    pub installed_version: Option<String>,
    /// Classification of the load result
    pub status: ModuleStatus,
    /// Consumer that declared the dependency
    pub used_by: String,
    /// Failure message for unsatisfied rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ModuleReport {
    /// True if the dependency is usable
    pub fn is_satisfied(&self) -> bool {
        self.status.is_satisfied()
    }
}
