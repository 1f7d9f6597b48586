//! Load failure types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a dependency could not be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadFailureKind {
    /// The distribution is not installed
    NotInstalled,
    /// The declared version range is malformed
    InvalidSpecifier,
    /// The installed version is outside the declared range
    VersionMismatch,
    /// No importable module or loader was found
    NoLoader,
    /// The module name is a relative import path
    RelativeImport,
}

impl LoadFailureKind {
    /// True for failures caused by the declaration rather than the environment
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            LoadFailureKind::RelativeImport | LoadFailureKind::InvalidSpecifier
        )
    }
}

impl fmt::Display for LoadFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadFailureKind::NotInstalled => write!(f, "not installed"),
            LoadFailureKind::InvalidSpecifier => write!(f, "invalid specifier"),
            LoadFailureKind::VersionMismatch => write!(f, "version mismatch"),
            LoadFailureKind::NoLoader => write!(f, "no loader"),
            LoadFailureKind::RelativeImport => write!(f, "relative import"),
        }
    }
}

/// A terminal failure to satisfy one descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFailure {
    /// Module the descriptor asked for
    pub module_name: String,
    /// Failure classification
    pub kind: LoadFailureKind,
    /// Installed version, when the distribution is present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,
    /// Human-readable message
    pub message: String,
    /// What to install or request to fix it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " ({})", hint)?;
        }
        Ok(())
    }
}
