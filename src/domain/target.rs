//! Targets that dependency declarations attach to

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a declaration target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// A type whose instances expose a modules view
    Class,
    /// A callable that receives the modules map
    Function,
    /// Anything else; rejected at declaration time
    #[serde(untagged)]
    Other(String),
}

impl TargetKind {
    /// Parse a kind name as used in configuration files
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "class" | "type" => TargetKind::Class,
            "function" | "fn" | "callable" => TargetKind::Function,
            _ => TargetKind::Other(name.trim().to_string()),
        }
    }

    /// True for classes and functions
    pub fn accepts_dependencies(&self) -> bool {
        matches!(self, TargetKind::Class | TargetKind::Function)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Class => write!(f, "class"),
            TargetKind::Function => write!(f, "function"),
            TargetKind::Other(kind) => write!(f, "{}", kind),
        }
    }
}

/// A named consumer of optional dependencies
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    /// Consumer name recorded in the usage register
    pub name: String,
    /// What kind of thing the consumer is
    pub kind: TargetKind,
}

impl Target {
    /// Creates a class target
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TargetKind::Class,
        }
    }

    /// Creates a function target
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TargetKind::Function,
        }
    }

    /// Creates a target of an arbitrary kind
    pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}
