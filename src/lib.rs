//! optdeps - lazy optional-dependency declarations for Python environments
//!
//! This library lets a consumer declare the optional Python modules it needs
//! and defers every check until first use:
//! - Compact (`sklearn@ml->scikit-learn>=1.0 as sk`) or structured declarations
//! - Version ranges derived from a source package's extras and dependency groups
//! - At-most-once, cached module loading from site-packages
//! - Aggregated failures and per-declaration reports

pub mod attach;
pub mod cli;
pub mod config;
pub mod domain;
pub mod environment;
pub mod error;
pub mod loader;
pub mod manager;
pub mod metadata;
pub mod module_spec;
pub mod orchestrator;
pub mod output;
pub mod parser;
pub mod registry;
pub mod requirement;
pub mod version;

pub use attach::{Declaration, Dependent, DependentClass, DependentFn, ModuleMap};
pub use domain::{DependencyDescriptor, LoadFailure, LoadFailureKind, ModuleReport, ModuleStatus, Target};
pub use environment::Environment;
pub use error::{DependencyError, OptDepsError};
pub use manager::DependencyManager;
pub use module_spec::{ModuleSpec, ResolvedLoad};
pub use parser::{DescriptorRecord, ModuleDeclarations};
