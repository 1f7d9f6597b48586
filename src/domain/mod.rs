//! Core domain models for optdeps
//!
//! This module contains the fundamental types used throughout the library:
//! - Dependency descriptors and how their ranges are derived
//! - Load failure classification
//! - Report rows and statuses
//! - Declaration targets

mod descriptor;
mod load_failure;
mod report;
mod target;

pub use descriptor::{DependencyDescriptor, MetaKind, MetaLookup, MetaResolution};
pub use load_failure::{LoadFailure, LoadFailureKind};
pub use report::{ModuleReport, ModuleStatus};
pub use target::{Target, TargetKind};
