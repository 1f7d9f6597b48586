//! PEP 440 version model
//!
//! This module provides:
//! - Version parsing and total ordering
//! - Single specifiers and comma-separated specifier sets

mod specifier;
#[allow(clippy::module_inception)]
mod version;

pub use specifier::{Operator, Specifier, SpecifierSet};
pub use version::{LocalSegment, PreRelease, Version};
