//! PEP 508 requirement model
//!
//! This module provides:
//! - Name normalization for projects, extras and groups
//! - Environment marker parsing and evaluation
//! - Requirement string parsing

mod marker;
mod name;
#[allow(clippy::module_inception)]
mod requirement;

pub use marker::{Marker, MarkerEnvironment};
pub use name::{canonicalize_name, names_match};
pub use requirement::Requirement;
