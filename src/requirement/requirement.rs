//! PEP 508 requirement strings
//!
//! Handles `Requires-Dist` entries like:
//! - `numpy>=1.20,<2.0`
//! - `pandas (>=2.0) ; extra == "df"`
//! - `requests[socks]>=2.28 ; python_version >= "3.8"`
//! - `pkg @ https://example.com/pkg.whl ; extra == "url"`

use super::{canonicalize_name, Marker};
use crate::error::RequirementError;
use crate::version::SpecifierSet;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static REQUIREMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[(?P<extras>[^\]]*)\])?\s*(?P<rest>.*?)\s*$",
    )
    .unwrap()
});

/// A parsed dependency requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Project name as written
    pub name: String,
    /// Requested extras of the dependency itself
    pub extras: Vec<String>,
    /// Version constraint (empty for URL requirements)
    pub specifier: SpecifierSet,
    /// Direct reference URL
    pub url: Option<String>,
    /// Environment marker
    pub marker: Option<Marker>,
}

impl Requirement {
    /// Parse a requirement string
    pub fn parse(input: &str) -> Result<Self, RequirementError> {
        let caps = REQUIREMENT_RE
            .captures(input)
            .ok_or_else(|| RequirementError::invalid(input, "expected a project name"))?;
        let name = caps["name"].to_string();
        let extras = caps
            .name("extras")
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or("");

        let (url, spec_text, marker_text) = if let Some(url_part) = rest.strip_prefix('@') {
            let url_part = url_part.trim_start();
            match url_part.find(" ;").or_else(|| url_part.find("\t;")) {
                Some(idx) => (
                    Some(url_part[..idx].trim().to_string()),
                    "",
                    Some(&url_part[idx + 2..]),
                ),
                None => (Some(url_part.trim().to_string()), "", None),
            }
        } else {
            match rest.split_once(';') {
                Some((spec, marker)) => (None, spec, Some(marker)),
                None => (None, rest, None),
            }
        };

        if url.as_deref() == Some("") {
            return Err(RequirementError::invalid(input, "empty URL"));
        }

        let mut spec_text = spec_text.trim();
        if let Some(inner) = spec_text
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
        {
            spec_text = inner.trim();
        }
        let specifier = SpecifierSet::parse(spec_text)
            .map_err(|e| RequirementError::invalid(input, e.to_string()))?;

        let marker = match marker_text.map(str::trim) {
            Some("") => return Err(RequirementError::invalid(input, "empty marker")),
            Some(text) => Some(
                Marker::parse(text).map_err(|e| RequirementError::invalid(input, e.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            name,
            extras,
            specifier,
            url,
            marker,
        })
    }

    /// Normalized project name
    pub fn canonical_name(&self) -> String {
        canonicalize_name(&self.name)
    }

    /// The version constraint rendered as a specifier string
    pub fn specifier_text(&self) -> String {
        self.specifier.to_string()
    }
}

impl FromStr for Requirement {
    type Err = RequirementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Requirement::parse(s)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        if let Some(url) = &self.url {
            write!(f, " @ {}", url)?;
            if self.marker.is_some() {
                write!(f, " ")?;
            }
        } else {
            write!(f, "{}", self.specifier)?;
        }
        if let Some(marker) = &self.marker {
            write!(f, "; {}", marker)?;
        }
        Ok(())
    }
}
