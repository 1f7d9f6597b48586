//! Compact dependency declaration grammar
//!
//! Handles declarations like:
//! - Plain: `numpy`
//! - Range: `numpy>=1.20,<2.0`
//! - Alias: `numpy as np`
//! - Distribution mapping: `sklearn->scikit-learn`
//! - Meta-derived: `pandas@df`, `sklearn @ ml -> scikit-learn as sk`

use crate::domain::DependencyDescriptor;
use crate::error::SpecParseError;
use crate::version::SpecifierSet;
use regex::Regex;
use std::sync::LazyLock;

static DECLARATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)^\s*
        (?P<name>[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)?
        \s*(?:@\s*(?P<meta>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?))?
        \s*(?:->\s*(?P<dist>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?))?
        \s*(?P<spec>
            (?:===|~=|==|!=|<=|>=|<|>)\s*[^\s,]+
            (?:\s*,\s*(?:===|~=|==|!=|<=|>=|<|>)\s*[^\s,]+)*
        )?
        \s*(?:\bas\s+(?P<alias>[A-Za-z_][A-Za-z0-9_]*))?
        \s*$",
    )
    .unwrap()
});

static MODULE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap()
});

/// Parse one compact declaration into a descriptor
pub fn parse_declaration(input: &str) -> Result<DependencyDescriptor, SpecParseError> {
    let trimmed = input.trim();
    if trimmed.starts_with('.') {
        let module = trimmed
            .split(|c: char| c.is_whitespace() || "@-<>=!~,".contains(c))
            .next()
            .unwrap_or(trimmed);
        return Err(SpecParseError::relative_module(module));
    }

    let caps = DECLARATION_RE
        .captures(trimmed)
        .ok_or_else(|| SpecParseError::invalid_syntax(input))?;
    let name = caps
        .name("name")
        .map(|m| m.as_str())
        .ok_or_else(|| SpecParseError::empty_name(input))?;

    let mut descriptor = DependencyDescriptor::new(name);
    if let Some(meta) = caps.name("meta") {
        descriptor = descriptor.with_extra_or_group(meta.as_str());
    }
    if let Some(dist) = caps.name("dist") {
        descriptor = descriptor.with_distribution(dist.as_str());
    }
    if let Some(spec) = caps.name("spec") {
        let spec = normalize_specifier(spec.as_str());
        SpecifierSet::parse(&spec).map_err(|_| SpecParseError::invalid_syntax(input))?;
        descriptor = descriptor.with_specifiers(spec);
    }
    if let Some(alias) = caps.name("alias") {
        descriptor = descriptor.with_alias(alias.as_str());
    }
    Ok(descriptor)
}

/// Validate a bare module name used as a record key
pub fn validate_module_name(name: &str) -> Result<(), SpecParseError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SpecParseError::empty_name(name));
    }
    if trimmed.starts_with('.') {
        return Err(SpecParseError::relative_module(trimmed));
    }
    if !MODULE_NAME_RE.is_match(trimmed) {
        return Err(SpecParseError::invalid_syntax(name));
    }
    Ok(())
}

fn normalize_specifier(spec: &str) -> String {
    spec.split(',')
        .map(|part| part.split_whitespace().collect::<String>())
        .collect::<Vec<_>>()
        .join(",")
}
