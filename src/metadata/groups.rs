//! Dependency groups (PEP 735) from `pyproject.toml`
//!
//! Handles tables like:
//!
//! ```toml
//! [dependency-groups]
//! test = ["pytest>=7", "coverage"]
//! dev = [{include-group = "test"}, "ruff"]
//! ```
//!
//! Group names are canonicalised and `include-group` entries are expanded
//! in place.

use crate::error::{DeclarationError, MetadataError, OptDepsError};
use crate::requirement::{canonicalize_name, Requirement};
use std::collections::BTreeMap;
use std::path::Path;
use toml::{Table, Value};

enum GroupEntry {
    Requirement(String),
    Include(String),
}

/// Read the dependency groups of a `pyproject.toml` file
pub fn read_dependency_groups(
    path: &Path,
    source: &str,
) -> Result<BTreeMap<String, Vec<Requirement>>, OptDepsError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| MetadataError::read_error(path, e))?;
    let table: Table = toml::from_str(&content)
        .map_err(|e| MetadataError::toml_parse_error(path, e.to_string()))?;
    Ok(parse_dependency_groups(&table, source)?)
}

/// Expand the `[dependency-groups]` table of a parsed `pyproject.toml`
pub fn parse_dependency_groups(
    pyproject: &Table,
    source: &str,
) -> Result<BTreeMap<String, Vec<Requirement>>, DeclarationError> {
    let Some(table) = pyproject.get("dependency-groups").and_then(|v| v.as_table()) else {
        return Ok(BTreeMap::new());
    };

    let mut raw = BTreeMap::new();
    for (name, entries) in table {
        let entries = entries
            .as_array()
            .ok_or_else(|| invalid_entry(name, entries, source))?
            .iter()
            .map(|entry| parse_entry(entry, source))
            .collect::<Result<Vec<_>, _>>()?;
        raw.insert(canonicalize_name(name), entries);
    }

    let mut groups = BTreeMap::new();
    for name in raw.keys() {
        let mut stack = Vec::new();
        let requirements = expand(name, &raw, source, &mut stack)?;
        groups.insert(name.clone(), requirements);
    }
    Ok(groups)
}

fn parse_entry(entry: &Value, source: &str) -> Result<GroupEntry, DeclarationError> {
    match entry {
        Value::String(s) => Ok(GroupEntry::Requirement(s.clone())),
        Value::Table(t) => match t.get("include-group").and_then(|v| v.as_str()) {
            Some(group) if t.len() == 1 => Ok(GroupEntry::Include(group.to_string())),
            _ => Err(invalid_entry("include-group", entry, source)),
        },
        other => Err(invalid_entry("dependency-groups", other, source)),
    }
}

fn invalid_entry(context: &str, value: &Value, source: &str) -> DeclarationError {
    DeclarationError::InvalidRequirement {
        requirement: value.to_string(),
        source_name: source.to_string(),
        message: format!("unsupported entry in {}", context),
    }
}

fn expand(
    name: &str,
    raw: &BTreeMap<String, Vec<GroupEntry>>,
    source: &str,
    stack: &mut Vec<String>,
) -> Result<Vec<Requirement>, DeclarationError> {
    if stack.iter().any(|n| n == name) {
        return Err(DeclarationError::GroupCycle {
            group: name.to_string(),
            source_name: source.to_string(),
        });
    }
    let entries = raw.get(name).ok_or_else(|| DeclarationError::InvalidGroup {
        group: name.to_string(),
        source_name: source.to_string(),
    })?;

    stack.push(name.to_string());
    let mut requirements = Vec::new();
    for entry in entries {
        match entry {
            GroupEntry::Requirement(text) => {
                let requirement =
                    Requirement::parse(text).map_err(|e| DeclarationError::InvalidRequirement {
                        requirement: text.clone(),
                        source_name: source.to_string(),
                        message: e.to_string(),
                    })?;
                requirements.push(requirement);
            }
            GroupEntry::Include(included) => {
                requirements.extend(expand(&canonicalize_name(included), raw, source, stack)?);
            }
        }
    }
    stack.pop();
    Ok(requirements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(content: &str) -> Result<BTreeMap<String, Vec<Requirement>>, DeclarationError> {
        let table: Table = toml::from_str(content).unwrap();
        parse_dependency_groups(&table, "demo")
    }

    #[test]
    fn test_no_groups_table() {
        assert!(parse("[project]\nname = \"demo\"\n").unwrap().is_empty());
    }

    #[test]
    fn test_plain_groups() {
        let groups = parse(
            r#"
[dependency-groups]
Test_Suite = ["pytest>=7", "coverage"]
"#,
        )
        .unwrap();
        let test = &groups["test-suite"];
        assert_eq!(test.len(), 2);
        assert_eq!(test[0].name, "pytest");
        assert_eq!(test[0].specifier_text(), ">=7");
    }

    #[test]
    fn test_include_group_expands_in_place() {
        let groups = parse(
            r#"
[dependency-groups]
test = ["pytest"]
dev = ["black", {include-group = "test"}, "ruff"]
"#,
        )
        .unwrap();
        let names: Vec<_> = groups["dev"].iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["black", "pytest", "ruff"]);
    }

    #[test]
    fn test_include_cycle_rejected() {
        let err = parse(
            r#"
[dependency-groups]
a = [{include-group = "b"}]
b = [{include-group = "a"}]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, DeclarationError::GroupCycle { .. }));
    }

    #[test]
    fn test_include_unknown_group() {
        let err = parse(
            r#"
[dependency-groups]
dev = [{include-group = "missing"}]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, DeclarationError::InvalidGroup { ref group, .. } if group == "missing"));
    }

    #[test]
    fn test_invalid_requirement_in_group() {
        let err = parse(
            r#"
[dependency-groups]
dev = ["pytest >=>= 1"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, DeclarationError::InvalidRequirement { .. }));
    }

    #[test]
    fn test_read_dependency_groups_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pyproject.toml");
        std::fs::write(&path, "[dependency-groups]\nml = [\"scikit-learn>=1.3\"]\n").unwrap();
        let groups = read_dependency_groups(&path, "demo").unwrap();
        assert_eq!(groups["ml"][0].name, "scikit-learn");
    }

    #[test]
    fn test_read_dependency_groups_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pyproject.toml");
        std::fs::write(&path, "[dependency-groups\n").unwrap();
        assert!(matches!(
            read_dependency_groups(&path, "demo"),
            Err(OptDepsError::Metadata(MetadataError::TomlParseError { .. }))
        ));
    }
}
