//! Version ranges derived from a source package's own metadata
//!
//! A source package lists its optional dependencies either as legacy extras
//! (`Provides-Extra` plus `Requires-Dist: x ; extra == "name"`) or as
//! dependency groups in its `pyproject.toml`. `MetaSource` answers "which
//! version range does the source declare for this dependency".

use super::{read_dependency_groups, DistributionProvider};
use crate::domain::{DependencyDescriptor, MetaKind, MetaLookup, MetaResolution};
use crate::error::{DeclarationError, OptDepsError};
use crate::requirement::{canonicalize_name, MarkerEnvironment, Requirement};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Parsed metadata of the source package
#[derive(Debug, Clone)]
pub struct MetaSource {
    source: String,
    version: String,
    requirements: Vec<Requirement>,
    extras: Vec<String>,
    groups: BTreeMap<String, Vec<Requirement>>,
}

impl MetaSource {
    /// Load the metadata of an installed source package
    pub fn new(source: &str, provider: &dyn DistributionProvider) -> Result<Self, DeclarationError> {
        let metadata = provider
            .metadata(source)
            .ok_or_else(|| DeclarationError::source_not_installed(source))?;

        let requirements = metadata
            .requires_dist
            .iter()
            .map(|text| {
                Requirement::parse(text).map_err(|e| DeclarationError::InvalidRequirement {
                    requirement: text.clone(),
                    source_name: source.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            source,
            version = %metadata.version,
            requirements = requirements.len(),
            extras = metadata.provides_extra.len(),
            "loaded source metadata"
        );

        Ok(Self {
            source: source.to_string(),
            version: metadata.version,
            requirements,
            extras: metadata.provides_extra,
            groups: BTreeMap::new(),
        })
    }

    /// Attach the dependency groups of a `pyproject.toml` (builder pattern)
    pub fn with_pyproject(self, path: &Path) -> Result<Self, OptDepsError> {
        let groups = read_dependency_groups(path, &self.source)?;
        Ok(self.with_groups(groups))
    }

    /// Attach already expanded dependency groups (builder pattern)
    pub fn with_groups(mut self, groups: BTreeMap<String, Vec<Requirement>>) -> Self {
        for (name, requirements) in groups {
            self.groups.insert(canonicalize_name(&name), requirements);
        }
        self
    }

    /// Name of the source package
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Installed version of the source package
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Every `Requires-Dist` entry of the source
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Declared extras, as written
    pub fn extras(&self) -> &[String] {
        &self.extras
    }

    /// Canonical names of the dependency groups
    pub fn groups(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    /// True if the source declares this extra
    pub fn has_extra(&self, extra: &str) -> bool {
        let wanted = canonicalize_name(extra);
        self.extras.iter().any(|e| canonicalize_name(e) == wanted)
    }

    /// True if the source declares this dependency group
    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(&canonicalize_name(group))
    }

    /// Version range the source declares for `target`
    ///
    /// With `extra`, requirements conditioned on that extra take precedence
    /// over unconditional ones.
    pub fn get_specifier(
        &self,
        target: &str,
        extra: Option<&str>,
        env: &MarkerEnvironment,
    ) -> Result<String, DeclarationError> {
        if let Some(extra) = extra {
            if !self.has_extra(extra) {
                return Err(DeclarationError::invalid_extra(extra, &self.source));
            }
        }

        let (satisfied, markers) = self.satisfied(&self.requirements, target, extra, env)?;
        let preferred: Vec<&Requirement> = match extra {
            Some(_) if satisfied.iter().any(|r| mentions_extra(r)) => {
                satisfied.into_iter().filter(|r| mentions_extra(r)).collect()
            }
            _ => satisfied,
        };
        if preferred.is_empty() {
            return Err(DeclarationError::not_listed(target, &self.source, markers));
        }
        self.single_specifier(target, &preferred)
    }

    /// Version range a dependency group declares for `target`
    pub fn get_group_specifier(
        &self,
        target: &str,
        group: &str,
        env: &MarkerEnvironment,
    ) -> Result<String, DeclarationError> {
        let requirements =
            self.groups
                .get(&canonicalize_name(group))
                .ok_or_else(|| DeclarationError::InvalidGroup {
                    group: group.to_string(),
                    source_name: self.source.clone(),
                })?;

        let (satisfied, _) = self.satisfied(requirements, target, None, env)?;
        if satisfied.is_empty() {
            return Err(DeclarationError::NotInGroup {
                target: target.to_string(),
                group: group.to_string(),
                source_name: self.source.clone(),
            });
        }
        self.single_specifier(target, &satisfied)
    }

    /// Resolve a name that may be a dependency group or an extra, group first
    pub fn resolve_extra_or_group(
        &self,
        target: &str,
        name: &str,
        env: &MarkerEnvironment,
    ) -> Result<(String, MetaKind), DeclarationError> {
        if self.has_group(name) {
            let spec = self.get_group_specifier(target, name, env)?;
            Ok((spec, MetaKind::Group))
        } else if self.has_extra(name) {
            let spec = self.get_specifier(target, Some(name), env)?;
            Ok((spec, MetaKind::Extra))
        } else {
            Err(DeclarationError::InvalidExtraOrGroup {
                name: name.to_string(),
                source_name: self.source.clone(),
            })
        }
    }

    /// Fill in the version range of a meta-derived descriptor
    ///
    /// Descriptors that already carry a range, or are not meta-derived, are
    /// returned unchanged.
    pub fn resolve(
        &self,
        descriptor: &DependencyDescriptor,
        env: &MarkerEnvironment,
    ) -> Result<DependencyDescriptor, DeclarationError> {
        if !descriptor.needs_meta_resolution() {
            return Ok(descriptor.clone());
        }

        let target = descriptor.installable_name();
        let (spec, kind) = match (&descriptor.extra_or_group, descriptor.meta_lookup) {
            (None, _) => (self.get_specifier(target, None, env)?, None),
            (Some(name), MetaLookup::Auto) => {
                let (spec, kind) = self.resolve_extra_or_group(target, name, env)?;
                (spec, Some(kind))
            }
            (Some(extra), MetaLookup::Extra) => (
                self.get_specifier(target, Some(extra), env)?,
                Some(MetaKind::Extra),
            ),
            (Some(group), MetaLookup::Group) => (
                self.get_group_specifier(target, group, env)?,
                Some(MetaKind::Group),
            ),
        };

        debug!(
            module = %descriptor.module_name,
            source = %self.source,
            specifier = %spec,
            "resolved specifier from source metadata"
        );

        let mut resolved = descriptor.clone();
        resolved.version_specifiers = Some(spec);
        resolved.resolved_from = Some(MetaResolution {
            source: self.source.clone(),
            kind,
        });
        Ok(resolved)
    }

    /// Requirements naming `target` whose marker holds, plus every marker seen
    fn satisfied<'a>(
        &self,
        requirements: &'a [Requirement],
        target: &str,
        extra: Option<&str>,
        env: &MarkerEnvironment,
    ) -> Result<(Vec<&'a Requirement>, Vec<String>), DeclarationError> {
        let wanted = canonicalize_name(target);
        let mut satisfied = Vec::new();
        let mut markers = Vec::new();

        for requirement in requirements.iter().filter(|r| r.canonical_name() == wanted) {
            match &requirement.marker {
                None => satisfied.push(requirement),
                Some(marker) => {
                    let holds = marker.evaluate(env, extra).map_err(|e| {
                        DeclarationError::InvalidMarker {
                            marker: marker.to_string(),
                            source_name: self.source.clone(),
                            message: e.to_string(),
                        }
                    })?;
                    if holds {
                        satisfied.push(requirement);
                    } else {
                        markers.push(marker.to_string());
                    }
                }
            }
        }
        Ok((satisfied, markers))
    }

    fn single_specifier(
        &self,
        target: &str,
        requirements: &[&Requirement],
    ) -> Result<String, DeclarationError> {
        let mut specifiers: Vec<String> = Vec::new();
        for requirement in requirements {
            let spec = requirement.specifier_text();
            if !specifiers.contains(&spec) {
                specifiers.push(spec);
            }
        }
        if specifiers.len() > 1 {
            return Err(DeclarationError::Ambiguous {
                target: target.to_string(),
                source_name: self.source.clone(),
                specifiers,
            });
        }
        Ok(specifiers.pop().unwrap_or_default())
    }
}

fn mentions_extra(requirement: &Requirement) -> bool {
    requirement
        .marker
        .as_ref()
        .is_some_and(|m| m.mentions_extra())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{DistributionMetadata, InMemoryDistributions};

    fn provider() -> InMemoryDistributions {
        InMemoryDistributions::new().with_metadata(
            DistributionMetadata::new("mytool", "1.0.0")
                .with_requirement("packaging>=20.9")
                .with_requirement("numpy>=1.20,<2.0 ; extra == \"array\"")
                .with_requirement("scikit-learn>=1.3 ; extra == \"ml\"")
                .with_requirement("pandas>=2.0 ; extra == \"df\"")
                .with_requirement("pandas>=1.5 ; extra == \"legacy\"")
                .with_requirement("colorama ; sys_platform == \"nonexistent\"")
                .with_requirement("rich>=13 ; extra == \"fancy\" and python_version >= \"3.8\"")
                .with_requirement("rich<13 ; extra == \"fancy\" and python_version < \"3.8\"")
                .with_requirement("tqdm>=4 ; extra == \"all\"")
                .with_requirement("tqdm>=4.60 ; extra == \"all\"")
                .with_extra("array")
                .with_extra("ml")
                .with_extra("df")
                .with_extra("legacy")
                .with_extra("fancy")
                .with_extra("all"),
        )
    }

    fn source() -> MetaSource {
        MetaSource::new("mytool", &provider()).unwrap()
    }

    fn env() -> MarkerEnvironment {
        MarkerEnvironment::host().with_python_version("3.12")
    }

    #[test]
    fn test_source_not_installed() {
        let err = MetaSource::new("nothere", &provider()).unwrap_err();
        assert_eq!(err, DeclarationError::source_not_installed("nothere"));
    }

    #[test]
    fn test_base_requirement() {
        assert_eq!(
            source().get_specifier("packaging", None, &env()).unwrap(),
            ">=20.9"
        );
    }

    #[test]
    fn test_extra_requirement() {
        let src = source();
        assert_eq!(
            src.get_specifier("numpy", Some("array"), &env()).unwrap(),
            ">=1.20,<2.0"
        );
        assert_eq!(
            src.get_specifier("pandas", Some("legacy"), &env()).unwrap(),
            ">=1.5"
        );
    }

    #[test]
    fn test_extra_lookup_is_deterministic() {
        let src = source();
        let first = src.get_specifier("pandas", Some("df"), &env()).unwrap();
        let second = src.get_specifier("pandas", Some("df"), &env()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_extra() {
        let err = source()
            .get_specifier("numpy", Some("nope"), &env())
            .unwrap_err();
        assert_eq!(err.to_string(), "nope is not a valid extra for mytool");
    }

    #[test]
    fn test_not_listed_reports_markers() {
        let err = source().get_specifier("colorama", None, &env()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("colorama is not listed as a dependency of mytool"));
        assert!(msg.contains("sys_platform == \"nonexistent\""));

        let err = source().get_specifier("flask", None, &env()).unwrap_err();
        assert_eq!(err.to_string(), "flask is not listed as a dependency of mytool");
    }

    #[test]
    fn test_string_and_unset_markers_resolve() {
        let provider = InMemoryDistributions::new().with_metadata(
            DistributionMetadata::new("tool", "1.0.0")
                .with_requirement("foo>=2 ; extra == \"b\" and platform_machine >= \"a\"")
                .with_requirement("bar>=1 ; extra == \"b\" and platform_release >= \"5.0\"")
                .with_requirement("bar<1 ; extra == \"b\" and platform_release < \"5.0\"")
                .with_extra("b"),
        );
        let src = MetaSource::new("tool", &provider).unwrap();
        let mut env = env();
        env.set("platform_machine", "x86_64");

        assert_eq!(src.get_specifier("foo", Some("b"), &env).unwrap(), ">=2");
        assert!(matches!(
            src.get_specifier("bar", Some("b"), &env),
            Err(DeclarationError::NotListed { .. })
        ));

        env.set("platform_release", "6.1.0");
        assert_eq!(src.get_specifier("bar", Some("b"), &env).unwrap(), ">=1");
    }

    #[test]
    fn test_extra_marker_filters_by_environment() {
        assert_eq!(
            source().get_specifier("rich", Some("fancy"), &env()).unwrap(),
            ">=13"
        );
        let old = MarkerEnvironment::host().with_python_version("3.7");
        assert_eq!(
            source().get_specifier("rich", Some("fancy"), &old).unwrap(),
            "<13"
        );
    }

    #[test]
    fn test_ambiguous_specifiers() {
        let err = source().get_specifier("tqdm", Some("all"), &env()).unwrap_err();
        assert!(matches!(err, DeclarationError::Ambiguous { ref specifiers, .. } if specifiers.len() == 2));
    }

    #[test]
    fn test_identical_specifiers_not_ambiguous() {
        let dists = InMemoryDistributions::new().with_metadata(
            DistributionMetadata::new("dup", "1.0")
                .with_requirement("numpy>=1.0 ; extra == \"a\"")
                .with_requirement("numpy >= 1.0 ; extra == \"a\" and os_name != \"nope\"")
                .with_extra("a"),
        );
        let src = MetaSource::new("dup", &dists).unwrap();
        assert_eq!(src.get_specifier("numpy", Some("a"), &env()).unwrap(), ">=1.0");
    }

    #[test]
    fn test_target_name_is_canonicalised() {
        assert_eq!(
            source()
                .get_specifier("Scikit_Learn", Some("ML"), &env())
                .unwrap(),
            ">=1.3"
        );
    }

    fn with_groups() -> MetaSource {
        let table: toml::Table = toml::from_str(
            r#"
[dependency-groups]
ml = ["scikit-learn>=1.4"]
test = ["pytest>=7"]
"#,
        )
        .unwrap();
        let groups = crate::metadata::parse_dependency_groups(&table, "mytool").unwrap();
        source().with_groups(groups)
    }

    #[test]
    fn test_group_wins_over_extra() {
        let src = with_groups();
        assert_eq!(
            src.resolve_extra_or_group("scikit-learn", "ml", &env()).unwrap(),
            (">=1.4".to_string(), MetaKind::Group)
        );
        assert_eq!(
            src.resolve_extra_or_group("numpy", "array", &env()).unwrap(),
            (">=1.20,<2.0".to_string(), MetaKind::Extra)
        );
    }

    #[test]
    fn test_invalid_extra_or_group() {
        let err = with_groups()
            .resolve_extra_or_group("numpy", "nope", &env())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "nope is not a valid extra or dependency group for mytool"
        );
    }

    #[test]
    fn test_not_in_group() {
        let err = with_groups()
            .resolve_extra_or_group("numpy", "test", &env())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "numpy is not listed in dependency group 'test' of mytool"
        );
    }

    #[test]
    fn test_resolve_descriptor_lookups() {
        let src = with_groups();
        let auto = DependencyDescriptor::new("sklearn")
            .with_extra_or_group("ml")
            .with_distribution("scikit-learn");
        let resolved = src.resolve(&auto, &env()).unwrap();
        assert_eq!(resolved.version_specifiers.as_deref(), Some(">=1.4"));
        assert_eq!(
            resolved.resolved_from,
            Some(MetaResolution {
                source: "mytool".into(),
                kind: Some(MetaKind::Group),
            })
        );

        let forced_extra = DependencyDescriptor::new("sklearn")
            .with_extra("ml")
            .with_distribution("scikit-learn");
        let resolved = src.resolve(&forced_extra, &env()).unwrap();
        assert_eq!(resolved.version_specifiers.as_deref(), Some(">=1.3"));

        let forced_group = DependencyDescriptor::new("numpy").with_group("array");
        assert!(matches!(
            src.resolve(&forced_group, &env()),
            Err(DeclarationError::InvalidGroup { .. })
        ));
    }

    #[test]
    fn test_resolve_base_requirement() {
        let desc = DependencyDescriptor::new("packaging").from_meta();
        let resolved = source().resolve(&desc, &env()).unwrap();
        assert_eq!(resolved.version_specifiers.as_deref(), Some(">=20.9"));
        assert_eq!(resolved.resolved_from.unwrap().kind, None);
    }

    #[test]
    fn test_explicit_specifier_wins() {
        let desc = DependencyDescriptor::new("numpy")
            .with_extra("array")
            .with_specifiers(">=1.0");
        let resolved = source().resolve(&desc, &env()).unwrap();
        assert_eq!(resolved, desc);
    }

    #[test]
    fn test_dotted_module_uses_first_segment() {
        let desc = DependencyDescriptor::new("numpy.linalg").with_extra("array");
        let resolved = source().resolve(&desc, &env()).unwrap();
        assert_eq!(resolved.version_specifiers.as_deref(), Some(">=1.20,<2.0"));
    }

    #[test]
    fn test_groups_listing() {
        assert_eq!(with_groups().groups(), vec!["ml", "test"]);
        assert_eq!(source().extras().len(), 6);
    }
}
