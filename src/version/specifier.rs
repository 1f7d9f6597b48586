//! PEP 440 version specifiers
//!
//! Handles version constraints like:
//! - Comparison: `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3`, `!=1.2.3`
//! - Exact and wildcard: `==1.2.3`, `==1.2.*`
//! - Compatible release: `~=1.2.3`
//! - Arbitrary equality: `===foobar`
//! - Sets: `>=1.0, <2.0`

use super::Version;
use crate::error::VersionError;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static SPECIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(===|~=|==|!=|<=|>=|<|>)\s*(\S+?)\s*$").unwrap());

/// Comparison operator of a single specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    LessOrEqual,
    GreaterOrEqual,
    Less,
    Greater,
    Compatible,
    Arbitrary,
}

impl Operator {
    fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "==" => Operator::Equal,
            "!=" => Operator::NotEqual,
            "<=" => Operator::LessOrEqual,
            ">=" => Operator::GreaterOrEqual,
            "<" => Operator::Less,
            ">" => Operator::Greater,
            "~=" => Operator::Compatible,
            "===" => Operator::Arbitrary,
            _ => return None,
        })
    }

    /// The operator as written in a specifier
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessOrEqual => "<=",
            Operator::GreaterOrEqual => ">=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::Compatible => "~=",
            Operator::Arbitrary => "===",
        }
    }
}

/// The right-hand side of a specifier
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Exact(Version),
    /// `==1.2.*`: the version without the trailing `.*`
    Prefix(Version),
    /// `===` compares raw strings
    Raw(String),
}

/// A single version specifier such as `>=1.2`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    operator: Operator,
    target: Target,
    raw_version: String,
}

impl Specifier {
    /// Parse a single specifier
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let caps = SPECIFIER_RE
            .captures(input)
            .ok_or_else(|| VersionError::invalid_specifier(input, "expected an operator followed by a version"))?;
        let operator = Operator::from_symbol(&caps[1])
            .ok_or_else(|| VersionError::invalid_specifier(input, "unknown operator"))?;
        let raw_version = caps[2].to_string();

        let target = match operator {
            Operator::Arbitrary => Target::Raw(raw_version.clone()),
            Operator::Equal | Operator::NotEqual => match raw_version.strip_suffix(".*") {
                Some(prefix) => {
                    let version = Version::parse(prefix)
                        .map_err(|_| VersionError::invalid_specifier(input, "invalid version"))?;
                    if version.local.is_some() {
                        return Err(VersionError::invalid_specifier(
                            input,
                            "local versions cannot be combined with a wildcard",
                        ));
                    }
                    Target::Prefix(version)
                }
                None => Target::Exact(
                    Version::parse(&raw_version)
                        .map_err(|_| VersionError::invalid_specifier(input, "invalid version"))?,
                ),
            },
            _ => {
                let version = Version::parse(&raw_version)
                    .map_err(|_| VersionError::invalid_specifier(input, "invalid version"))?;
                if version.local.is_some() {
                    return Err(VersionError::invalid_specifier(
                        input,
                        "local versions are only allowed with == and !=",
                    ));
                }
                if operator == Operator::Compatible && version.release.len() < 2 {
                    return Err(VersionError::invalid_specifier(
                        input,
                        "~= requires at least two release segments",
                    ));
                }
                Target::Exact(version)
            }
        };

        Ok(Self {
            operator,
            target,
            raw_version,
        })
    }

    /// The comparison operator
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The version text as written
    pub fn version_text(&self) -> &str {
        &self.raw_version
    }

    /// True if the specifier itself names a pre-release
    pub fn mentions_prerelease(&self) -> bool {
        match &self.target {
            Target::Exact(v) | Target::Prefix(v) => v.is_prerelease(),
            Target::Raw(_) => false,
        }
    }

    /// Check whether a version satisfies this specifier
    pub fn contains(&self, candidate: &Version) -> bool {
        match (&self.operator, &self.target) {
            (Operator::Arbitrary, Target::Raw(raw)) => {
                candidate.to_string().eq_ignore_ascii_case(raw.trim())
            }
            (Operator::Equal, Target::Prefix(prefix)) => prefix_matches(prefix, candidate),
            (Operator::NotEqual, Target::Prefix(prefix)) => !prefix_matches(prefix, candidate),
            (Operator::Equal, Target::Exact(spec)) => exact_matches(spec, candidate),
            (Operator::NotEqual, Target::Exact(spec)) => !exact_matches(spec, candidate),
            (Operator::LessOrEqual, Target::Exact(spec)) => candidate.public() <= *spec,
            (Operator::GreaterOrEqual, Target::Exact(spec)) => candidate.public() >= *spec,
            (Operator::Less, Target::Exact(spec)) => less_than(spec, candidate),
            (Operator::Greater, Target::Exact(spec)) => greater_than(spec, candidate),
            (Operator::Compatible, Target::Exact(spec)) => {
                let mut prefix = spec.base();
                prefix.release.pop();
                candidate.public() >= *spec && prefix_matches(&prefix, candidate)
            }
            _ => false,
        }
    }
}

fn prefix_matches(prefix: &Version, candidate: &Version) -> bool {
    if prefix.epoch != candidate.epoch {
        return false;
    }
    let width = prefix.release.len();
    let mut release = candidate.release.clone();
    if release.len() < width {
        release.resize(width, 0);
    }
    if release[..width] != prefix.release[..] {
        return false;
    }
    // `==1.0rc1.*` style prefixes also pin the pre/post/dev components
    if prefix.pre.is_some() && prefix.pre != candidate.pre {
        return false;
    }
    if prefix.post.is_some() && prefix.post != candidate.post {
        return false;
    }
    if prefix.dev.is_some() && prefix.dev != candidate.dev {
        return false;
    }
    true
}

fn exact_matches(spec: &Version, candidate: &Version) -> bool {
    if spec.local.is_some() {
        candidate == spec
    } else {
        candidate.public() == *spec
    }
}

fn less_than(spec: &Version, candidate: &Version) -> bool {
    if candidate.public().cmp(spec) != Ordering::Less {
        return false;
    }
    !(!spec.is_prerelease() && candidate.is_prerelease() && candidate.base() == spec.base())
}

fn greater_than(spec: &Version, candidate: &Version) -> bool {
    if candidate.public().cmp(spec) != Ordering::Greater {
        return false;
    }
    if !spec.is_postrelease() && candidate.is_postrelease() && candidate.base() == spec.base() {
        return false;
    }
    !(candidate.local.is_some() && candidate.base() == spec.base())
}

impl FromStr for Specifier {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Specifier::parse(s)
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator.symbol(), self.raw_version)
    }
}

/// A comma-separated set of specifiers; empty means any version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecifierSet {
    specifiers: Vec<Specifier>,
}

impl SpecifierSet {
    /// Parse a comma-separated specifier list
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let specifiers = trimmed
            .split(',')
            .map(|part| {
                if part.trim().is_empty() {
                    Err(VersionError::invalid_specifier(input, "empty specifier in list"))
                } else {
                    Specifier::parse(part).map_err(|e| match e {
                        VersionError::InvalidSpecifier { message, .. } => {
                            VersionError::invalid_specifier(input, message)
                        }
                        other => other,
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { specifiers })
    }

    /// A set that accepts every version
    pub fn any() -> Self {
        Self::default()
    }

    /// True if no constraint is present
    pub fn is_empty(&self) -> bool {
        self.specifiers.is_empty()
    }

    /// Iterate over the individual specifiers
    pub fn iter(&self) -> impl Iterator<Item = &Specifier> {
        self.specifiers.iter()
    }

    /// Check whether a version satisfies every specifier.
    ///
    /// Pre-releases are rejected unless `allow_prereleases` is set or one of
    /// the specifiers names a pre-release itself.
    pub fn contains(&self, candidate: &Version, allow_prereleases: bool) -> bool {
        if candidate.is_prerelease()
            && !allow_prereleases
            && !self.specifiers.iter().any(Specifier::mentions_prerelease)
        {
            return false;
        }
        self.specifiers.iter().all(|s| s.contains(candidate))
    }
}

impl FromStr for SpecifierSet {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpecifierSet::parse(s)
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.specifiers.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}
