//! Application error types using thiserror
//!
//! Error hierarchy:
//! - SpecParseError: malformed dependency declarations (fail fast)
//! - DeclarationError: declarations that cannot be resolved against the source package
//! - DependencyError: aggregated load failures surfaced on first use
//! - VersionError / RequirementError / MarkerError: PEP 440 and PEP 508 parsing
//! - MetadataError: reading installed distribution metadata
//! - ExecError: executing a located module
//! - ConfigError: configuration file and CLI option problems

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{LoadFailure, TargetKind};

/// Application-level error type
#[derive(Error, Debug)]
pub enum OptDepsError {
    /// Malformed dependency declaration
    #[error(transparent)]
    Parse(#[from] SpecParseError),

    /// Declaration could not be resolved
    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    /// Dependencies failed to load
    #[error(transparent)]
    Dependency(#[from] DependencyError),

    /// Installed metadata could not be read
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A report was requested from a manager that never saw a declaration
    #[error("no dependencies have been declared on this manager")]
    NothingDeclared,
}

/// Errors raised while parsing a dependency declaration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecParseError {
    /// The declaration does not match the compact grammar
    #[error("invalid dependency declaration '{input}': expected name[@extra][->distribution][specifier][ as alias]")]
    InvalidSyntax { input: String },

    /// The module name segment is missing
    #[error("dependency declaration '{input}' has an empty module name")]
    EmptyName { input: String },

    /// Relative import paths cannot be declared
    #[error("relative module name '{module}' is not supported, use an absolute import path")]
    RelativeModule { module: String },

    /// Both an extra and a dependency group were given
    #[error("dependency '{module}' specifies both extra '{extra}' and group '{group}'")]
    ExtraAndGroup {
        module: String,
        extra: String,
        group: String,
    },

    /// An extra/group was given together with from_meta = false
    #[error("dependency '{module}' references '{extra_or_group}' but sets from_meta = false")]
    FromMetaConflict {
        module: String,
        extra_or_group: String,
    },
}

/// Errors raised at declaration time while resolving descriptors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    /// The source package itself is not installed
    #[error("source package '{source_name}' is not installed")]
    SourceNotInstalled { source_name: String },

    /// A from-meta descriptor was declared on a manager without a source
    #[error("dependency '{module}' is derived from package metadata but the manager has no source package")]
    MissingSource { module: String },

    /// The extra is not declared by the source
    #[error("{extra} is not a valid extra for {source_name}")]
    InvalidExtra { extra: String, source_name: String },

    /// The dependency group is not declared by the source
    #[error("{group} is not a valid dependency group for {source_name}")]
    InvalidGroup { group: String, source_name: String },

    /// Neither an extra nor a dependency group of the source
    #[error("{name} is not a valid extra or dependency group for {source_name}")]
    InvalidExtraOrGroup { name: String, source_name: String },

    /// No matching, marker-satisfied requirement exists
    #[error("{target} is not listed as a dependency of {source_name}{}", format_markers(.markers))]
    NotListed {
        target: String,
        source_name: String,
        markers: Vec<String>,
    },

    /// The group exists but does not name the target
    #[error("{target} is not listed in dependency group '{group}' of {source_name}")]
    NotInGroup {
        target: String,
        group: String,
        source_name: String,
    },

    /// Several satisfied requirements carry different constraints
    #[error("{target} matches several requirements of {source_name} with different specifiers: {}", .specifiers.join(" | "))]
    Ambiguous {
        target: String,
        source_name: String,
        specifiers: Vec<String>,
    },

    /// A dependency group includes itself, directly or indirectly
    #[error("dependency group '{group}' of {source_name} includes itself")]
    GroupCycle { group: String, source_name: String },

    /// A requirement declared by the source could not be parsed
    #[error("invalid requirement '{requirement}' declared by {source_name}: {message}")]
    InvalidRequirement {
        requirement: String,
        source_name: String,
        message: String,
    },

    /// A marker could not be evaluated
    #[error("marker '{marker}' declared by {source_name} cannot be evaluated: {message}")]
    InvalidMarker {
        marker: String,
        source_name: String,
        message: String,
    },

    /// Only classes and functions accept dependency declarations
    #[error("dependencies can only be attached to classes or functions, not {kind} '{name}'")]
    UnsupportedTarget { name: String, kind: TargetKind },
}

/// Aggregated failure raised on the first use of a target
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    /// One or more dependencies are missing or incompatible
    #[error("Missing dependencies: [{}]\n{}", failure_names(.failures), failure_details(.failures))]
    Unsatisfied { failures: Vec<LoadFailure> },

    /// A relative import path reached the loader
    #[error("relative import of '{module}' is not supported")]
    RelativeImport { module: String },
}

/// Errors related to PEP 440 versions and specifiers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Not a PEP 440 version
    #[error("invalid version '{0}'")]
    InvalidVersion(String),

    /// Not a PEP 440 specifier
    #[error("{spec} is not a valid specifier: {message}")]
    InvalidSpecifier { spec: String, message: String },
}

/// Errors related to PEP 508 requirement strings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequirementError {
    /// The requirement does not follow PEP 508
    #[error("invalid requirement '{input}': {message}")]
    Invalid { input: String, message: String },
}

/// Errors related to PEP 508 environment markers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkerError {
    /// The marker expression could not be parsed
    #[error("invalid marker '{input}': {message}")]
    Syntax { input: String, message: String },

    /// Ordered comparison between values that are not versions
    #[error("cannot compare '{lhs}' {op} '{rhs}' as versions")]
    UndefinedComparison { lhs: String, op: String, rhs: String },
}

/// Errors related to installed distribution metadata
#[derive(Error, Debug)]
pub enum MetadataError {
    /// Failed to read a metadata file or directory
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The metadata file lacks a mandatory header
    #[error("metadata file {path} has no '{header}' header")]
    MissingHeader { path: PathBuf, header: String },

    /// pyproject.toml parsing error
    #[error("failed to parse TOML in {path}: {message}")]
    TomlParseError { path: PathBuf, message: String },
}

/// Errors raised while executing a module body
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// The module source could not be read
    #[error("failed to read module '{module}' from {path}: {message}")]
    ReadError {
        module: String,
        path: PathBuf,
        message: String,
    },

    /// The spec has nothing to execute
    #[error("module '{module}' has no origin to execute")]
    NoOrigin { module: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the expected schema
    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    /// A structured module entry is malformed
    #[error("invalid module entry '{module}' for consumer '{consumer}': {message}")]
    InvalidModule {
        consumer: String,
        module: String,
        message: String,
    },

    /// A marker override names no marker variable
    #[error("unknown marker variable '{name}' in config file")]
    UnknownMarker { name: String },

    /// No site-packages directory could be determined
    #[error("no site-packages directory given: pass --site-packages, set it in the config file, or activate a virtualenv")]
    NoSitePackages,

    /// Invalid path
    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: PathBuf, message: String },
}

fn format_markers(markers: &[String]) -> String {
    if markers.is_empty() {
        String::new()
    } else {
        format!(" (no satisfied marker among: {})", markers.join("; "))
    }
}

fn failure_names(failures: &[LoadFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("'{}'", f.module_name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn failure_details(failures: &[LoadFailure]) -> String {
    let mut out = String::new();
    for failure in failures {
        out.push_str("  - ");
        out.push_str(&failure.message);
        if let Some(hint) = &failure.hint {
            out.push_str(" (");
            out.push_str(hint);
            out.push(')');
        }
        out.push('\n');
    }
    out
}

impl SpecParseError {
    /// Creates a new InvalidSyntax error
    pub fn invalid_syntax(input: impl Into<String>) -> Self {
        SpecParseError::InvalidSyntax {
            input: input.into(),
        }
    }

    /// Creates a new EmptyName error
    pub fn empty_name(input: impl Into<String>) -> Self {
        SpecParseError::EmptyName {
            input: input.into(),
        }
    }

    /// Creates a new RelativeModule error
    pub fn relative_module(module: impl Into<String>) -> Self {
        SpecParseError::RelativeModule {
            module: module.into(),
        }
    }
}

impl DeclarationError {
    /// Creates a new SourceNotInstalled error
    pub fn source_not_installed(source_name: impl Into<String>) -> Self {
        DeclarationError::SourceNotInstalled {
            source_name: source_name.into(),
        }
    }

    /// Creates a new MissingSource error
    pub fn missing_source(module: impl Into<String>) -> Self {
        DeclarationError::MissingSource {
            module: module.into(),
        }
    }

    /// Creates a new InvalidExtra error
    pub fn invalid_extra(extra: impl Into<String>, source_name: impl Into<String>) -> Self {
        DeclarationError::InvalidExtra {
            extra: extra.into(),
            source_name: source_name.into(),
        }
    }

    /// Creates a new NotListed error
    pub fn not_listed(
        target: impl Into<String>,
        source_name: impl Into<String>,
        markers: Vec<String>,
    ) -> Self {
        DeclarationError::NotListed {
            target: target.into(),
            source_name: source_name.into(),
            markers,
        }
    }

    /// Creates a new UnsupportedTarget error
    pub fn unsupported_target(name: impl Into<String>, kind: TargetKind) -> Self {
        DeclarationError::UnsupportedTarget {
            name: name.into(),
            kind,
        }
    }
}

impl DependencyError {
    /// Module names of every failed dependency, in declaration order
    pub fn module_names(&self) -> Vec<&str> {
        match self {
            DependencyError::Unsatisfied { failures } => {
                failures.iter().map(|f| f.module_name.as_str()).collect()
            }
            DependencyError::RelativeImport { module } => vec![module.as_str()],
        }
    }
}

impl VersionError {
    /// Creates a new InvalidSpecifier error
    pub fn invalid_specifier(spec: impl Into<String>, message: impl Into<String>) -> Self {
        VersionError::InvalidSpecifier {
            spec: spec.into(),
            message: message.into(),
        }
    }
}

impl RequirementError {
    /// Creates a new Invalid error
    pub fn invalid(input: impl Into<String>, message: impl Into<String>) -> Self {
        RequirementError::Invalid {
            input: input.into(),
            message: message.into(),
        }
    }
}

impl MarkerError {
    /// Creates a new Syntax error
    pub fn syntax(input: impl Into<String>, message: impl Into<String>) -> Self {
        MarkerError::Syntax {
            input: input.into(),
            message: message.into(),
        }
    }
}

impl MetadataError {
    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MetadataError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new TomlParseError
    pub fn toml_parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        MetadataError::TomlParseError {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl ConfigError {
    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new ParseError
    pub fn parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ConfigError::ParseError {
            path: path.into(),
            message: message.into(),
        }
    }
}
