//! CLI argument parsing module for optdeps

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Parse an interpreter version in format: X.Y or X.Y.Z
fn parse_python_version(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty python version".to_string());
    }

    let parts: Vec<&str> = s.split('.').collect();
    if !(2..=3).contains(&parts.len()) {
        return Err(format!("expected X.Y or X.Y.Z, got: {}", s));
    }
    if let Some(bad) = parts
        .iter()
        .find(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(format!("invalid number in python version: {}", bad));
    }

    Ok(s.to_string())
}

/// Audit optional Python dependencies without importing them
#[derive(Parser, Debug, Clone)]
#[command(
    name = "optdeps",
    version,
    about = "Check that optional Python dependencies are installed and compatible"
)]
pub struct CliArgs {
    /// Dependency declarations, e.g. "numpy>=1.20 as np" or "sklearn@ml->scikit-learn"
    pub specs: Vec<String>,

    /// Config file (default: ./optdeps.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// site-packages directory to inspect (can be specified multiple times)
    #[arg(long = "site-packages", action = ArgAction::Append)]
    pub site_packages: Vec<PathBuf>,

    /// Package whose metadata supplies ranges for NAME@extra declarations
    #[arg(long)]
    pub source: Option<String>,

    /// pyproject.toml declaring the source's dependency groups
    #[arg(long)]
    pub pyproject: Option<PathBuf>,

    /// Consumer name recorded for declarations given on the command line
    #[arg(long, default_value = "cli")]
    pub consumer: String,

    /// Interpreter version environment markers are evaluated against
    #[arg(long, value_parser = parse_python_version)]
    pub python_version: Option<String>,

    // Output options
    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Enable quiet mode - only unsatisfied dependencies are printed
    #[arg(short, long)]
    pub quiet: bool,
}

impl CliArgs {
    /// Check if declarations were given on the command line
    pub fn has_specs(&self) -> bool {
        !self.specs.is_empty()
    }
}
