//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of every report row
//! - Summary counts by status

use crate::domain::{ModuleReport, ModuleStatus};
use crate::orchestrator::AuditResult;
use crate::output::{OutputFormatter, Verbosity};
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

/// JSON representation of the full result
#[derive(Serialize)]
struct JsonOutput<'a> {
    /// Whether every dependency is usable
    satisfied: bool,
    /// Source package ranges were derived from
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    /// Inspected directories (only in verbose mode)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    site_packages: Vec<String>,
    /// Summary statistics
    summary: JsonSummary,
    /// Report rows
    modules: Vec<&'a ModuleReport>,
}

/// JSON representation of summary statistics
#[derive(Serialize)]
struct JsonSummary {
    total: usize,
    satisfied: usize,
    missing: usize,
    version_mismatch: usize,
}

impl JsonFormatter {
    fn summary(result: &AuditResult) -> JsonSummary {
        JsonSummary {
            total: result.reports.len(),
            satisfied: result.count(ModuleStatus::Satisfied),
            missing: result.count(ModuleStatus::Missing),
            version_mismatch: result.count(ModuleStatus::VersionMismatch),
        }
    }

    fn write_json<T: Serialize>(value: &T, writer: &mut dyn Write) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
        writeln!(writer, "{}", json)
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &AuditResult, writer: &mut dyn Write) -> std::io::Result<()> {
        let modules: Vec<&ModuleReport> = if self.verbosity == Verbosity::Quiet {
            result.reports.iter().filter(|r| !r.is_satisfied()).collect()
        } else {
            result.reports.iter().collect()
        };
        let site_packages = if self.verbosity == Verbosity::Verbose {
            result
                .site_packages
                .iter()
                .map(|p| p.display().to_string())
                .collect()
        } else {
            Vec::new()
        };

        let output = JsonOutput {
            satisfied: result.all_satisfied(),
            source: result.source.as_deref(),
            site_packages,
            summary: Self::summary(result),
            modules,
        };
        Self::write_json(&output, writer)
    }

    fn format_summary(
        &self,
        result: &AuditResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        Self::write_json(&Self::summary(result), writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn create_test_result() -> AuditResult {
        AuditResult {
            source: Some("mytool".to_string()),
            site_packages: vec![PathBuf::from("/venv/site-packages")],
            reports: vec![
                ModuleReport {
                    module_name: "numpy".into(),
                    specifier: ">=1.20".into(),
                    extra_or_group: Some("array".into()),
                    installed_version: Some("1.26.0".into()),
                    status: ModuleStatus::Satisfied,
                    used_by: "Model".into(),
                    message: None,
                },
                ModuleReport {
                    module_name: "dummy_not_installed".into(),
                    specifier: String::new(),
                    extra_or_group: None,
                    installed_version: None,
                    status: ModuleStatus::Missing,
                    used_by: "fit".into(),
                    message: Some("dummy_not_installed is not installed".into()),
                },
            ],
        }
    }

    fn render(verbosity: Verbosity) -> serde_json::Value {
        let mut out = Vec::new();
        JsonFormatter::new(verbosity)
            .format(&create_test_result(), &mut out)
            .unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn test_json_structure() {
        let json = render(Verbosity::Normal);
        assert_eq!(json["satisfied"], false);
        assert_eq!(json["source"], "mytool");
        assert_eq!(json["summary"]["total"], 2);
        assert_eq!(json["summary"]["missing"], 1);
        assert_eq!(json["modules"][0]["status"], "satisfied");
        assert_eq!(json["modules"][0]["extra_or_group"], "array");
        assert_eq!(json["modules"][1]["status"], "missing");
        assert!(json["modules"][1]["installed_version"].is_null());
        assert!(json.get("site_packages").is_none());
    }

    #[test]
    fn test_json_quiet_only_unsatisfied() {
        let json = render(Verbosity::Quiet);
        let modules = json["modules"].as_array().unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0]["module_name"], "dummy_not_installed");
        assert_eq!(json["summary"]["total"], 2);
    }

    #[test]
    fn test_json_verbose_lists_site_packages() {
        let json = render(Verbosity::Verbose);
        assert_eq!(json["site_packages"][0], "/venv/site-packages");
    }

    #[test]
    fn test_json_summary_only() {
        let mut out = Vec::new();
        JsonFormatter::new(Verbosity::Normal)
            .format_summary(&create_test_result(), &mut out)
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["satisfied"], 1);
        assert_eq!(json["version_mismatch"], 0);
    }
}
