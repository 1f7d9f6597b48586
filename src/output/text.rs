//! Text output formatter for human-readable display
//!
//! This module provides:
//! - One aligned line per declared dependency with a colored status
//! - Failure messages and hints in verbose mode
//! - Summary with a breakdown by status

use crate::domain::{ModuleReport, ModuleStatus};
use crate::orchestrator::AuditResult;
use crate::output::{OutputFormatter, Verbosity};
use colored::Colorize;
use std::io::Write;

/// Text formatter for human-readable output
pub struct TextFormatter {
    /// Verbosity level
    verbosity: Verbosity,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            color: true,
        }
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    /// Status label, colored when enabled
    fn status_label(&self, status: ModuleStatus) -> String {
        let label = status.label();
        if !self.color {
            return label.to_string();
        }
        match status {
            ModuleStatus::Satisfied => label.green().to_string(),
            ModuleStatus::Missing => label.red().bold().to_string(),
            ModuleStatus::VersionMismatch => label.yellow().to_string(),
        }
    }

    /// Declared range as shown in the table
    fn specifier_display(report: &ModuleReport) -> String {
        let spec = if report.specifier.is_empty() {
            "*".to_string()
        } else {
            report.specifier.clone()
        };
        match &report.extra_or_group {
            Some(name) => format!("{} [{}]", spec, name),
            None => spec,
        }
    }

    /// Format a single report line
    fn format_report_line(
        &self,
        report: &ModuleReport,
        widths: (usize, usize, usize),
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let (name_w, spec_w, installed_w) = widths;
        let installed = report.installed_version.as_deref().unwrap_or("-");
        let spec = Self::specifier_display(report);

        if self.color {
            writeln!(
                writer,
                "  {:name_w$} {:spec_w$} {:installed_w$} {} {}",
                report.module_name.bold(),
                spec.dimmed(),
                installed,
                self.status_label(report.status),
                format!("({})", report.used_by).dimmed(),
            )?;
        } else {
            writeln!(
                writer,
                "  {:name_w$} {:spec_w$} {:installed_w$} {} ({})",
                report.module_name,
                spec,
                installed,
                report.status.label(),
                report.used_by,
            )?;
        }

        if self.verbosity == Verbosity::Verbose {
            if let Some(message) = &report.message {
                writeln!(writer, "      {}", message)?;
            }
        }
        Ok(())
    }

    /// Column widths for the rows that will be printed
    fn column_widths(rows: &[&ModuleReport]) -> (usize, usize, usize) {
        rows.iter().fold((0, 0, 0), |(n, s, i), r| {
            (
                n.max(r.module_name.len()),
                s.max(Self::specifier_display(r).len()),
                i.max(r.installed_version.as_deref().unwrap_or("-").len()),
            )
        })
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &AuditResult, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity == Verbosity::Verbose {
            if let Some(source) = &result.source {
                writeln!(writer, "Source package: {}", source)?;
            }
            for dir in &result.site_packages {
                writeln!(writer, "Inspecting: {}", dir.display())?;
            }
            writeln!(writer)?;
        }

        let rows: Vec<&ModuleReport> = if self.verbosity == Verbosity::Quiet {
            result.reports.iter().filter(|r| !r.is_satisfied()).collect()
        } else {
            result.reports.iter().collect()
        };

        if !rows.is_empty() {
            let widths = Self::column_widths(&rows);
            for report in rows {
                self.format_report_line(report, widths, writer)?;
            }
            writeln!(writer)?;
        }

        self.format_summary(result, writer)
    }

    fn format_summary(
        &self,
        result: &AuditResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let total = result.reports.len();
        let satisfied = result.count(ModuleStatus::Satisfied);
        let missing = result.count(ModuleStatus::Missing);
        let mismatched = result.count(ModuleStatus::VersionMismatch);

        if result.all_satisfied() {
            if self.verbosity == Verbosity::Quiet {
                return Ok(());
            }
            let line = format!("All {} dependencies satisfied", total);
            if self.color {
                writeln!(writer, "{}", line.green())?;
            } else {
                writeln!(writer, "{}", line)?;
            }
            return Ok(());
        }

        let line = format!(
            "{} of {} dependencies unsatisfied ({} missing, {} version mismatch, {} satisfied)",
            missing + mismatched,
            total,
            missing,
            mismatched,
            satisfied
        );
        if self.color {
            writeln!(writer, "{}", line.red())?;
        } else {
            writeln!(writer, "{}", line)?;
        }
        Ok(())
    }
}
