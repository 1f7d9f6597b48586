//! Usage and version bookkeeping for one manager
//!
//! The registry records:
//! - Which consumers declared each module (usage register)
//! - The installed version found for each loaded module (version register)
//! - Every (spec, consumer) declaration, in order (spec log)

use crate::domain::{ModuleReport, ModuleStatus};
use crate::environment::Environment;
use crate::module_spec::{ModuleSpec, ResolvedLoad};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Declarations and load results of one manager
#[derive(Debug, Default)]
pub struct Registry {
    usage: BTreeMap<String, Vec<String>>,
    versions: BTreeMap<String, String>,
    spec_log: Vec<(Arc<ModuleSpec>, String)>,
}

impl Registry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a consumer to the module's usage list
    pub fn record_usage(&mut self, module_name: &str, consumer: &str) {
        self.usage
            .entry(module_name.to_string())
            .or_default()
            .push(consumer.to_string());
    }

    /// Set the installed version of a module, overwriting any earlier value
    pub fn record_version(&mut self, module_name: &str, version: &str) {
        self.versions
            .insert(module_name.to_string(), version.to_string());
    }

    /// Record the installed version carried by a load result, if any
    pub fn record_load(&mut self, module_name: &str, resolved: &ResolvedLoad) {
        if let Some(version) = resolved.installed_version() {
            self.record_version(module_name, version);
        }
    }

    /// Append one (spec, consumer) pair to the spec log
    pub fn log_spec(&mut self, spec: Arc<ModuleSpec>, consumer: &str) {
        self.spec_log.push((spec, consumer.to_string()));
    }

    /// Force every logged spec and describe the outcome, in declaration order
    pub fn report(&mut self, env: &Environment) -> Vec<ModuleReport> {
        let mut rows = Vec::with_capacity(self.spec_log.len());
        let mut loaded = Vec::new();

        for (spec, consumer) in &self.spec_log {
            let resolved = spec.load(env);
            let descriptor = spec.descriptor();
            let (status, message) = match resolved {
                ResolvedLoad::Loaded { .. } => (ModuleStatus::Satisfied, None),
                ResolvedLoad::Failed(failure) => (
                    ModuleStatus::from_failure(failure.kind),
                    Some(failure.to_string()),
                ),
            };
            rows.push(ModuleReport {
                module_name: descriptor.module_name.clone(),
                specifier: descriptor.specifier_text().to_string(),
                extra_or_group: descriptor.extra_or_group.clone(),
                installed_version: resolved.installed_version().map(str::to_string),
                status,
                used_by: consumer.clone(),
                message,
            });
            loaded.push(Arc::clone(spec));
        }

        for spec in loaded {
            if let Some(resolved) = spec.resolved() {
                self.record_load(spec.module_name(), resolved);
            }
        }
        rows
    }

    /// Consumers of each module, in declaration order
    pub fn usage(&self) -> &BTreeMap<String, Vec<String>> {
        &self.usage
    }

    /// Installed version of each module whose load has run
    pub fn versions(&self) -> &BTreeMap<String, String> {
        &self.versions
    }

    /// Every logged (spec, consumer) pair
    pub fn spec_log(&self) -> &[(Arc<ModuleSpec>, String)] {
        &self.spec_log
    }

    /// True if nothing has been declared
    pub fn is_empty(&self) -> bool {
        self.spec_log.is_empty()
    }

    /// Forget every declaration and recorded version
    pub fn reset(&mut self) {
        self.usage.clear();
        self.versions.clear();
        self.spec_log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DependencyDescriptor;
    use crate::loader::{InMemoryImporter, ModuleBody};
    use crate::metadata::InMemoryDistributions;

    fn env() -> Environment {
        Environment::new(
            Arc::new(
                InMemoryDistributions::new()
                    .with_distribution("packaging", "23.0")
                    .with_distribution("numpy", "1.26.0"),
            ),
            Arc::new(
                InMemoryImporter::new()
                    .with_module("packaging", ModuleBody::new())
                    .with_module("numpy", ModuleBody::new()),
            ),
        )
    }

    fn spec(desc: DependencyDescriptor) -> Arc<ModuleSpec> {
        Arc::new(ModuleSpec::new(desc))
    }

    #[test]
    fn test_usage_keeps_declaration_order() {
        let mut registry = Registry::new();
        registry.record_usage("numpy", "Model");
        registry.record_usage("numpy", "fit");
        registry.record_usage("numpy", "Model");
        assert_eq!(registry.usage()["numpy"], vec!["Model", "fit", "Model"]);
    }

    #[test]
    fn test_record_version_overwrites() {
        let mut registry = Registry::new();
        registry.record_version("numpy", "1.0");
        registry.record_version("numpy", "2.0");
        assert_eq!(registry.versions()["numpy"], "2.0");
    }

    #[test]
    fn test_report_rows_follow_spec_log() {
        let env = env();
        let mut registry = Registry::new();
        registry.log_spec(spec(DependencyDescriptor::new("numpy")), "Model");
        registry.log_spec(
            spec(DependencyDescriptor::new("packaging").with_specifiers(">=9999.0")),
            "Model",
        );
        registry.log_spec(spec(DependencyDescriptor::new("dummy_not_installed")), "fit");
        registry.log_spec(spec(DependencyDescriptor::new("numpy")), "fit");

        let rows = registry.report(&env);
        assert_eq!(rows.len(), 4);
        let summary: Vec<_> = rows
            .iter()
            .map(|r| (r.module_name.as_str(), r.used_by.as_str(), r.status))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("numpy", "Model", ModuleStatus::Satisfied),
                ("packaging", "Model", ModuleStatus::VersionMismatch),
                ("dummy_not_installed", "fit", ModuleStatus::Missing),
                ("numpy", "fit", ModuleStatus::Satisfied),
            ]
        );
        assert_eq!(rows[1].installed_version.as_deref(), Some("23.0"));
        assert!(rows[2].message.as_deref().unwrap().contains("is not installed"));
    }

    #[test]
    fn test_report_records_versions_except_not_installed() {
        let env = env();
        let mut registry = Registry::new();
        registry.log_spec(
            spec(DependencyDescriptor::new("packaging").with_specifiers(">=9999.0")),
            "a",
        );
        registry.log_spec(spec(DependencyDescriptor::new("dummy_not_installed")), "a");
        registry.report(&env);
        assert_eq!(registry.versions().get("packaging").map(String::as_str), Some("23.0"));
        assert!(!registry.versions().contains_key("dummy_not_installed"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let env = env();
        let mut registry = Registry::new();
        registry.record_usage("numpy", "a");
        registry.log_spec(spec(DependencyDescriptor::new("numpy")), "a");
        registry.report(&env);
        registry.reset();
        assert!(registry.usage().is_empty());
        assert!(registry.versions().is_empty());
        assert!(registry.is_empty());
    }
}
