//! Orchestration: resolve a level, discover sources, run tools, aggregate
//!
//! Every run gets its own [`RunContext`]; the only state shared between runs
//! is the read-only plugin registry and configuration graph.

pub mod aggregate;
pub mod discovery;
pub mod tools;

pub use aggregate::{aggregate, aggregate_with_suppressed};
pub use discovery::{run_discovery, DiscoveryReport, DiscoveryRun};
pub use tools::{build_flags, run_tools, ToolOutcome, ToolResults, ToolRun};

use crate::config::{ConfigGraph, ResolvedConfig, RunConfig};
use crate::error::Error;
use crate::exceptions::Exceptions;
use crate::package::{find_packages, Package};
use crate::plugin::process::CancelToken;
use crate::plugin::registry::PluginRegistry;
use crate::report::{PackageReport, WorkspaceReport};
use std::any::Any;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Callbacks for progress reporting.
///
/// Tool callbacks arrive from worker threads, in completion order.
pub trait Observer: Sync {
    fn package_started(&self, _package: &Package, _level: &str) {}
    fn discovery_finished(&self, _run: &DiscoveryRun) {}
    fn tool_finished(&self, _tool: &str, _run: &ToolRun) {}
    fn package_finished(&self, _report: &PackageReport) {}
}

/// Observer that ignores everything.
pub struct Silent;

impl Observer for Silent {}

/// Everything the phase drivers need for one package run.
pub struct RunContext<'a> {
    pub resolved: &'a ResolvedConfig,
    pub registry: &'a PluginRegistry,
    pub exceptions: &'a Exceptions,
    pub run: &'a RunConfig,
    /// Tool name → issue type → CERT reference
    pub mappings: &'a BTreeMap<String, BTreeMap<String, String>>,
    pub cancel: &'a CancelToken,
    /// Worker threads for the tool phase, 0 = one per CPU
    pub jobs: usize,
    pub observer: &'a dyn Observer,
}

/// Runs packages against a loaded configuration and plugin registry.
pub struct Engine {
    config: ConfigGraph,
    registry: Arc<PluginRegistry>,
    exceptions: Exceptions,
    cancel: CancelToken,
    jobs: Option<usize>,
}

impl Engine {
    pub fn new(config: ConfigGraph, registry: Arc<PluginRegistry>, exceptions: Exceptions) -> Self {
        Self {
            config,
            registry,
            exceptions,
            cancel: CancelToken::new(),
            jobs: None,
        }
    }

    /// Share `cancel` with the caller, e.g. to wire it to Ctrl-C.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Override `[run] jobs`.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn config(&self) -> &ConfigGraph {
        &self.config
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// The level used when none is requested.
    pub fn default_level(&self) -> &str {
        self.config.run().default_level()
    }

    /// Scan one package at `level` (or the configured default).
    ///
    /// Only configuration and plugin-graph errors are returned; plugin
    /// failures are recorded in the report.
    pub fn run_package(
        &self,
        mut package: Package,
        level: Option<&str>,
        observer: &dyn Observer,
    ) -> Result<PackageReport, Error> {
        let started = Instant::now();
        let level = level.unwrap_or_else(|| self.default_level());
        let resolved = self
            .config
            .resolve(level, package.package_type.as_deref(), &self.registry)?;
        for (plugin, tag) in self.registry.unproduced_tags(&resolved) {
            warn!(plugin = %plugin, tag = %tag, "no enabled discovery plugin produces a required tag");
        }

        let exceptions = self.exceptions.for_package(&package.name);
        let ctx = RunContext {
            resolved: &resolved,
            registry: &self.registry,
            exceptions: &exceptions,
            run: self.config.run(),
            mappings: &self.config.config().mappings,
            cancel: &self.cancel,
            jobs: self.jobs.unwrap_or_else(|| self.config.run().jobs()),
            observer,
        };

        info!(package = %package.name, level, "scanning package");
        observer.package_started(&package, level);
        let discovery = run_discovery(&mut package, &ctx)?;
        let tools = run_tools(&package, &ctx);
        let (issues, suppressed) = aggregate_with_suppressed(&tools.issue_map(), &exceptions);

        let partial = self.cancel.is_cancelled();
        info!(
            package = %package.name,
            issues = issues.len(),
            suppressed = suppressed.len(),
            partial,
            "package scanned"
        );
        let report = PackageReport {
            package: package.name,
            path: package.path,
            package_type: package.package_type,
            level: resolved.level,
            issues,
            suppressed,
            discovery,
            tools,
            partial,
            elapsed: started.elapsed(),
        };
        observer.package_finished(&report);
        Ok(report)
    }

    /// Scan every package found under `root`, in path order.
    ///
    /// `only`, when non-empty, restricts the run to those package names.
    /// Packages listed in `ignore_packages` are skipped. An interrupt stops
    /// the loop after the package in progress.
    pub fn run_workspace(
        &self,
        root: &Path,
        only: &[String],
        level: Option<&str>,
        observer: &dyn Observer,
    ) -> Result<WorkspaceReport, Error> {
        let mut report = WorkspaceReport::default();
        for dir in find_packages(root)? {
            if self.cancel.is_cancelled() {
                report.partial = true;
                break;
            }
            let package = Package::open(&dir)?;
            if !only.is_empty() && !only.contains(&package.name) {
                continue;
            }
            if self.exceptions.is_package_ignored(&package.name) {
                info!(package = %package.name, "package ignored by exceptions");
                report.skipped.push(package.name);
                continue;
            }
            let package_report = self.run_package(package, level, observer)?;
            report.partial |= package_report.partial;
            report.packages.push(package_report);
        }
        Ok(report)
    }
}

pub(crate) fn panic_message(panic: Box<dyn Any + Send>) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("plugin panicked: {}", detail)
}
