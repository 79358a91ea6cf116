//! Run reports and summaries

use crate::engine::{DiscoveryReport, ToolResults};
use crate::issue::Issue;
use crate::suppress::SuppressedIssue;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Result of scanning one package.
#[derive(Debug, Clone)]
pub struct PackageReport {
    pub package: String,
    pub path: PathBuf,
    pub package_type: Option<String>,
    pub level: String,
    /// Final, ordered issue list
    pub issues: Vec<Issue>,
    pub suppressed: Vec<SuppressedIssue>,
    pub discovery: DiscoveryReport,
    pub tools: ToolResults,
    /// The run was interrupted; only completed plugins contributed
    pub partial: bool,
    pub elapsed: Duration,
}

impl PackageReport {
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            packages: 1,
            suppressed: self.suppressed.len(),
            partial: self.partial,
            ..RunSummary::default()
        };
        for issue in &self.issues {
            summary.count(issue);
        }
        for (tool, outcome) in self.tools.not_run() {
            summary.not_run.push(PluginFailure {
                package: self.package.clone(),
                plugin: tool.to_string(),
                reason: outcome.to_string(),
            });
        }
        for run in self.discovery.failed() {
            summary.not_run.push(PluginFailure {
                package: self.package.clone(),
                plugin: run.plugin.clone(),
                reason: run
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_default(),
            });
        }
        summary
    }
}

/// Results of a workspace scan, one report per package in path order.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceReport {
    pub packages: Vec<PackageReport>,
    /// Packages skipped by `ignore_packages`
    pub skipped: Vec<String>,
    pub partial: bool,
}

impl WorkspaceReport {
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            partial: self.partial,
            ..RunSummary::default()
        };
        for package in &self.packages {
            summary.merge(package.summary());
        }
        summary
    }
}

/// A plugin that contributed nothing because it could not run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginFailure {
    pub package: String,
    pub plugin: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    NoIssues,
    IssuesFound,
}

/// Issue counts and plugin failures across one or more packages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub packages: usize,
    pub total: usize,
    /// Issue count per severity, index 0 = severity 1
    pub by_severity: [usize; 5],
    pub suppressed: usize,
    pub not_run: Vec<PluginFailure>,
    pub partial: bool,
}

impl RunSummary {
    fn count(&mut self, issue: &Issue) {
        self.total += 1;
        self.by_severity[usize::from(issue.severity.value()) - 1] += 1;
    }

    pub fn merge(&mut self, other: RunSummary) {
        self.packages += other.packages;
        self.total += other.total;
        for (mine, theirs) in self.by_severity.iter_mut().zip(other.by_severity) {
            *mine += theirs;
        }
        self.suppressed += other.suppressed;
        self.not_run.extend(other.not_run);
        self.partial |= other.partial;
    }

    pub fn status(&self) -> RunStatus {
        if self.total == 0 {
            RunStatus::NoIssues
        } else {
            RunStatus::IssuesFound
        }
    }

    /// Number of issues with severity at least `min`.
    pub fn at_or_above(&self, min: u8) -> usize {
        self.by_severity
            .iter()
            .enumerate()
            .filter(|(i, _)| *i + 1 >= usize::from(min))
            .map(|(_, n)| n)
            .sum()
    }

    /// Whether any issue meets the `fail_on` severity; 0 never fails.
    pub fn exceeds_threshold(&self, fail_on: u8) -> bool {
        fail_on != 0 && self.at_or_above(fail_on) > 0
    }

    /// Whether some plugin could not run.
    pub fn incomplete(&self) -> bool {
        !self.not_run.is_empty()
    }
}
