//! Progress indicators

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use lintmux_core::engine::DiscoveryRun;
use lintmux_core::{Observer, Package, PackageReport, ToolRun};
use std::sync::Mutex;

/// A single pipeline step backed by an indicatif spinner.
///
/// Create with [`Step::new`], then call [`Step::finish`] or [`Step::skip`]
/// when the work completes. On a non-TTY the spinner draws nothing, but the
/// finish/skip lines are still emitted via `eprintln!`.
pub struct Step {
    pb: ProgressBar,
    label: String,
}

impl Step {
    /// Start a new spinner step with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message(format!("{}...", label));
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { pb, label }
    }

    /// Update the spinner message mid-flight.
    pub fn update(&self, msg: impl Into<String>) {
        self.pb.set_message(msg.into());
    }

    /// Finish successfully: prints `"  label... done: {summary}"`.
    pub fn finish(&self, summary: &str) {
        self.pb.finish_and_clear();
        eprintln!("  {}... {}: {}", self.label, "done".green(), summary);
    }

    /// Finish as skipped / not-applicable: prints `"  {msg}"` dimmed.
    pub fn skip(&self, msg: &str) {
        self.pb.finish_and_clear();
        eprintln!("  {}", msg.dimmed());
    }

    /// Print a warning line above the spinner (or inline on non-TTY).
    pub fn warn(&self, msg: impl std::fmt::Display) {
        self.pb.println(format!("  {}: {}", "warn".yellow(), msg));
    }
}

/// Engine observer that drives one [`Step`] per package.
pub struct ScanProgress {
    enabled: bool,
    step: Mutex<Option<Step>>,
}

impl ScanProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            step: Mutex::new(None),
        }
    }

    fn with_step(&self, f: impl FnOnce(&Step)) {
        if let Ok(guard) = self.step.lock() {
            if let Some(step) = guard.as_ref() {
                f(step);
            }
        }
    }
}

impl Observer for ScanProgress {
    fn package_started(&self, package: &Package, level: &str) {
        if !self.enabled {
            return;
        }
        if let Ok(mut guard) = self.step.lock() {
            *guard = Some(Step::new(format!("Scanning {} ({})", package.name, level)));
        }
    }

    fn discovery_finished(&self, run: &DiscoveryRun) {
        self.with_step(|step| match &run.error {
            Some(e) => step.warn(format!("discovery plugin {} failed: {}", run.plugin, e)),
            None => step.update(format!("discovered {} file(s) with {}", run.files_added, run.plugin)),
        });
    }

    fn tool_finished(&self, tool: &str, run: &ToolRun) {
        self.with_step(|step| {
            if run.outcome.completed() {
                step.update(format!("{} finished", tool));
            } else {
                step.warn(format!("{} {}", tool, run.outcome));
            }
        });
    }

    fn package_finished(&self, report: &PackageReport) {
        let Ok(mut guard) = self.step.lock() else {
            return;
        };
        if let Some(step) = guard.take() {
            if report.partial {
                step.skip(&format!("{} interrupted", report.package));
            } else {
                step.finish(&format!(
                    "{} issue(s), {} suppressed ({:.1}s)",
                    report.issues.len(),
                    report.suppressed.len(),
                    report.elapsed.as_secs_f64()
                ));
            }
        }
    }
}
