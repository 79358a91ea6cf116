//! Main scan command: wires config, exceptions, plugins and the engine together

use anyhow::{Context, Result};
use colored::Colorize;
use lintmux_core::{CancelToken, Engine, Package, PackageReport, RunSummary, WorkspaceReport};
use std::path::Path;
use std::time::Instant;

use super::{load_config, load_exceptions, load_registry};
use crate::progress::ScanProgress;
use crate::{exit_code, output, run_log, OutputFormat};

/// What the process exit code is derived from.
#[derive(Debug)]
pub struct ScanOutcome {
    pub summary: RunSummary,
    pub fail_on: u8,
}

impl ScanOutcome {
    pub fn exit_code(&self) -> i32 {
        if self.summary.partial {
            exit_code::INTERRUPTED
        } else if self.summary.exceeds_threshold(self.fail_on) {
            exit_code::ISSUES
        } else {
            exit_code::OK
        }
    }
}

pub fn run(
    path: Option<&Path>,
    workspace: bool,
    packages: &[String],
    cli: &crate::Cli,
    cancel: CancelToken,
) -> Result<ScanOutcome> {
    let start = Instant::now();
    let root = path.unwrap_or_else(|| Path::new("."));
    let root = std::fs::canonicalize(root)
        .with_context(|| format!("cannot open {}", root.display()))?;
    let format = cli.format.unwrap_or(OutputFormat::Terminal);

    if format == OutputFormat::Terminal {
        eprintln!(
            "{}",
            format!("  lintmux v{} — scanning {}", lintmux_core::VERSION, root.display()).bold()
        );
        eprintln!();
    }

    // ── 1. Config ────────────────────────────────────────────────
    let config = load_config(cli, &root)?;
    let exceptions = load_exceptions(cli, &root)?;
    let registry = load_registry(&config)?;
    let fail_on = cli.fail_on.unwrap_or_else(|| config.run().fail_on());

    let mut engine = Engine::new(config, registry, exceptions).with_cancel_token(cancel);
    if let Some(jobs) = cli.jobs {
        engine = engine.with_jobs(jobs);
    }

    // ── 2. Scan ──────────────────────────────────────────────────
    let progress = ScanProgress::new(format == OutputFormat::Terminal);
    let level = cli.level.as_deref();
    let report = if workspace {
        engine.run_workspace(&root, packages, level, &progress)?
    } else {
        let package = Package::open(&root)?;
        let package_report = engine.run_package(package, level, &progress)?;
        WorkspaceReport {
            partial: package_report.partial,
            packages: vec![package_report],
            skipped: Vec::new(),
        }
    };
    let summary = report.summary();

    // ── 3. Output ────────────────────────────────────────────────
    if let Some(dir) = &cli.output_dir {
        for package_report in &report.packages {
            let written = run_log::save_report(dir, package_report)?;
            tracing::info!(path = %written.display(), "report written");
        }
    }

    match format {
        OutputFormat::Json => output::json::print(&report.packages, &summary),
        OutputFormat::Terminal => {
            print_terminal(&report.packages, cli.timings, &report.skipped);
            output::terminal::print_footer(&summary, fail_on, start);
        }
    }

    Ok(ScanOutcome { summary, fail_on })
}

fn print_terminal(reports: &[PackageReport], timings: bool, skipped: &[String]) {
    for report in reports {
        output::terminal::print_package(report);
        if timings {
            output::terminal::print_timings(report);
        }
    }
    for name in skipped {
        println!("  {}", format!("{} skipped (ignore_packages)", name).dimmed());
    }
    if reports.is_empty() {
        println!("  {}", "No packages found.".dimmed());
    }
}
