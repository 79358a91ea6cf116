//! Terminal output formatting

use colored::Colorize;
use lintmux_core::{Issue, PackageReport, RunSummary, ToolOutcome};
use std::path::Path;
use std::time::Instant;

pub fn severity_label(severity: u8) -> colored::ColoredString {
    let label = format!("[{}]", severity);
    match severity {
        5 => label.red().bold(),
        4 => label.red(),
        3 => label.yellow(),
        _ => label.blue(),
    }
}

/// One issue line: `[sev] path:line tool TYPE message (CERT)`.
pub fn format_issue(issue: &Issue, root: &Path) -> String {
    let mut line = format!(
        "  {} {}:{} {} {} {}",
        severity_label(issue.severity.value()),
        issue.display_path(root),
        issue.line_number,
        issue.tool.dimmed(),
        issue.issue_type.cyan(),
        issue.message
    );
    if let Some(cert) = &issue.cert_reference {
        line.push_str(&format!(" ({})", cert));
    }
    line
}

pub fn print_package(report: &PackageReport) {
    let kind = report.package_type.as_deref().unwrap_or("unknown type");
    println!(
        "  {} {} ({}, level {})",
        "▸".green(),
        report.package.bold(),
        kind,
        report.level
    );
    for issue in &report.issues {
        println!("{}", format_issue(issue, &report.path));
    }
    if !report.issues.is_empty() {
        println!();
    }
}

pub fn print_timings(report: &PackageReport) {
    println!("  {}", format!("Timings for {}:", report.package).dimmed());
    for run in &report.discovery.runs {
        println!(
            "    {:<24} {:>8.2}s  {} file(s)",
            run.plugin,
            run.elapsed.as_secs_f64(),
            run.files_added
        );
    }
    for (tool, run) in &report.tools.runs {
        let status = match &run.outcome {
            ToolOutcome::Completed(_) => run.outcome.to_string().normal(),
            other => other.to_string().yellow(),
        };
        println!("    {:<24} {:>8.2}s  {}", tool, run.elapsed.as_secs_f64(), status);
    }
    println!("    {:<24} {:>8.2}s", "total", report.elapsed.as_secs_f64());
    println!();
}

pub fn print_footer(summary: &RunSummary, fail_on: u8, start: Instant) {
    println!("  {}", "\u{2500}".repeat(60).dimmed());

    let headline = if summary.total == 0 {
        "No issues found".green().to_string()
    } else {
        format!("{} issue(s) found", summary.total).yellow().to_string()
    };
    println!(
        "  {} \u{00b7} {} suppressed \u{00b7} {} package(s)",
        headline, summary.suppressed, summary.packages
    );

    if summary.total > 0 {
        let counts: Vec<String> = summary
            .by_severity
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, n)| **n > 0)
            .map(|(i, n)| format!("{} × {}", severity_label(i as u8 + 1), n))
            .collect();
        println!("  {}", counts.join("  "));
    }

    // Shown even when the run passes.
    if summary.incomplete() {
        println!(
            "  {}",
            format!("{} plugin(s) could not run:", summary.not_run.len()).yellow()
        );
        for failure in &summary.not_run {
            println!(
                "    {} {}/{}: {}",
                "⚠".yellow(),
                failure.package,
                failure.plugin,
                failure.reason
            );
        }
    }

    if summary.partial {
        println!("  {}", "Interrupted: results are partial.".red().bold());
    } else if summary.exceeds_threshold(fail_on) {
        println!(
            "  {}",
            format!("Failing: issues at severity {} or above", fail_on).red()
        );
    }
    println!("  Time: {:.1}s", start.elapsed().as_secs_f64());
}
