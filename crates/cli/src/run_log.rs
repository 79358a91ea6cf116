//! Run log: persists each package scan to `<output-dir>/<package>-<level>.lintmux.json`.

use anyhow::{Context, Result};
use lintmux_core::PackageReport;
use std::path::{Path, PathBuf};

use crate::output::json;

/// File name of the report for one package scanned at one level.
pub fn report_file_name(package: &str, level: &str) -> String {
    format!("{}-{}.lintmux.json", package, level)
}

/// Write `report` as JSON into `dir`, creating it if needed.
pub fn save_report(dir: &Path, report: &PackageReport) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create output dir {}", dir.display()))?;

    let out = json::build(std::slice::from_ref(report), &report.summary());
    let path = dir.join(report_file_name(&report.package, &report.level));
    let contents = serde_json::to_string_pretty(&out).context("serialize report")?;
    std::fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Read back a report written by [`save_report`].
pub fn load_report(path: &Path) -> Result<json::JsonOutput> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}
