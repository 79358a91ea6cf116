//! JSON output formatting

use lintmux_core::{Issue, PackageReport, RunStatus, RunSummary};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput {
    pub issues: Vec<JsonIssue>,
    pub summary: JsonSummary,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonIssue {
    pub file_name: String,
    pub line_number: usize,
    pub tool: String,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub severity: u8,
    pub message: String,
    /// Empty when the issue has no CERT mapping
    pub cert_reference: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSummary {
    /// `"no_issues"` or `"issues_found"`
    pub status: String,
    pub packages: usize,
    pub total: usize,
    /// Counts for severities 1 through 5
    pub by_severity: [usize; 5],
    pub suppressed: usize,
    pub not_run: Vec<JsonNotRun>,
    pub partial: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonNotRun {
    pub package: String,
    pub plugin: String,
    pub reason: String,
}

impl From<&Issue> for JsonIssue {
    fn from(issue: &Issue) -> Self {
        Self {
            file_name: issue.filename.display().to_string(),
            line_number: issue.line_number,
            tool: issue.tool.clone(),
            issue_type: issue.issue_type.clone(),
            severity: issue.severity.value(),
            message: issue.message.clone(),
            cert_reference: issue.cert_reference.clone().unwrap_or_default(),
        }
    }
}

impl From<&RunSummary> for JsonSummary {
    fn from(summary: &RunSummary) -> Self {
        let status = match summary.status() {
            RunStatus::NoIssues => "no_issues",
            RunStatus::IssuesFound => "issues_found",
        };
        Self {
            status: status.to_string(),
            packages: summary.packages,
            total: summary.total,
            by_severity: summary.by_severity,
            suppressed: summary.suppressed,
            not_run: summary
                .not_run
                .iter()
                .map(|f| JsonNotRun {
                    package: f.package.clone(),
                    plugin: f.plugin.clone(),
                    reason: f.reason.clone(),
                })
                .collect(),
            partial: summary.partial,
        }
    }
}

/// Issues of every report in order, with the run summary.
pub fn build(reports: &[PackageReport], summary: &RunSummary) -> JsonOutput {
    JsonOutput {
        issues: reports
            .iter()
            .flat_map(|r| &r.issues)
            .map(JsonIssue::from)
            .collect(),
        summary: JsonSummary::from(summary),
    }
}

pub fn print(reports: &[PackageReport], summary: &RunSummary) {
    match serde_json::to_string_pretty(&build(reports, summary)) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize JSON: {}", e),
    }
}
