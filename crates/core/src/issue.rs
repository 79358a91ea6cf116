//! The normalized finding record every tool plugin produces

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Issue severity on the shared 1 (lowest) to 5 (highest) scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Severity(u8);

impl Severity {
    pub const MIN: Severity = Severity(1);
    pub const MEDIUM: Severity = Severity(3);
    pub const MAX: Severity = Severity(5);

    /// Returns `None` when `value` is outside `1..=5`.
    pub fn new(value: u8) -> Option<Self> {
        (1..=5).contains(&value).then_some(Self(value))
    }

    /// Clamp an arbitrary tool-reported level into range.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(1, 5) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Severity::new(value).ok_or_else(|| format!("severity {} is outside 1..=5", value))
    }
}

impl From<Severity> for u8 {
    fn from(s: Severity) -> u8 {
        s.0
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single normalized finding.
///
/// Two issues are the same issue iff every field is equal; the aggregator
/// deduplicates on exactly this equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Issue {
    pub filename: PathBuf,
    pub line_number: usize,
    pub tool: String,
    pub issue_type: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_reference: Option<String>,
}

impl Issue {
    pub fn new(
        filename: impl Into<PathBuf>,
        line_number: usize,
        tool: impl Into<String>,
        issue_type: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        cert_reference: Option<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            line_number,
            tool: tool.into(),
            issue_type: issue_type.into(),
            severity,
            message: message.into(),
            cert_reference,
        }
    }

    /// Filename as shown in reports: relative to `root` when it lives under it.
    pub fn display_path(&self, root: &Path) -> String {
        self.filename
            .strip_prefix(root)
            .unwrap_or(&self.filename)
            .display()
            .to_string()
    }
}
