//! Inline suppression comments
//!
//! `NOLINT` anywhere on a line suppresses issues reported on that line;
//! `NOLINTNEXTLINE` suppresses issues on the line that follows. Any comment
//! style works since we only search for the token.

use crate::issue::Issue;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

static NOLINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bNOLINT(NEXTLINE)?\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nolint {
    SameLine,
    NextLine,
}

/// Parse inline suppression markers from file content.
///
/// Returns a map of `line_number → marker` (1-indexed).
pub fn parse_nolint(content: &str) -> HashMap<usize, Nolint> {
    let mut map = HashMap::new();
    for (idx, line) in content.lines().enumerate() {
        if let Some(caps) = NOLINT_RE.captures(line) {
            let kind = if caps.get(1).is_some() {
                Nolint::NextLine
            } else {
                Nolint::SameLine
            };
            map.insert(idx + 1, kind);
        }
    }
    map
}

/// Whether an issue on `line` is silenced by the parsed markers.
pub fn is_line_suppressed(line: usize, markers: &HashMap<usize, Nolint>) -> bool {
    let same_line = markers.get(&line) == Some(&Nolint::SameLine);
    let line_before = line > 1 && markers.get(&(line - 1)) == Some(&Nolint::NextLine);
    same_line || line_before
}

/// An issue that was suppressed, paired with the reason for suppression.
#[derive(Debug, Clone)]
pub struct SuppressedIssue {
    pub issue: Issue,
    /// Human-readable suppression source: `"exception rule"` or `"inline NOLINT"`.
    pub reason: String,
}

/// Filter issues by inline `NOLINT` markers in their source files.
///
/// Each file is read at most once; unreadable files suppress nothing.
/// Returns `(kept, suppressed)`.
pub fn filter_inline(issues: Vec<Issue>) -> (Vec<Issue>, Vec<SuppressedIssue>) {
    let mut markers: HashMap<PathBuf, HashMap<usize, Nolint>> = HashMap::new();
    for issue in &issues {
        if !markers.contains_key(&issue.filename) {
            let parsed = fs::read_to_string(&issue.filename)
                .map(|content| parse_nolint(&content))
                .unwrap_or_default();
            markers.insert(issue.filename.clone(), parsed);
        }
    }

    let mut kept = Vec::new();
    let mut suppressed = Vec::new();
    for issue in issues {
        let silenced = markers
            .get(&issue.filename)
            .is_some_and(|m| is_line_suppressed(issue.line_number, m));
        if silenced {
            suppressed.push(SuppressedIssue {
                issue,
                reason: "inline NOLINT".to_string(),
            });
        } else {
            kept.push(issue);
        }
    }
    (kept, suppressed)
}
