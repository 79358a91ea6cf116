//! Merge per-tool findings into the final issue list

use crate::exceptions::Exceptions;
use crate::issue::Issue;
use crate::suppress::{filter_inline, SuppressedIssue};
use std::collections::{BTreeMap, HashSet};

/// Concatenate, deduplicate, and filter per-tool issues.
///
/// Tools are taken in name order and `None` entries contribute nothing.
/// Duplicates are removed by full-field equality keeping the first occurrence,
/// so issues that differ only in severity both survive.
pub fn aggregate(per_tool: &BTreeMap<String, Option<Vec<Issue>>>, exceptions: &Exceptions) -> Vec<Issue> {
    aggregate_with_suppressed(per_tool, exceptions).0
}

/// Like [`aggregate`], also returning what was suppressed and why.
pub fn aggregate_with_suppressed(
    per_tool: &BTreeMap<String, Option<Vec<Issue>>>,
    exceptions: &Exceptions,
) -> (Vec<Issue>, Vec<SuppressedIssue>) {
    let mut seen = HashSet::new();
    let unique: Vec<Issue> = per_tool
        .values()
        .flatten()
        .flatten()
        .filter(|issue| seen.insert(*issue))
        .cloned()
        .collect();

    let (mut kept, mut suppressed): (Vec<Issue>, Vec<SuppressedIssue>) = (Vec::new(), Vec::new());
    for issue in unique {
        if exceptions.suppresses(&issue) {
            suppressed.push(SuppressedIssue {
                issue,
                reason: "exception rule".to_string(),
            });
        } else {
            kept.push(issue);
        }
    }

    if exceptions.inline_nolint {
        let (inline_kept, inline_suppressed) = filter_inline(kept);
        kept = inline_kept;
        suppressed.extend(inline_suppressed);
    }

    (kept, suppressed)
}
