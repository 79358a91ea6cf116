//! Built-in tool plugins
//!
//! Each adapter builds a command line from the package's tagged sources and
//! the invocation flags, runs the tool from the package root, and parses its
//! output. Parsers are exposed as free functions so they can be tested on
//! captured output without the tool installed.

pub mod command;
pub mod cppcheck;
pub mod hadolint;
pub mod pycodestyle;
pub mod shellcheck;

pub use command::CommandTool;
pub use cppcheck::CppcheckTool;
pub use hadolint::HadolintTool;
pub use pycodestyle::PycodestyleTool;
pub use shellcheck::ShellcheckTool;

use super::ToolPlugin;
use crate::issue::Severity;
use std::sync::Arc;

/// Every tool plugin shipped with lintmux.
pub fn builtins() -> Vec<Arc<dyn ToolPlugin>> {
    vec![
        Arc::new(ShellcheckTool::new()),
        Arc::new(PycodestyleTool::new()),
        Arc::new(CppcheckTool::new()),
        Arc::new(HadolintTool::new()),
    ]
}

/// Map a textual level reported by a tool to a severity.
///
/// Unknown levels land in the middle of the scale.
pub fn level_severity(level: &str) -> Severity {
    match level.to_ascii_lowercase().as_str() {
        "style" | "info" | "information" | "note" | "convention" => Severity::MIN,
        "error" | "fatal" => Severity::MAX,
        _ => Severity::MEDIUM,
    }
}

/// Whether `flag` is one of `rejected`, or `--name=value` for a rejected `--name`.
pub(crate) fn flag_rejected(flag: &str, rejected: &[&str]) -> bool {
    rejected.iter().any(|r| {
        flag == *r
            || flag
                .strip_prefix(r)
                .is_some_and(|rest| r.starts_with("--") && rest.starts_with('='))
    })
}
