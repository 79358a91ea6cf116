use super::flag_rejected;
use crate::error::PluginError;
use crate::issue::{Issue, Severity};
use crate::package::Package;
use crate::plugin::{collect_sources, resolve_reported_path, Invocation, PluginDescriptor, ToolPlugin};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Matches `path:row: [CODE] text` as produced by [`OUTPUT_FORMAT`].
static LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+):(\d+): \[(.+)\] (.+)$").unwrap());

const OUTPUT_FORMAT: &str = "--format=%(path)s:%(row)d: [%(code)s] %(text)s";

/// Runs `pycodestyle` over discovered Python sources.
pub struct PycodestyleTool {
    descriptor: PluginDescriptor,
}

impl PycodestyleTool {
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::tool("pycodestyle", &["python_src"]),
        }
    }
}

impl Default for PycodestyleTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolPlugin for PycodestyleTool {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn default_flags(&self) -> Vec<String> {
        vec![OUTPUT_FORMAT.to_string()]
    }

    fn supports_flag(&self, flag: &str) -> bool {
        !flag_rejected(flag, &["--format"])
    }

    fn scan(&self, package: &Package, invocation: &Invocation<'_>) -> Result<Vec<Issue>, PluginError> {
        let files = collect_sources(package, &self.descriptor.requires);
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let mut args = invocation.flags.clone();
        args.extend(files.iter().map(|p| p.display().to_string()));
        let output = invocation.run(self.binary(), &args, &package.path, &[0, 1])?;
        Ok(parse_output(&output.stdout, &package.path))
    }
}

/// Parse pycodestyle lines; anything that does not match is ignored.
///
/// Some plugins report several comma-separated codes; the first non-empty one
/// becomes the issue type.
pub fn parse_output(output: &str, root: &Path) -> Vec<Issue> {
    output
        .lines()
        .filter_map(|line| {
            let caps = LINE_RE.captures(line)?;
            let line_number = caps[2].parse().ok()?;
            let issue_type = caps[3]
                .split(',')
                .map(str::trim)
                .find(|code| !code.is_empty())?;
            Some(Issue::new(
                resolve_reported_path(root, &caps[1]),
                line_number,
                "pycodestyle",
                issue_type,
                Severity::MAX,
                &caps[4],
                None,
            ))
        })
        .collect()
}
