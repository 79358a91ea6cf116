use super::{flag_rejected, level_severity};
use crate::error::PluginError;
use crate::issue::Issue;
use crate::package::Package;
use crate::plugin::{collect_sources, resolve_reported_path, Invocation, PluginDescriptor, ToolPlugin};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Output format flags, owned by the adapter.
const FORMAT_FLAGS: &[&str] = &["-f", "--format"];

/// Runs `shellcheck -f json` over discovered shell scripts.
pub struct ShellcheckTool {
    descriptor: PluginDescriptor,
}

impl ShellcheckTool {
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::tool("shellcheck", &["shell_src"]),
        }
    }
}

impl Default for ShellcheckTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolPlugin for ShellcheckTool {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn default_flags(&self) -> Vec<String> {
        vec!["-f".to_string(), "json".to_string()]
    }

    fn supports_flag(&self, flag: &str) -> bool {
        !flag_rejected(flag, FORMAT_FLAGS)
    }

    fn scan(&self, package: &Package, invocation: &Invocation<'_>) -> Result<Vec<Issue>, PluginError> {
        let files = collect_sources(package, &self.descriptor.requires);
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let mut args = invocation.flags.clone();
        args.extend(files.iter().map(|p| p.display().to_string()));

        // Exit code 1 means findings were reported.
        let output = invocation.run(self.binary(), &args, &package.path, &[0, 1])?;
        parse_output(&output.stdout, &package.path)
    }
}

#[derive(Debug, Deserialize)]
struct Comment {
    file: Option<String>,
    line: Option<usize>,
    level: Option<String>,
    code: Option<u32>,
    message: Option<String>,
}

/// Parse shellcheck's `-f json` output, skipping malformed entries.
pub fn parse_output(output: &str, root: &Path) -> Result<Vec<Issue>, PluginError> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }
    let comments: Vec<Comment> = serde_json::from_str(output)
        .map_err(|e| PluginError::Execution(format!("invalid shellcheck output: {}", e)))?;

    let mut issues = Vec::new();
    for comment in comments {
        let (Some(file), Some(line), Some(level), Some(code), Some(message)) = (
            comment.file,
            comment.line,
            comment.level,
            comment.code,
            comment.message,
        ) else {
            debug!("skipping incomplete shellcheck entry");
            continue;
        };
        issues.push(Issue::new(
            resolve_reported_path(root, &file),
            line,
            "shellcheck",
            format!("SC{}", code),
            level_severity(&level),
            message,
            None,
        ));
    }
    Ok(issues)
}
