use super::{flag_rejected, level_severity};
use crate::error::PluginError;
use crate::issue::Issue;
use crate::package::Package;
use crate::plugin::{collect_sources, resolve_reported_path, Invocation, PluginDescriptor, ToolPlugin};
use serde::Deserialize;
use std::path::Path;

/// Runs `hadolint --format json` over discovered Dockerfiles.
pub struct HadolintTool {
    descriptor: PluginDescriptor,
}

impl HadolintTool {
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::tool("hadolint", &["dockerfile_src"]),
        }
    }
}

impl Default for HadolintTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolPlugin for HadolintTool {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn default_flags(&self) -> Vec<String> {
        vec!["--format".to_string(), "json".to_string()]
    }

    fn supports_flag(&self, flag: &str) -> bool {
        !flag_rejected(flag, &["-f", "--format", "--no-fail"])
    }

    fn scan(&self, package: &Package, invocation: &Invocation<'_>) -> Result<Vec<Issue>, PluginError> {
        let files = collect_sources(package, &self.descriptor.requires);
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let mut args = invocation.flags.clone();
        args.extend(files.iter().map(|p| p.display().to_string()));
        let output = invocation.run(self.binary(), &args, &package.path, &[0, 1])?;
        parse_output(&output.stdout, &package.path)
    }
}

#[derive(Debug, Deserialize)]
struct Finding {
    code: String,
    file: String,
    level: String,
    line: usize,
    message: String,
}

/// Parse hadolint's JSON report.
pub fn parse_output(output: &str, root: &Path) -> Result<Vec<Issue>, PluginError> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }
    let findings: Vec<Finding> = serde_json::from_str(output)
        .map_err(|e| PluginError::Execution(format!("invalid hadolint output: {}", e)))?;
    Ok(findings
        .into_iter()
        .map(|f| {
            Issue::new(
                resolve_reported_path(root, &f.file),
                f.line,
                "hadolint",
                f.code,
                level_severity(&f.level),
                f.message,
                None,
            )
        })
        .collect())
}
