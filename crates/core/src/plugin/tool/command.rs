use super::level_severity;
use crate::config::ToolDecl;
use crate::error::{ConfigError, PluginError};
use crate::issue::{Issue, Severity};
use crate::package::Package;
use crate::plugin::{collect_sources, resolve_reported_path, Invocation, PluginDescriptor, ToolPlugin};
use regex::Regex;
use std::path::Path;

const REQUIRED_GROUPS: &[&str] = &["file", "line", "type", "message"];

/// Tool plugin declared in config with `[[tools]]`.
///
/// Runs `command args... flags... files...` from the package root and turns
/// every output line matching `pattern` into an issue.
pub struct CommandTool {
    descriptor: PluginDescriptor,
    command: String,
    args: Vec<String>,
    pattern: Regex,
    severity: Severity,
    ok_exit_codes: Vec<i32>,
    unsupported_flags: Vec<String>,
}

impl CommandTool {
    pub fn from_decl(decl: &ToolDecl) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidPlugin {
            name: decl.name.clone(),
            reason,
        };

        let pattern = Regex::new(&decl.pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: decl.pattern.clone(),
            reason: e.to_string(),
        })?;
        let names: Vec<&str> = pattern.capture_names().flatten().collect();
        for group in REQUIRED_GROUPS {
            if !names.contains(group) {
                return Err(invalid(format!("pattern has no `{}` group", group)));
            }
        }
        if decl.requires.is_empty() {
            return Err(invalid("`requires` must name at least one tag".to_string()));
        }
        let severity = Severity::new(decl.severity)
            .ok_or_else(|| invalid(format!("severity {} is outside 1..=5", decl.severity)))?;

        let requires: Vec<&str> = decl.requires.iter().map(String::as_str).collect();
        Ok(Self {
            descriptor: PluginDescriptor::tool(&decl.name, &requires),
            command: decl.command.clone(),
            args: decl.args.clone(),
            pattern,
            severity,
            ok_exit_codes: decl.ok_exit_codes.clone(),
            unsupported_flags: decl.unsupported_flags.clone(),
        })
    }

    /// Turn matching output lines into issues.
    pub fn parse_output(&self, output: &str, root: &Path, invocation: Option<&Invocation<'_>>) -> Vec<Issue> {
        output
            .lines()
            .filter_map(|line| {
                let caps = self.pattern.captures(line)?;
                let line_number = caps.name("line")?.as_str().parse().ok()?;
                let issue_type = caps.name("type")?.as_str();
                let severity = match caps.name("severity").map(|m| m.as_str()) {
                    Some(raw) => match raw.parse::<i64>() {
                        Ok(n) => Severity::clamped(n),
                        Err(_) => level_severity(raw),
                    },
                    None => self.severity,
                };
                Some(Issue::new(
                    resolve_reported_path(root, caps.name("file")?.as_str()),
                    line_number,
                    self.name(),
                    issue_type,
                    severity,
                    caps.name("message")?.as_str(),
                    invocation.and_then(|inv| inv.cert_reference(issue_type)),
                ))
            })
            .collect()
    }
}

impl ToolPlugin for CommandTool {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn binary(&self) -> &str {
        &self.command
    }

    fn default_flags(&self) -> Vec<String> {
        self.args.clone()
    }

    fn supports_flag(&self, flag: &str) -> bool {
        !self.unsupported_flags.iter().any(|f| f == flag)
    }

    fn scan(&self, package: &Package, invocation: &Invocation<'_>) -> Result<Vec<Issue>, PluginError> {
        let files = collect_sources(package, &self.descriptor.requires);
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let mut args = invocation.flags.clone();
        args.extend(files.iter().map(|p| p.display().to_string()));
        let output = invocation.run(&self.command, &args, &package.path, &self.ok_exit_codes)?;
        Ok(self.parse_output(&output.combined(), &package.path, Some(invocation)))
    }
}
