//! Discovery and tool plugins
//!
//! Discovery plugins inventory a package's files under named tags; tool
//! plugins run one external analyzer over tagged files and normalize its
//! output into [`Issue`]s. Both are registered in a typed
//! [`registry::PluginRegistry`] at process start.

pub mod discovery;
pub mod process;
pub mod registry;
pub mod tool;

use crate::error::PluginError;
use crate::exceptions::Exceptions;
use crate::issue::Issue;
use crate::package::{Package, SourceSink};
use process::{CancelToken, ProcessOutput};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Discovery,
    Tool,
}

/// Self-description of a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDescriptor {
    pub name: String,
    pub capability: Capability,
    /// Tags read as input
    pub requires: Vec<String>,
    /// Tags written (discovery plugins only)
    pub produces: Vec<String>,
}

impl PluginDescriptor {
    pub fn discovery(name: &str, produces: &[&str], requires: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            capability: Capability::Discovery,
            requires: to_strings(requires),
            produces: to_strings(produces),
        }
    }

    pub fn tool(name: &str, requires: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            capability: Capability::Tool,
            requires: to_strings(requires),
            produces: Vec::new(),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Trait for plugins that inventory source files
pub trait DiscoveryPlugin: Send + Sync {
    fn descriptor(&self) -> &PluginDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Record files under the plugin's declared tags.
    ///
    /// The sink only accepts the tags in `descriptor().produces` and silently
    /// drops paths excluded by `exceptions`.
    fn scan(
        &self,
        sink: &mut SourceSink<'_>,
        level: &str,
        exceptions: &Exceptions,
    ) -> Result<(), PluginError>;
}

/// Trait for plugins wrapping one external analyzer
pub trait ToolPlugin: Send + Sync {
    fn descriptor(&self) -> &PluginDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Executable invoked by this plugin.
    fn binary(&self) -> &str {
        self.name()
    }

    /// Flags always passed ahead of level flags.
    fn default_flags(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether a level flag may be passed through to the tool.
    fn supports_flag(&self, _flag: &str) -> bool {
        true
    }

    /// Installed tool version, if it can be determined.
    fn version(&self) -> Option<String> {
        process::tool_version(self.binary())
    }

    /// Run the tool over `package` and return its normalized findings.
    ///
    /// `Ok(vec![])` means the tool ran and found nothing. Any error means the
    /// tool contributed nothing to this run.
    fn scan(&self, package: &Package, invocation: &Invocation<'_>) -> Result<Vec<Issue>, PluginError>;
}

/// Everything a tool plugin needs for one run.
pub struct Invocation<'a> {
    pub level: &'a str,
    /// Default flags followed by the supported level flags
    pub flags: Vec<String>,
    pub timeout: Duration,
    pub cancel: &'a CancelToken,
    /// Issue type → CERT reference for this tool
    pub cert_mapping: Option<&'a BTreeMap<String, String>>,
}

impl<'a> Invocation<'a> {
    /// Run `program` from `cwd`, accepting only the given exit codes.
    pub fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        ok_exit_codes: &[i32],
    ) -> Result<ProcessOutput, PluginError> {
        let output = process::run_process(program, args, Some(cwd), self.timeout, self.cancel)?;
        match output.status {
            Some(code) if ok_exit_codes.contains(&code) => Ok(output),
            Some(code) => Err(PluginError::Execution(format!(
                "{} exited with code {}: {}",
                program,
                code,
                output.stderr.lines().next().unwrap_or("").trim()
            ))),
            None => Err(PluginError::Execution(format!(
                "{} was terminated by a signal",
                program
            ))),
        }
    }

    pub fn cert_reference(&self, issue_type: &str) -> Option<String> {
        self.cert_mapping
            .and_then(|m| m.get(issue_type))
            .cloned()
    }
}

/// Files recorded under any of `tags`, in tag order, without duplicates.
pub fn collect_sources(package: &Package, tags: &[String]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    tags.iter()
        .flat_map(|tag| package.sources(tag))
        .filter(|path| seen.insert(path.as_path()))
        .cloned()
        .collect()
}

/// Resolve a path reported by a tool (run from `root`) to an absolute path.
pub fn resolve_reported_path(root: &Path, reported: &str) -> PathBuf {
    let path = Path::new(reported);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
