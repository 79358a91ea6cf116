use super::flag_rejected;
use crate::error::PluginError;
use crate::issue::{Issue, Severity};
use crate::package::Package;
use crate::plugin::{collect_sources, resolve_reported_path, Invocation, PluginDescriptor, ToolPlugin};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

static LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(.+):(\d+)\]:\s\((.+?)\s(.+?)\)\s(.+)").unwrap());

const TEMPLATE: &str = "--template=[{file}:{line}]: ({severity} {id}) {message}";

const VALID_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx", "c", "cc", "cpp", "cxx"];

/// Runs `cppcheck` over C/C++ sources and headers.
pub struct CppcheckTool {
    descriptor: PluginDescriptor,
}

impl CppcheckTool {
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::tool("cppcheck", &["c_src", "headers"]),
        }
    }
}

impl Default for CppcheckTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolPlugin for CppcheckTool {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn default_flags(&self) -> Vec<String> {
        ["--quiet", "--inline-suppr", "--language=c++", TEMPLATE]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn supports_flag(&self, flag: &str) -> bool {
        !flag_rejected(flag, &["--template", "--error-exitcode", "--xml"])
    }

    fn scan(&self, package: &Package, invocation: &Invocation<'_>) -> Result<Vec<Issue>, PluginError> {
        let files = collect_sources(package, &self.descriptor.requires);
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let mut args = invocation.flags.clone();
        args.extend(files.iter().map(|p| p.display().to_string()));

        // cppcheck exits 0 with findings; anything else is a failure.
        let output = invocation.run(self.binary(), &args, &package.path, &[0])?;
        Ok(parse_output(
            &output.combined(),
            &package.path,
            invocation.cert_mapping,
        ))
    }
}

/// Parse lines produced by the adapter's `--template`.
///
/// `information` messages and progress lines are dropped, as is
/// `variableScope` in plain C files, where narrowing scope is often not
/// possible. CERT references are looked up by check id.
pub fn parse_output(
    output: &str,
    root: &Path,
    cert_mapping: Option<&BTreeMap<String, String>>,
) -> Vec<Issue> {
    output
        .lines()
        .filter(|line| !line.starts_with("[*"))
        .filter_map(|line| {
            let caps = LINE_RE.captures(line)?;
            let (file, severity, id) = (&caps[1], &caps[3], &caps[4]);
            if severity == "information" || (file.ends_with(".c") && id == "variableScope") {
                return None;
            }
            let extension = Path::new(file).extension()?.to_str()?;
            if !VALID_EXTENSIONS.contains(&extension) {
                return None;
            }
            Some(Issue::new(
                resolve_reported_path(root, file),
                caps[2].parse().ok()?,
                "cppcheck",
                format!("{}/{}", severity, id),
                Severity::MAX,
                &caps[5],
                cert_mapping.and_then(|m| m.get(id)).cloned(),
            ))
        })
        .collect()
}
