//! Exceptions: path exclusions and issue suppression rules
//!
//! Loaded once per run from a TOML file such as:
//!
//! ```toml
//! ignore_packages = ["third_party"]
//! exclude = ["*/build/*", "*/vendor/*"]
//!
//! [[suppress]]
//! file = "*/generated/*"
//! type = "*"
//!
//! [[suppress]]
//! file = "*/legacy.sh"
//! type = "SC2086"
//! line = 12
//! tools = ["shellcheck"]
//!
//! [packages.core]
//! exclude = ["*/fixtures/*"]
//! ```
//!
//! Patterns are shell globs matched against the full issue filename or file
//! path (`*` also matches `/`).

use crate::error::ConfigError;
use crate::issue::Issue;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// On-disk exceptions file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionsFile {
    /// Honor inline `NOLINT` / `NOLINTNEXTLINE` comments
    #[serde(default = "default_true")]
    pub inline_nolint: bool,

    /// Package names skipped entirely in workspace scans
    #[serde(default)]
    pub ignore_packages: Vec<String>,

    /// Glob patterns for files that are never scanned
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub suppress: Vec<SuppressionRule>,

    /// Extra exclusions and rules that apply to one package only
    #[serde(default)]
    pub packages: BTreeMap<String, PackageExceptionsFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageExceptionsFile {
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub suppress: Vec<SuppressionRule>,
}

/// One suppression rule as written in the exceptions file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionRule {
    /// Glob matched against the issue filename
    #[serde(default = "default_star")]
    pub file: String,

    /// Glob matched against the issue type
    #[serde(default = "default_star", rename = "type")]
    pub issue_type: String,

    /// Only suppress issues on this exact line
    #[serde(default)]
    pub line: Option<usize>,

    /// Only suppress issues from these tools (empty = any tool)
    #[serde(default)]
    pub tools: Vec<String>,

    /// Only suppress issues whose message matches this regex
    #[serde(default)]
    pub message: Option<String>,
}

impl Default for ExceptionsFile {
    fn default() -> Self {
        toml::from_str("").expect("empty TOML should parse to defaults")
    }
}

fn default_true() -> bool {
    true
}

fn default_star() -> String {
    "*".to_string()
}

/// A compiled suppression rule.
#[derive(Debug, Clone)]
pub struct IssueSuppression {
    pub file_pattern: Pattern,
    pub issue_type_pattern: Pattern,
    pub line: Option<usize>,
    pub tools: Vec<String>,
    pub message: Option<Regex>,
}

impl IssueSuppression {
    pub fn new(
        file_pattern: &str,
        issue_type_pattern: &str,
        line: Option<usize>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            file_pattern: compile_glob(file_pattern)?,
            issue_type_pattern: compile_glob(issue_type_pattern)?,
            line,
            tools: Vec::new(),
            message: None,
        })
    }

    fn from_rule(rule: &SuppressionRule) -> Result<Self, ConfigError> {
        let message = match &rule.message {
            Some(re) => Some(Regex::new(re).map_err(|e| ConfigError::InvalidPattern {
                pattern: re.clone(),
                reason: e.to_string(),
            })?),
            None => None,
        };
        Ok(Self {
            tools: rule.tools.clone(),
            message,
            ..Self::new(&rule.file, &rule.issue_type, rule.line)?
        })
    }

    pub fn matches(&self, issue: &Issue) -> bool {
        if !self.file_pattern.matches(&issue.filename.to_string_lossy()) {
            return false;
        }
        if !self.issue_type_pattern.matches(&issue.issue_type) {
            return false;
        }
        if self.line.is_some_and(|line| line != issue.line_number) {
            return false;
        }
        if !self.tools.is_empty() && !self.tools.iter().any(|t| *t == issue.tool) {
            return false;
        }
        self.message
            .as_ref()
            .map_or(true, |re| re.is_match(&issue.message))
    }
}

#[derive(Debug, Clone, Default)]
struct PackageExceptions {
    path_exclusions: Vec<Pattern>,
    issue_suppressions: Vec<IssueSuppression>,
}

/// Suppression rule set for a run. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Exceptions {
    pub path_exclusions: Vec<Pattern>,
    pub issue_suppressions: Vec<IssueSuppression>,
    pub ignore_packages: Vec<String>,
    pub inline_nolint: bool,
    packages: BTreeMap<String, PackageExceptions>,
}

impl Default for Exceptions {
    fn default() -> Self {
        Self {
            path_exclusions: Vec::new(),
            issue_suppressions: Vec::new(),
            ignore_packages: Vec::new(),
            inline_nolint: true,
            packages: BTreeMap::new(),
        }
    }
}

impl Exceptions {
    /// Load and compile an exceptions file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ExceptionsFile =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::compile(&file)
    }

    /// Find `lintmux-exceptions.toml` in `start_dir` or an ancestor.
    ///
    /// Returns empty exceptions when no file exists.
    pub fn find_and_load(start_dir: &Path) -> Result<Self, ConfigError> {
        let mut current = start_dir;
        loop {
            let candidate = current.join("lintmux-exceptions.toml");
            if candidate.is_file() {
                return Self::from_file(&candidate);
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return Ok(Self::default()),
            }
        }
    }

    pub fn compile(file: &ExceptionsFile) -> Result<Self, ConfigError> {
        let mut packages = BTreeMap::new();
        for (name, pkg) in &file.packages {
            packages.insert(
                name.clone(),
                PackageExceptions {
                    path_exclusions: compile_globs(&pkg.exclude)?,
                    issue_suppressions: compile_rules(&pkg.suppress)?,
                },
            );
        }
        Ok(Self {
            path_exclusions: compile_globs(&file.exclude)?,
            issue_suppressions: compile_rules(&file.suppress)?,
            ignore_packages: file.ignore_packages.clone(),
            inline_nolint: file.inline_nolint,
            packages,
        })
    }

    /// The rule set that applies to one package: global rules plus the
    /// package's own block.
    pub fn for_package(&self, package: &str) -> Exceptions {
        let mut scoped = Exceptions {
            packages: BTreeMap::new(),
            ..self.clone()
        };
        if let Some(pkg) = self.packages.get(package) {
            scoped
                .path_exclusions
                .extend(pkg.path_exclusions.iter().cloned());
            scoped
                .issue_suppressions
                .extend(pkg.issue_suppressions.iter().cloned());
        }
        scoped
    }

    pub fn is_package_ignored(&self, package: &str) -> bool {
        self.ignore_packages.iter().any(|p| p == package)
    }

    pub fn is_path_excluded(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.path_exclusions.iter().any(|p| p.matches(&path))
    }

    /// Drop excluded paths, keeping order.
    pub fn filter_files(&self, files: &[PathBuf]) -> Vec<PathBuf> {
        files
            .iter()
            .filter(|f| !self.is_path_excluded(f))
            .cloned()
            .collect()
    }

    /// Whether any suppression rule matches `issue`.
    pub fn suppresses(&self, issue: &Issue) -> bool {
        self.issue_suppressions.iter().any(|rule| rule.matches(issue))
    }
}

fn compile_glob(pattern: &str) -> Result<Pattern, ConfigError> {
    Pattern::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns.iter().map(|p| compile_glob(p)).collect()
}

fn compile_rules(rules: &[SuppressionRule]) -> Result<Vec<IssueSuppression>, ConfigError> {
    rules.iter().map(IssueSuppression::from_rule).collect()
}
