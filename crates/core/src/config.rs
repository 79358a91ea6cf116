//! Configuration file parsing for lintmux.toml and level resolution
//!
//! A level names a set of enabled plugins and their flags. Levels form an
//! inheritance chain through `extends`; resolving a level flattens the chain
//! from the root ancestor down, then applies package-type overrides last.

use crate::error::ConfigError;
use crate::plugin::registry::PluginRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

const BUILTIN_CONFIG: &str = include_str!("default_config.toml");

/// Config file names looked up in the package directory and its ancestors.
pub const CONFIG_FILE_NAMES: &[&str] = &["lintmux.toml", ".lintmux.toml"];

/// Main configuration structure for lintmux.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LintmuxConfig {
    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub levels: BTreeMap<String, LevelConfig>,

    /// Extension-based discovery plugins declared in config
    #[serde(default)]
    pub discovery: Vec<DiscoveryDecl>,

    /// Command-line tool plugins declared in config
    #[serde(default)]
    pub tools: Vec<ToolDecl>,

    /// Per-tool issue type → CERT reference
    #[serde(default)]
    pub mappings: BTreeMap<String, BTreeMap<String, String>>,
}

/// Run-wide settings. Unset fields fall back to the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_level: Option<String>,

    /// Lowest severity that fails the run (0 = never fail on issues)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_on: Option<u8>,

    /// Default per-plugin timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Tool worker threads (0 = one per CPU)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    /// Per-plugin timeout overrides in seconds
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub timeouts: BTreeMap<String, u64>,
}

impl RunConfig {
    pub fn default_level(&self) -> &str {
        self.default_level.as_deref().unwrap_or("default")
    }

    pub fn fail_on(&self) -> u8 {
        self.fail_on.unwrap_or(1)
    }

    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or(0)
    }

    pub fn timeout_for(&self, plugin: &str) -> Duration {
        let secs = self
            .timeouts
            .get(plugin)
            .copied()
            .or(self.timeout_secs)
            .unwrap_or(300);
        Duration::from_secs(secs)
    }

    fn merge(&mut self, other: RunConfig) {
        if other.default_level.is_some() {
            self.default_level = other.default_level;
        }
        if other.fail_on.is_some() {
            self.fail_on = other.fail_on;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.jobs.is_some() {
            self.jobs = other.jobs;
        }
        self.timeouts.extend(other.timeouts);
    }
}

/// Flags for one plugin: a token list, or one whitespace-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagSpec {
    Tokens(Vec<String>),
    Line(String),
}

impl FlagSpec {
    pub fn tokens(&self) -> Vec<String> {
        match self {
            FlagSpec::Tokens(tokens) => tokens.clone(),
            FlagSpec::Line(line) => line.split_whitespace().map(String::from).collect(),
        }
    }
}

/// The changes one level (or one package-type block) applies on top of its parent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelDelta {
    #[serde(default)]
    pub enabled_plugins: Vec<String>,

    #[serde(default)]
    pub disabled_plugins: Vec<String>,

    #[serde(default)]
    pub flags: BTreeMap<String, FlagSpec>,
}

impl LevelDelta {
    fn apply(&self, enabled: &mut BTreeSet<String>, flags: &mut BTreeMap<String, Vec<String>>) {
        enabled.extend(self.enabled_plugins.iter().cloned());
        for plugin in &self.disabled_plugins {
            enabled.remove(plugin);
        }
        for (plugin, spec) in &self.flags {
            flags.insert(plugin.clone(), spec.tokens());
        }
    }

    fn plugin_names(&self) -> impl Iterator<Item = &String> {
        self.enabled_plugins
            .iter()
            .chain(&self.disabled_plugins)
            .chain(self.flags.keys())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Parent level whose settings this level inherits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    #[serde(flatten)]
    pub delta: LevelDelta,

    /// Overrides applied when the scanned package has this type
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub package_types: BTreeMap<String, LevelDelta>,
}

/// An extension-based discovery plugin declared in config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryDecl {
    pub name: String,
    /// Tag the discovered files are recorded under
    pub tag: String,
    /// Extensions with leading dot (e.g. `".yaml"`)
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Exact file names (e.g. `"Jenkinsfile"`)
    #[serde(default)]
    pub filenames: Vec<String>,
    /// Tags that must be discovered before this plugin runs
    #[serde(default)]
    pub requires: Vec<String>,
}

/// A command-line tool plugin declared in config.
///
/// The tool is run as `command args... flags... files...` from the package
/// root, and each output line is matched against `pattern`, whose named groups
/// `file`, `line`, `type`, `message` (and optionally `severity`) build an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDecl {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Tags whose files are passed to the tool
    pub requires: Vec<String>,
    pub pattern: String,
    /// Severity used when the pattern has no `severity` group
    #[serde(default = "default_severity")]
    pub severity: u8,
    /// Exit codes that mean the tool ran (findings or not)
    #[serde(default = "default_ok_exit_codes")]
    pub ok_exit_codes: Vec<i32>,
    /// Flags this tool rejects; dropped from level flags
    #[serde(default)]
    pub unsupported_flags: Vec<String>,
}

fn default_severity() -> u8 {
    3
}

fn default_ok_exit_codes() -> Vec<i32> {
    vec![0, 1]
}

impl LintmuxConfig {
    /// The configuration compiled into the binary.
    pub fn builtin() -> Self {
        toml::from_str(BUILTIN_CONFIG).expect("built-in configuration should parse")
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find lintmux.toml in `start_dir` or its ancestors.
    pub fn find(start_dir: &Path) -> Option<std::path::PathBuf> {
        let mut current = start_dir;
        loop {
            for name in CONFIG_FILE_NAMES {
                let candidate = current.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
            current = current.parent()?;
        }
    }

    /// Layer `other` on top of `self`.
    ///
    /// Same-named levels are replaced wholesale; run settings merge field by
    /// field; declared plugins and mappings accumulate.
    pub fn overlay(&mut self, other: LintmuxConfig) {
        self.run.merge(other.run);
        for (name, mut level) in other.levels {
            if level.extends.as_deref() == Some(name.as_str()) {
                warn!(level_name = %name, "level extends itself; treating it as a root level");
                level.extends = None;
            }
            self.levels.insert(name, level);
        }
        self.discovery.extend(other.discovery);
        self.tools.extend(other.tools);
        for (tool, mapping) in other.mappings {
            self.mappings.entry(tool).or_default().extend(mapping);
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, contents)
    }
}

/// A level selection flattened into concrete plugin sets and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub level: String,
    pub package_type: Option<String>,
    pub enabled_discovery: BTreeSet<String>,
    pub enabled_tools: BTreeSet<String>,
    pub flags: BTreeMap<String, Vec<String>>,
}

impl ResolvedConfig {
    pub fn flags_for(&self, plugin: &str) -> &[String] {
        self.flags.get(plugin).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A validated configuration: every parent exists and inheritance is acyclic.
///
/// Read-only after construction and safe to share between threads.
#[derive(Debug, Clone)]
pub struct ConfigGraph {
    config: LintmuxConfig,
}

impl ConfigGraph {
    pub fn new(config: LintmuxConfig) -> Result<Self, ConfigError> {
        if let Some(fail_on) = config.run.fail_on.filter(|v| *v > 5) {
            return Err(ConfigError::InvalidFailOn(fail_on));
        }
        let graph = Self { config };
        for level in graph.config.levels.keys() {
            graph.chain(level)?;
        }
        Ok(graph)
    }

    /// Built-in config, overlaid by the project file and then the user file.
    pub fn load(project: Option<&Path>, user: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = LintmuxConfig::builtin();
        for path in [project, user].into_iter().flatten() {
            config.overlay(LintmuxConfig::from_file(path)?);
        }
        Self::new(config)
    }

    /// Like [`ConfigGraph::load`], finding the project file from `start_dir`.
    pub fn find_and_load(start_dir: &Path, user: Option<&Path>) -> Result<Self, ConfigError> {
        let project = LintmuxConfig::find(start_dir);
        Self::load(project.as_deref(), user)
    }

    pub fn config(&self) -> &LintmuxConfig {
        &self.config
    }

    pub fn run(&self) -> &RunConfig {
        &self.config.run
    }

    pub fn has_level(&self, level: &str) -> bool {
        self.config.levels.contains_key(level)
    }

    pub fn levels(&self) -> impl Iterator<Item = &str> {
        self.config.levels.keys().map(String::as_str)
    }

    /// Inheritance chain for `level`, root ancestor first.
    pub fn chain(&self, level: &str) -> Result<Vec<&str>, ConfigError> {
        let (name, mut current) = self
            .config
            .levels
            .get_key_value(level)
            .ok_or_else(|| ConfigError::UnknownLevel(level.to_string()))?;

        let mut chain = vec![name.as_str()];
        let mut seen: HashSet<&str> = HashSet::from([name.as_str()]);
        while let Some(parent) = current.extends.as_deref() {
            let child = chain[chain.len() - 1];
            let (parent_name, parent_cfg) =
                self.config.levels.get_key_value(parent).ok_or_else(|| {
                    ConfigError::UnknownParent {
                        level: child.to_string(),
                        parent: parent.to_string(),
                    }
                })?;
            if !seen.insert(parent_name.as_str()) {
                let mut cycle: Vec<String> = chain.iter().map(|s| s.to_string()).collect();
                cycle.push(parent_name.clone());
                return Err(ConfigError::InheritanceCycle(cycle));
            }
            chain.push(parent_name.as_str());
            current = parent_cfg;
        }
        chain.reverse();
        Ok(chain)
    }

    /// Flatten `level` into enabled plugin names and flags, without
    /// classifying plugins.
    pub fn flatten(
        &self,
        level: &str,
        package_type: Option<&str>,
    ) -> Result<(BTreeSet<String>, BTreeMap<String, Vec<String>>), ConfigError> {
        let chain = self.chain(level)?;
        let mut enabled = BTreeSet::new();
        let mut flags = BTreeMap::new();

        for name in &chain {
            self.config.levels[*name].delta.apply(&mut enabled, &mut flags);
        }
        if let Some(kind) = package_type {
            for name in &chain {
                if let Some(delta) = self.config.levels[*name].package_types.get(kind) {
                    delta.apply(&mut enabled, &mut flags);
                }
            }
        }
        Ok((enabled, flags))
    }

    /// Resolve `level` for a package of `package_type`.
    ///
    /// Every plugin named anywhere in the chain must be registered.
    pub fn resolve(
        &self,
        level: &str,
        package_type: Option<&str>,
        registry: &PluginRegistry,
    ) -> Result<ResolvedConfig, ConfigError> {
        for name in self.chain(level)? {
            let cfg = &self.config.levels[name];
            let named = cfg
                .delta
                .plugin_names()
                .chain(cfg.package_types.values().flat_map(LevelDelta::plugin_names));
            for plugin in named {
                if !registry.contains(plugin) {
                    return Err(ConfigError::UnknownPlugin {
                        level: name.to_string(),
                        plugin: plugin.clone(),
                    });
                }
            }
        }

        let (enabled, flags) = self.flatten(level, package_type)?;
        let (enabled_discovery, enabled_tools): (BTreeSet<String>, BTreeSet<String>) = enabled
            .into_iter()
            .partition(|name| registry.discovery(name).is_some());

        Ok(ResolvedConfig {
            level: level.to_string(),
            package_type: package_type.map(str::to_string),
            enabled_discovery,
            enabled_tools,
            flags,
        })
    }
}
