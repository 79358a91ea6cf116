//! Error types for configuration loading, plugin graphs, and plugin execution
//!
//! Only [`ConfigError`] and [`DependencyCycleError`] are fatal. A
//! [`PluginError`] never escapes the phase drivers: it is logged and recorded
//! in the run report instead.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Problems with the level graph, plugin declarations, or config/exceptions files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown level '{0}'")]
    UnknownLevel(String),

    #[error("level '{level}' extends unknown level '{parent}'")]
    UnknownParent { level: String, parent: String },

    #[error("level inheritance cycle: {}", .0.join(" -> "))]
    InheritanceCycle(Vec<String>),

    #[error("unknown plugin '{plugin}' in level '{level}'")]
    UnknownPlugin { level: String, plugin: String },

    #[error("plugin '{0}' is registered more than once")]
    DuplicatePlugin(String),

    #[error("plugin '{plugin}' requires tag '{tag}', which no discovery plugin produces")]
    UnknownTag { plugin: String, tag: String },

    #[error("[run] fail_on must be between 0 and 5, got {0}")]
    InvalidFailOn(u8),

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid plugin declaration '{name}': {reason}")]
    InvalidPlugin { name: String, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Discovery plugins whose declared tag dependencies form a cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("dependency cycle among discovery plugins: {}", members.join(", "))]
pub struct DependencyCycleError {
    /// Plugins on the cycle, sorted by name.
    pub members: Vec<String>,
}

/// A single plugin failed. Recovered locally by the phase drivers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    /// The plugin or its external process failed while running.
    #[error("{0}")]
    Execution(String),

    /// The external tool could not be launched at all.
    #[error("tool unavailable: {0}")]
    Unavailable(String),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,

    /// A discovery plugin wrote a tag it did not declare.
    #[error("plugin '{plugin}' wrote undeclared tag '{tag}'")]
    UndeclaredTag { plugin: String, tag: String },
}

/// Fatal errors that abort a run before any scan begins.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    DependencyCycle(#[from] DependencyCycleError),

    #[error("package path {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
