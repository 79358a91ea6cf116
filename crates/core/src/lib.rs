//! Lintmux Core - static analysis orchestration engine
//!
//! This crate drives external analyzers over source packages:
//! - Level configuration with inheritance and package-type overrides
//! - Discovery plugins that inventory tagged source files, run in dependency order
//! - Tool plugins that run one analyzer each, concurrently and with timeouts
//! - Aggregation of findings with deduplication and exception-based suppression

pub mod config;
pub mod engine;
pub mod error;
pub mod exceptions;
pub mod issue;
pub mod package;
pub mod plugin;
pub mod report;
pub mod suppress;

pub use config::{ConfigGraph, LintmuxConfig, ResolvedConfig};
pub use engine::{aggregate, Engine, Observer, RunContext, Silent, ToolOutcome, ToolRun};
pub use error::{ConfigError, DependencyCycleError, Error, PluginError, Result};
pub use exceptions::Exceptions;
pub use issue::{Issue, Severity};
pub use package::{find_packages, Package, SourceSink};
pub use plugin::process::CancelToken;
pub use plugin::registry::{topological_order, PluginCatalog, PluginRegistry};
pub use plugin::{Capability, DiscoveryPlugin, Invocation, PluginDescriptor, ToolPlugin};
pub use report::{PackageReport, RunStatus, RunSummary, WorkspaceReport};
pub use suppress::SuppressedIssue;

/// Lintmux version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
