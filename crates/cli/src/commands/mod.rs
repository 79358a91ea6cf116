//! CLI commands

pub mod init;
pub mod levels;
pub mod scan;
pub mod tools;

use anyhow::{Context, Result};
use lintmux_core::plugin::registry;
use lintmux_core::{ConfigGraph, Exceptions, PluginRegistry};
use std::path::Path;
use std::sync::Arc;

/// Built-in config overlaid by the project file (given or found from
/// `start_dir`) and the user file.
pub fn load_config(cli: &crate::Cli, start_dir: &Path) -> Result<ConfigGraph> {
    let user = cli.user_config.as_deref();
    let graph = match &cli.config {
        Some(path) => ConfigGraph::load(Some(path), user),
        None => ConfigGraph::find_and_load(start_dir, user),
    };
    graph.context("invalid configuration")
}

pub fn load_exceptions(cli: &crate::Cli, start_dir: &Path) -> Result<Exceptions> {
    let exceptions = match &cli.exceptions {
        Some(path) => Exceptions::from_file(path),
        None => Exceptions::find_and_load(start_dir),
    };
    exceptions.context("invalid exceptions file")
}

pub fn load_registry(config: &ConfigGraph) -> Result<Arc<PluginRegistry>> {
    registry::global(config.config()).context("invalid plugin set")
}
