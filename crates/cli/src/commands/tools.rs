//! List registered plugins and installed tool versions

use anyhow::Result;
use colored::Colorize;
use lintmux_core::{PluginCatalog, PluginDescriptor, PluginRegistry};
use serde::Serialize;
use std::path::Path;

use super::{load_config, load_registry};
use crate::OutputFormat;

#[derive(Debug, Serialize)]
pub struct ToolListing {
    #[serde(flatten)]
    pub descriptor: PluginDescriptor,
    pub binary: String,
    /// `None` when the tool is not installed or reports no version
    pub version: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Listing {
    pub discovery: Vec<PluginDescriptor>,
    pub tools: Vec<ToolListing>,
}

/// Descriptors plus probed tool versions.
pub fn build_listing(registry: &PluginRegistry) -> Listing {
    let PluginCatalog { discovery, .. } = registry.discover_plugins();
    let tools = registry
        .tools()
        .map(|tool| ToolListing {
            descriptor: tool.descriptor().clone(),
            binary: tool.binary().to_string(),
            version: tool.version(),
        })
        .collect();
    Listing { discovery, tools }
}

pub fn run(cli: &crate::Cli) -> Result<()> {
    let config = load_config(cli, Path::new("."))?;
    let registry = load_registry(&config)?;
    let listing = build_listing(&registry);

    if cli.format == Some(OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("{}", "Discovery plugins".bold());
    for plugin in &listing.discovery {
        let requires = if plugin.requires.is_empty() {
            String::new()
        } else {
            format!(" (after {})", plugin.requires.join(", "))
        };
        println!(
            "  {:<16} → {}{}",
            plugin.name,
            plugin.produces.join(", "),
            requires.dimmed()
        );
    }

    println!();
    println!("{}", "Tool plugins".bold());
    for tool in &listing.tools {
        let version = match &tool.version {
            Some(v) => v.green(),
            None => "not installed".yellow(),
        };
        println!(
            "  {:<16} ← {:<28} {} [{}]",
            tool.descriptor.name,
            tool.descriptor.requires.join(", "),
            version,
            tool.binary.dimmed()
        );
    }
    Ok(())
}
