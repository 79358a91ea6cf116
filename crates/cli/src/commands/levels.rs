//! List levels, or show what a level resolves to

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use super::{load_config, load_registry};

pub fn run(level: Option<&str>, package_type: Option<&str>, cli: &crate::Cli) -> Result<()> {
    let config = load_config(cli, Path::new("."))?;

    let Some(level) = level else {
        let default = config.run().default_level();
        for name in config.levels() {
            let chain = config.chain(name)?.join(" → ");
            let marker = if name == default { " (default)".green().to_string() } else { String::new() };
            println!("  {:<12} {}{}", name.bold(), chain.dimmed(), marker);
        }
        return Ok(());
    };

    let registry = load_registry(&config)?;
    let resolved = config.resolve(level, package_type, &registry)?;

    println!("{} {}", "Level".bold(), resolved.level);
    if let Some(kind) = &resolved.package_type {
        println!("  package type: {}", kind);
    }
    println!("  chain:     {}", config.chain(level)?.join(" → "));
    println!("  discovery: {}", join(&resolved.enabled_discovery));
    println!("  tools:     {}", join(&resolved.enabled_tools));
    for (plugin, flags) in &resolved.flags {
        println!("  flags[{}]: {}", plugin, flags.join(" "));
    }
    Ok(())
}

fn join<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    let names: Vec<&str> = names.into_iter().map(String::as_str).collect();
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}
