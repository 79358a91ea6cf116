//! Initialize lintmux.toml configuration

use anyhow::{Context, Result};
use lintmux_core::config::{LevelConfig, LintmuxConfig, RunConfig};
use std::path::Path;

/// Level the starter config defines and selects.
const STARTER_LEVEL: &str = "project";

/// A config with one `project` level inheriting the built-in `default`.
pub fn starter_config() -> LintmuxConfig {
    let mut config = LintmuxConfig {
        run: RunConfig {
            default_level: Some(STARTER_LEVEL.to_string()),
            fail_on: Some(1),
            ..RunConfig::default()
        },
        ..LintmuxConfig::default()
    };
    config.levels.insert(
        STARTER_LEVEL.to_string(),
        LevelConfig {
            extends: Some("default".to_string()),
            ..LevelConfig::default()
        },
    );
    config
}

pub fn run(path: Option<&Path>) -> Result<()> {
    let target_path = path.unwrap_or_else(|| Path::new("."));
    let config_path = target_path.join("lintmux.toml");

    if config_path.exists() {
        println!("⚠️  lintmux.toml already exists at {:?}", config_path);
        return Ok(());
    }

    starter_config()
        .save(&config_path)
        .with_context(|| format!("write {}", config_path.display()))?;

    println!("✅ Created lintmux.toml at {:?}", config_path);
    println!("\nAdd plugins and flags to the `{}` level, then run:", STARTER_LEVEL);
    println!("  lintmux scan");

    Ok(())
}
