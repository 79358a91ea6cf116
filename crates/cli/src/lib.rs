//! Lintmux CLI library, exposed for integration tests

pub mod commands;
pub mod output;
pub mod progress;
pub mod run_log;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter, e.g. `lintmux_core=debug`.
pub const LOG_ENV: &str = "LINTMUX_LOG";

/// Process exit codes.
pub mod exit_code {
    pub const OK: i32 = 0;
    /// Issues at or above the failure threshold
    pub const ISSUES: i32 = 1;
    /// Configuration, registry, or input error
    pub const CONFIG: i32 = 2;
    /// Interrupted; the printed report is partial
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Parser)]
#[command(name = "lintmux")]
#[command(about = "Run static analysis tools over a package and merge their findings", long_about = None)]
#[command(version = lintmux_core::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Level to run (default: `[run] default_level`)
    #[arg(long, short = 'l', global = true)]
    pub level: Option<String>,

    /// Project config file (default: lintmux.toml found from the package upwards)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// User config overlaid on the project config
    #[arg(long, global = true)]
    pub user_config: Option<PathBuf>,

    /// Exceptions file (default: lintmux-exceptions.toml found from the package upwards)
    #[arg(long, global = true)]
    pub exceptions: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Lowest severity (1-5) that makes the run fail; 0 never fails
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(0..=5))]
    pub fail_on: Option<u8>,

    /// Tool worker threads (0 = one per CPU)
    #[arg(long, short = 'j', global = true)]
    pub jobs: Option<usize>,

    /// Write `<package>-<level>.lintmux.json` reports into this directory
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Show how long each plugin took
    #[arg(long, global = true)]
    pub timings: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a package (default command)
    Scan {
        /// Package directory (default: current directory)
        path: Option<PathBuf>,

        /// Scan every package found below PATH
        #[arg(long)]
        workspace: bool,

        /// Restrict a workspace scan to these package names
        #[arg(long, value_delimiter = ',', requires = "workspace")]
        packages: Vec<String>,
    },

    /// List registered plugins and installed tool versions
    Tools,

    /// List levels, or show what one level resolves to
    Levels {
        /// Level to resolve
        level: Option<String>,

        /// Package type whose overrides apply (e.g. python, cargo)
        #[arg(long)]
        package_type: Option<String>,
    },

    /// Write a starter lintmux.toml
    Init {
        /// Directory to initialize (default: current directory)
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Terminal,
    Json,
}

/// Install the stderr log subscriber.
///
/// `LINTMUX_LOG` wins over the verbosity flags when set.
pub fn init_logging(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
