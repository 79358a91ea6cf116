//! Lintmux CLI - static analysis orchestrator

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use lintmux_cli::{commands, exit_code, init_logging, Cli, Commands};
use lintmux_core::CancelToken;
use tracing::warn;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            exit_code::CONFIG
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<i32> {
    match &cli.command {
        Some(Commands::Init { path }) => {
            commands::init::run(path.as_deref())?;
            Ok(exit_code::OK)
        }
        Some(Commands::Tools) => {
            commands::tools::run(cli)?;
            Ok(exit_code::OK)
        }
        Some(Commands::Levels {
            level,
            package_type,
        }) => {
            commands::levels::run(level.as_deref(), package_type.as_deref(), cli)?;
            Ok(exit_code::OK)
        }
        Some(Commands::Scan {
            path,
            workspace,
            packages,
        }) => scan(path.as_deref(), *workspace, packages, cli),
        None => scan(None, false, &[], cli),
    }
}

fn scan(
    path: Option<&std::path::Path>,
    workspace: bool,
    packages: &[String],
    cli: &Cli,
) -> Result<i32> {
    // Ctrl-C kills in-flight tools; the report for what finished still prints.
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }

    let outcome = commands::scan::run(path, workspace, packages, cli, cancel)?;
    Ok(outcome.exit_code())
}
