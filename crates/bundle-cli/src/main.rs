//! Clone Bundler CLI
//!
//! Assembles bundles of repositories from a manifest and releases them.

mod cli;
mod commands;
mod context;
mod error;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::Context;
use error::{CliError, Result};

/// Environment variable holding a tracing filter, overriding `-v`.
const LOG_ENV: &str = "BUNDLER_LOG";

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    execute_command(&cli)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
    if installed.is_ok() {
        tracing::debug!("Verbose mode enabled");
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    let bundle_dir = match &cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "bundler", &mut std::io::stdout());
            return Ok(());
        }
        // configuration comes from the first bundle released
        Commands::ReleaseMultiple { bundles, .. } => bundles
            .first()
            .ok_or_else(|| CliError::user("no bundle to release"))?,
        _ => &cli.bundle_dir,
    };
    let ctx = Context::load(bundle_dir, &cli.release)?;

    match &cli.command {
        Commands::MakeClones => commands::run_make_clones(&ctx),
        Commands::UpdateClones => commands::run_update_clones(&ctx),
        Commands::ClonesRefreshUrl => commands::run_refresh_urls(&ctx),
        Commands::ClonesList { json } => commands::run_clones_list(&ctx, *json),
        Commands::ClonesOut { json } => commands::run_clones_out(&ctx, *json),
        Commands::ReleaseClone { target } => commands::run_release_clone(&ctx, target),
        Commands::ReleaseBundle { name } => commands::run_release_bundle(&ctx, name),
        Commands::ReleaseMultiple { name, bundles } => {
            commands::run_release_multiple(&ctx, name, bundles)
        }
        Commands::Archive { tag, output } => commands::run_archive(&ctx, tag, output),
        Commands::BundleChangelog { from, to, output } => {
            commands::run_bundle_changelog(&ctx, from, to, output.as_deref())
        }
        Commands::Completions { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_error_user() {
        let error = CliError::user("test error");
        assert_eq!(format!("{}", error), "test error");
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
