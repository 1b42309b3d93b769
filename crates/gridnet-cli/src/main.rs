use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use gridnet_cli::{load_config, Cli, Commands, GridnetConfig};
use gridnet_core::GridError;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;

/// `--log-level` wins, then `RUST_LOG`, then the config file.
fn init_tracing(cli: &Cli, config: &GridnetConfig) {
    let filter = match &cli.log_level {
        Some(level) => EnvFilter::try_new(level),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.logging.level)),
    }
    .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: &Cli, config: &GridnetConfig) -> Result<()> {
    match &cli.command {
        Commands::Migrate { input, output } => commands::migrate::handle(input, output.as_deref()),
        Commands::Check { input } => commands::check::handle(input),
        Commands::Inspect { input, dot } => commands::inspect::handle(input, *dot),
        Commands::Request { input, output } => {
            commands::request::handle(input, output.as_deref(), config.solver)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&cli, &config);
    debug!(?config, "configuration loaded");

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let kind = err
                .downcast_ref::<GridError>()
                .map(|e| e.kind().as_str())
                .unwrap_or("error");
            error!(kind, "command failed");
            eprintln!("error [{kind}]: {err:#}");
            ExitCode::FAILURE
        }
    }
}
