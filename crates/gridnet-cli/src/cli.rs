use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Distribution network documents and validation", long_about = None)]
pub struct Cli {
    /// Set the logging level (overrides RUST_LOG and the config file)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Configuration file (defaults to ~/.gridnet/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bring a network document of any version to the current version
    Migrate {
        /// Input JSON document
        input: PathBuf,
        /// Write the migrated document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load a network document and validate it
    Check {
        /// Input JSON document
        input: PathBuf,
    },
    /// Show element counts and galvanic components
    Inspect {
        /// Input JSON document
        input: PathBuf,
        /// Print the element graph in Graphviz DOT format instead
        #[arg(long)]
        dot: bool,
    },
    /// Build the load flow request for a network
    Request {
        /// Input JSON document
        input: PathBuf,
        /// Write the request here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli_command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::parse_from(["gridnet", "check", "net.json", "--log-level", "debug"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Commands::Check { .. }));
    }
}
