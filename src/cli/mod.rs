//! CLI module for AI Studio Gateway
//!
//! - `serve`: run the HTTP server
//! - `migrate`: apply database migrations and exit

pub mod migrate;
pub mod serve;

use clap::{Parser, Subcommand};

/// AI Studio Gateway - quota-metered proxy for generative AI features
#[derive(Parser)]
#[command(name = "ai-studio-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Apply pending database migrations
    Migrate {
        /// Revert the most recent migration instead
        #[arg(long)]
        revert: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::parse_from(["ai-studio-gateway"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["ai-studio-gateway", "migrate", "--revert"]);
        assert!(matches!(cli.command, Some(Command::Migrate { revert: true })));
    }
}
