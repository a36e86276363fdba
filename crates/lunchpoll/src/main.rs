//! Lunch-ordering poll bot.
//!
//! Usage:
//! ```bash
//! lunchpoll serve                  # Dispatch chat events from stdin
//! lunchpoll serve --dry-run        # Same, with an in-memory store and no outbound calls
//! lunchpoll resolve --at 2026-10-16T20:00:00
//! lunchpoll menu                   # Print the current menu
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "lunchpoll", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Handle chat events read from stdin, one JSON object per line
    Serve(commands::serve::ServeArgs),

    /// Show which ledger page a vote at a given instant would land on
    Resolve(commands::resolve::ResolveArgs),

    /// Fetch and print the menu
    Menu(commands::menu::MenuArgs),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serve(_) => f.debug_tuple("Serve").finish(),
            Self::Resolve(_) => f.debug_tuple("Resolve").finish(),
            Self::Menu(_) => f.debug_tuple("Menu").finish(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse().context("failed to parse log directive")?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Serve(args) => commands::serve::run(args).await,
        Command::Resolve(args) => commands::resolve::run(args),
        Command::Menu(args) => commands::menu::run(args).await,
    }
}
