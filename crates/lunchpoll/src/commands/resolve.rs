//! `lunchpoll resolve` command implementation.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDateTime;
use clap::Args;
use console::style;
use lunchpoll_core::{Clock, Config, DateKey, GateState, Rejected};

const INSTANT_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Args)]
pub struct ResolveArgs {
    /// Path to lunchpoll.toml.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Local instant to resolve (`YYYY-MM-DDTHH:MM[:SS]`). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub at: Option<NaiveDateTime>,
}

fn parse_instant(raw: &str) -> Result<NaiveDateTime, String> {
    INSTANT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw.trim(), format).ok())
        .ok_or_else(|| format!("expected YYYY-MM-DDTHH:MM[:SS], got {raw:?}"))
}

#[derive(Debug, PartialEq, Eq)]
struct Resolution {
    at: NaiveDateTime,
    target: Result<DateKey, Rejected>,
    gate: GateState,
}

fn resolve(config: &Config, at: NaiveDateTime) -> Resolution {
    Resolution {
        at,
        target: config.window.resolve_target(at, &config.calendar),
        gate: GateState::at(at, &config.window),
    }
}

pub fn run(args: &ResolveArgs) -> Result<()> {
    let (_, config) = super::load_config(args.config.as_deref())?;
    let at = match args.at {
        Some(at) => at,
        None => config.clock.system_clock()?.now(),
    };

    let resolution = resolve(&config, at);

    println!("{} {}", style("→").cyan(), resolution.at);
    match resolution.target {
        Ok(page) => println!("{} Votes go to page {page}", style("✓").green().bold()),
        Err(reason) => println!("{} Rejected: {reason}", style("✗").red().bold()),
    }
    let gate = match resolution.gate {
        GateState::Enabled => style("enabled").green(),
        GateState::Disabled => style("disabled").yellow(),
    };
    println!("  Voting buttons: {gate}");
    println!("  Ordering hours: {}", config.window.ordering_hours());
    Ok(())
}
