//! `lunchpoll serve` command implementation.

use std::{future::Future, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use lunchpoll_core::{Config, MENU_HEADER, SheetRow};
use lunchpoll_runtime::{Bot, BotBuilder, ChatEvent, LogSink, spawn_gate};
use lunchpoll_sheets::InMemoryTabularStore;
use tokio::{
    io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    signal,
};
use tracing::{info, warn};

#[derive(Args)]
pub struct ServeArgs {
    /// Path to lunchpoll.toml.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use an in-memory store and log outgoing chat calls instead of sending them.
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(args: &ServeArgs) -> Result<()> {
    let shutdown = async {
        let _ = signal::ctrl_c().await;
        info!("Received shutdown signal");
    };
    run_with_shutdown(args, shutdown).await
}

async fn run_with_shutdown<F>(args: &ServeArgs, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let (path, config) = super::load_config(args.config.as_deref())?;
    eprintln!(
        "{} Starting lunchpoll with {}",
        style("→").cyan(),
        path.display()
    );

    let bot = Arc::new(build_bot(config, args.dry_run)?);
    if args.dry_run {
        eprintln!(
            "{} Dry run: votes stay in memory, chat calls are only logged",
            style("!").yellow().bold()
        );
    }

    let (gate, gate_task) = spawn_gate(
        bot.config().window,
        Arc::clone(bot.clock()),
        bot.config().gate.interval(),
    );
    let follower = tokio::spawn(Arc::clone(&bot).follow_gate(gate));

    eprintln!(
        "{} Listening for events on stdin (ordering hours {})",
        style("✓").green().bold(),
        bot.config().window.ordering_hours()
    );

    let result = serve_events(&bot, BufReader::new(io::stdin()), io::stdout(), shutdown).await;

    follower.abort();
    gate_task.abort();

    let handled = result?;
    info!(handled, "lunchpoll stopped");
    Ok(())
}

fn build_bot(config: Config, dry_run: bool) -> Result<Bot> {
    let menu_page = config.sheets.menu_page.clone();
    let mut builder = BotBuilder::new(config);
    if dry_run {
        let header: SheetRow = MENU_HEADER.iter().map(|cell| (*cell).to_string()).collect();
        builder = builder
            .with_store(Arc::new(InMemoryTabularStore::with_pages([(
                menu_page,
                vec![header],
            )])))
            .with_sink(Arc::new(LogSink::new()));
    }
    builder.build().context("failed to initialize bot")
}

/// Reads one JSON event per line from `input` and writes one JSON reply per
/// line to `output` until EOF or `shutdown`. Returns the number of events
/// handled.
async fn serve_events<R, W, F>(bot: &Bot, input: R, mut output: W, shutdown: F) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    let mut lines = input.lines();
    let mut handled = 0;
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            () = &mut shutdown => break,
            line = lines.next_line() => line.context("failed to read event")?,
        };
        let Some(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: ChatEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Skipping malformed event");
                continue;
            }
        };

        let reply = bot.handle(event).await;
        let mut encoded = serde_json::to_vec(&reply)?;
        encoded.push(b'\n');
        output
            .write_all(&encoded)
            .await
            .context("failed to write reply")?;
        output.flush().await.context("failed to flush reply")?;
        handled += 1;
    }

    Ok(handled)
}
