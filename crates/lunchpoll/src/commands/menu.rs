//! `lunchpoll menu` command implementation.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use lunchpoll_core::{MenuCatalog, MenuItem};
use lunchpoll_runtime::{CatalogHandle, sheets_store};

#[derive(Args)]
pub struct MenuArgs {
    /// Path to lunchpoll.toml.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the catalog as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: &MenuArgs) -> Result<()> {
    let (_, config) = super::load_config(args.config.as_deref())?;
    let store = sheets_store(&config).context("failed to create store")?;
    let catalog = CatalogHandle::new(Arc::new(store), config.sheets.menu_page.clone())
        .refresh()
        .await
        .with_context(|| format!("failed to read menu page {:?}", config.sheets.menu_page))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(catalog.items())?);
    } else {
        print_table(&catalog);
    }
    Ok(())
}

fn print_table(catalog: &MenuCatalog) {
    if catalog.is_empty() {
        println!("{} No menu items available.", style("!").yellow().bold());
        return;
    }

    let width = id_width(catalog.items());
    println!("{}", style(format!("{:<width$}  ITEM", "ID")).bold());
    for item in catalog.items() {
        println!("{:<width$}  {}", item.id, item.label);
    }
    println!("\n{} {} item(s)", style("✓").green().bold(), catalog.len());
}

fn id_width(items: &[MenuItem]) -> usize {
    items
        .iter()
        .map(|item| item.id.chars().count())
        .max()
        .unwrap_or(0)
        .max("ID".len())
}
