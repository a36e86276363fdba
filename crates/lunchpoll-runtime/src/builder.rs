//! Builder for constructing [`Bot`] instances.
//!
//! Collaborators not injected explicitly are created from the config:
//!
//! - **Store**: [`GoogleSheetsStore`] using the token named by
//!   `sheets.access_token_env`
//! - **Chat sink**: [`DiscordSink`] using the token named by
//!   `chat.bot_token_env`
//! - **Clock**: [`SystemClock`](lunchpoll_core::SystemClock) honoring
//!   `clock.utc_offset`
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lunchpoll_core::Config;
//! use lunchpoll_runtime::{BotBuilder, LogSink};
//! use lunchpoll_sheets::InMemoryTabularStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("lunchpoll.toml")?;
//! let bot = BotBuilder::new(config)
//!     .with_store(Arc::new(InMemoryTabularStore::new()))
//!     .with_sink(Arc::new(LogSink::new()))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::{fmt, sync::Arc};

use lunchpoll_core::{Clock, Config, ConfigError};
use lunchpoll_sheets::{GoogleSheetsStore, StoreError, TabularStore};
use tracing::info;

use crate::{Bot, CatalogHandle, ChatSink, DiscordSink, LedgerService, RosterService};

/// Errors that can occur while assembling a bot.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A config value or secret is missing or invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The store could not be constructed.
    #[error("failed to create store: {0}")]
    Store(#[from] StoreError),
}

pub struct BotBuilder {
    config: Config,
    store: Option<Arc<dyn TabularStore>>,
    sink: Option<Arc<dyn ChatSink>>,
    clock: Option<Arc<dyn Clock>>,
}

impl fmt::Debug for BotBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotBuilder")
            .field("config", &self.config)
            .field("store", &self.store.is_some())
            .field("sink", &self.sink.is_some())
            .field("clock", &self.clock.is_some())
            .finish()
    }
}

impl BotBuilder {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
            sink: None,
            clock: None,
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn TabularStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ChatSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Assembles the bot.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if a collaborator has to be created from the
    /// config and its settings or secret are unusable.
    pub fn build(self) -> Result<Bot, BuildError> {
        let config = self.config;

        let store: Arc<dyn TabularStore> = match self.store {
            Some(store) => store,
            None => Arc::new(sheets_store(&config)?),
        };
        let sink: Arc<dyn ChatSink> = match self.sink {
            Some(sink) => sink,
            None => Arc::new(discord_sink(&config)?),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(config.clock.system_clock()?),
        };

        let ledger = LedgerService::new(Arc::clone(&store), config.window, config.calendar.clone());
        let roster = RosterService::new(Arc::clone(&store), config.sheets.roster_page.clone());
        let catalog = CatalogHandle::new(store, config.sheets.menu_page.clone());

        info!(
            channel_id = %config.chat.channel_id,
            window = %config.window.ordering_hours(),
            "Bot assembled"
        );
        Ok(Bot::new(config, clock, ledger, roster, catalog, sink))
    }
}

/// Creates the Google Sheets store described by `config`.
///
/// # Errors
///
/// Returns [`BuildError`] if the access token is missing or the endpoint is
/// unusable.
pub fn sheets_store(config: &Config) -> Result<GoogleSheetsStore, BuildError> {
    let store = GoogleSheetsStore::new(
        config.sheets.spreadsheet_id.clone(),
        config.sheets.access_token()?,
    );
    Ok(match config.sheets.endpoint.as_deref() {
        Some(endpoint) => store.with_endpoint(endpoint)?,
        None => store,
    })
}

fn discord_sink(config: &Config) -> Result<DiscordSink, BuildError> {
    let sink = DiscordSink::new(config.chat.bot_token()?);
    Ok(match config.chat.api_base_url.as_deref() {
        Some(base_url) => sink.with_base_url(base_url),
        None => sink,
    })
}
