//! Configuration loaded from `lunchpoll.toml`.
//!
//! # Resolution Algorithm
//!
//! [`Config::resolve`] looks for the file in this order:
//!
//! 1. `LUNCHPOLL_CONFIG_PATH` environment variable
//! 2. Current directory
//! 3. Parent directories (walk up to filesystem root)
//! 4. XDG config directory (`~/.config/lunchpoll/lunchpoll.toml`)
//!
//! Secrets are not stored in the file. The `[sheets]` and `[chat]` sections
//! name the environment variables that hold the access tokens.
//!
//! # Example
//!
//! ```toml
//! [window]
//! start = "09:00:00"
//! end = "15:07:00"
//!
//! [calendar]
//! ordering_days = ["mon", "tue", "wed", "thu", "fri"]
//! closed_dates = ["2026-12-25"]
//!
//! [sheets]
//! spreadsheet_id = "1AbC..."
//!
//! [chat]
//! channel_id = "123456789012345678"
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::{OrderingCalendar, SystemClock, VotingWindow};

/// File name searched for during resolution.
pub const CONFIG_FILE_NAME: &str = "lunchpoll.toml";

const CONFIG_PATH_ENV: &str = "LUNCHPOLL_CONFIG_PATH";

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// I/O error when reading a config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error when a config file is malformed.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file not found.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A value is present but unusable.
    #[error("invalid config: {0}")]
    Invalid(String),

    /// The environment variable naming a secret is unset or empty.
    #[error("environment variable {0} is not set")]
    MissingSecret(String),
}

/// Project configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Daily blackout window.
    #[serde(default)]
    pub window: VotingWindow,

    /// Designated ordering days.
    #[serde(default)]
    pub calendar: OrderingCalendar,

    /// Periodic gate re-evaluation.
    #[serde(default)]
    pub gate: GateConfig,

    /// Time zone handling.
    #[serde(default)]
    pub clock: ClockConfig,

    /// Spreadsheet backing store.
    pub sheets: SheetsConfig,

    /// Chat platform.
    pub chat: ChatConfig,
}

/// Settings for the timer that enables and disables vote buttons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Seconds between re-evaluations.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl GateConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_interval_secs() -> u64 {
    60
}

/// How "now" is computed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Fixed UTC offset such as `"+05:30"`. The host zone is used when unset.
    pub utc_offset: Option<String>,
}

impl ClockConfig {
    /// Parses the configured offset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the offset cannot be parsed.
    pub fn offset(&self) -> Result<Option<FixedOffset>, ConfigError> {
        self.utc_offset
            .as_deref()
            .map(|raw| {
                raw.trim()
                    .parse::<FixedOffset>()
                    .map_err(|e| ConfigError::Invalid(format!("clock.utc_offset {raw:?}: {e}")))
            })
            .transpose()
    }

    /// Builds the system clock described by this section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the offset cannot be parsed.
    pub fn system_clock(&self) -> Result<SystemClock, ConfigError> {
        Ok(self
            .offset()?
            .map_or_else(SystemClock::local, SystemClock::with_offset))
    }
}

/// Google Sheets store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// The spreadsheet holding menu, roster and ledger pages.
    pub spreadsheet_id: String,

    /// API base URL override (tests, proxies).
    pub endpoint: Option<String>,

    /// Environment variable holding the OAuth access token.
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    /// Page listing menu items.
    #[serde(default = "default_menu_page")]
    pub menu_page: String,

    /// Page mirroring community membership.
    #[serde(default = "default_roster_page")]
    pub roster_page: String,
}

impl SheetsConfig {
    /// Reads the access token from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSecret`] if the variable is unset or
    /// blank.
    pub fn access_token(&self) -> Result<String, ConfigError> {
        read_secret(&self.access_token_env, |var| std::env::var(var).ok())
    }
}

fn default_access_token_env() -> String {
    "GOOGLE_SHEETS_ACCESS_TOKEN".to_string()
}

fn default_menu_page() -> String {
    "Sheet1".to_string()
}

fn default_roster_page() -> String {
    "Members List".to_string()
}

/// Chat platform settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// The lunch channel; commands elsewhere are refused.
    pub channel_id: String,

    /// API base URL override.
    pub api_base_url: Option<String>,

    /// Environment variable holding the bot token.
    #[serde(default = "default_bot_token_env")]
    pub bot_token_env: String,

    /// Prefix marking a message as a bot command.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

impl ChatConfig {
    /// Reads the bot token from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSecret`] if the variable is unset or
    /// blank.
    pub fn bot_token(&self) -> Result<String, ConfigError> {
        read_secret(&self.bot_token_env, |var| std::env::var(var).ok())
    }
}

fn default_bot_token_env() -> String {
    "DISCORD_BOT_TOKEN".to_string()
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn read_secret(var: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
    lookup(var)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::MissingSecret(var.to_string()))
}

impl Config {
    /// Loads, parses and validates the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if:
    /// - The file cannot be read (returns `NotFound` variant)
    /// - The file cannot be parsed as TOML
    /// - Validation fails
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|_e| ConfigError::NotFound(path.to_path_buf()))?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates config from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` on parse or validation failure.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Finds and loads the config file using the resolution algorithm.
    ///
    /// Returns the path it was loaded from, or `None` if no file exists.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a file was found but could not be read,
    /// parsed or validated.
    pub fn resolve() -> Result<Option<(PathBuf, Self)>, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from)
            && path.exists()
        {
            let config = Self::load(&path)?;
            return Ok(Some((path, config)));
        }

        let current = std::env::current_dir()?;
        if let Some(found) = Self::resolve_from(&current)? {
            return Ok(Some(found));
        }

        if let Some(path) = dirs::config_dir().map(|dir| dir.join("lunchpoll").join(CONFIG_FILE_NAME))
            && path.exists()
        {
            let config = Self::load(&path)?;
            return Ok(Some((path, config)));
        }

        Ok(None)
    }

    /// Looks for the config file in `dir` and each of its ancestors.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a file was found but is invalid.
    pub fn resolve_from(dir: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        for candidate in dir.ancestors().map(|d| d.join(CONFIG_FILE_NAME)) {
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                return Ok(Some((candidate, config)));
            }
        }
        Ok(None)
    }

    /// Checks invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.start >= self.window.end {
            return Err(ConfigError::Invalid(format!(
                "window.start ({}) must be earlier than window.end ({})",
                self.window.start, self.window.end
            )));
        }
        if self.calendar.ordering_days.is_empty() {
            return Err(ConfigError::Invalid(
                "calendar.ordering_days must name at least one weekday".to_string(),
            ));
        }
        if self.gate.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "gate.interval_secs must be positive".to_string(),
            ));
        }
        self.clock.offset()?;

        for (field, value) in [
            ("sheets.spreadsheet_id", &self.sheets.spreadsheet_id),
            ("sheets.menu_page", &self.sheets.menu_page),
            ("sheets.roster_page", &self.sheets.roster_page),
            ("chat.channel_id", &self.chat.channel_id),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}
