//! Core rules for the lunchpoll ordering bot.
//!
//! Everything in this crate is a pure function of wall-clock time,
//! configuration, and page contents. Storage and chat adapters live in
//! `lunchpoll-sheets` and `lunchpoll-runtime`.
//!
//! # Key Components
//!
//! - **Window resolution**: [`VotingWindow::resolve_target`] maps an instant to
//!   the dated ledger page a vote belongs to, or rejects it during the daily
//!   blackout
//! - **Ledger reconciliation**: [`upsert_vote`] and [`cancel_vote`] compute the
//!   new row set of a [`LedgerPage`]
//! - **Voting gate**: [`VotingGate`] tracks enable/disable transitions for the
//!   periodic re-evaluation task
//! - **Catalog and roster**: [`MenuCatalog`] and [`Roster`] mirror the menu and
//!   membership pages
//! - **Configuration**: [`Config`] loaded from `lunchpoll.toml`
//!
//! # Example
//!
//! ```
//! use chrono::{NaiveDate, NaiveTime};
//! use lunchpoll_core::{OrderingCalendar, Rejected, VotingWindow};
//!
//! let window = VotingWindow::new(
//!     NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
//!     NaiveTime::from_hms_opt(15, 7, 0).unwrap(),
//! );
//! let calendar = OrderingCalendar::default();
//!
//! // Friday evening rolls forward to Monday.
//! let friday = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
//! let target = window
//!     .resolve_target(friday.and_hms_opt(20, 0, 0).unwrap(), &calendar)
//!     .unwrap();
//! assert_eq!(target.to_string(), "19/10/26");
//!
//! // Mid-day falls inside the blackout.
//! let noon = friday.and_hms_opt(12, 0, 0).unwrap();
//! assert_eq!(window.resolve_target(noon, &calendar), Err(Rejected::WindowClosed));
//! ```

mod calendar;
mod clock;
mod config;
mod gate;
mod ledger;
mod menu;
mod outcome;
mod roster;
mod window;

/// Ledger page keys and the designated ordering days.
pub use calendar::{DateKey, OrderingCalendar};

/// Sources of "now" in deployment-local time.
pub use clock::{Clock, FixedClock, SystemClock};

/// Configuration loaded from `lunchpoll.toml`.
pub use config::{
    CONFIG_FILE_NAME, ChatConfig, ClockConfig, Config, ConfigError, GateConfig, SheetsConfig,
};

/// Timer-driven enable/disable state.
pub use gate::{GateState, VotingGate};

/// Dated vote ledger and its reconciliation rules.
pub use ledger::{
    LEDGER_HEADER, LedgerPage, LedgerRow, PageError, VoteAction, cancel_vote, upsert_vote,
};

/// Menu items offered in the poll.
pub use menu::{MENU_HEADER, MenuCatalog, MenuItem};

/// Typed results handed back to the chat layer.
pub use outcome::{RejectReason, VoteOutcome};

/// Membership roster mirror.
pub use roster::{Member, ROSTER_HEADER, Roster};

/// Daily blackout window and target-page resolution.
pub use window::{Rejected, VotingWindow};

/// A single spreadsheet row as read from or written to a tabular store.
pub type SheetRow = Vec<String>;
