//! Runtime services for lunchpoll.
//!
//! This crate wires the pure rules of `lunchpoll-core` to a tabular store and
//! a chat platform.
//!
//! # Key Components
//!
//! - **Ledger service**: [`LedgerService`] serializes read-modify-write
//!   cycles per dated page
//! - **Roster service**: [`RosterService`] mirrors membership events
//! - **Voting gate**: [`spawn_gate`] re-evaluates the blackout window on a
//!   timer and publishes transitions through a `watch` channel
//! - **Dispatch**: [`Bot`] turns [`ChatEvent`]s into [`Reply`]s, assembled by
//!   [`BotBuilder`]

mod bot;
mod builder;
mod catalog;
mod chat;
mod events;
mod gate;
mod ledger;
mod locks;
mod poll;
mod roster;

pub use bot::{Bot, EMPTY_MENU_REPLY, MENU_UNAVAILABLE_REPLY, POLL_FAILED_REPLY, WRONG_CHANNEL_REPLY};
pub use builder::{BotBuilder, BuildError, sheets_store};
pub use catalog::CatalogHandle;
pub use chat::{ChatError, ChatSink, DEFAULT_API_BASE_URL, DiscordSink, LogSink};
pub use events::{ChatEvent, Reply};
pub use gate::spawn_gate;
pub use ledger::{LedgerError, LedgerService};
pub use locks::{PageGuard, PageLocks};
pub use poll::{
    ActionRow, Button, ButtonAction, ButtonStyle, CANCEL_ID, POLL_CONTENT, PollMessage,
    VOTE_PREFIX,
};
pub use roster::RosterService;
