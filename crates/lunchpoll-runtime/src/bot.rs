//! Event dispatch.
//!
//! [`Bot`] owns all application state explicitly: configuration, the clock,
//! the ledger and roster services, the live catalog, the current gate state
//! and the ID of the poll message it last posted. Handlers never fail the
//! caller; collaborator errors become replies and log entries.

use std::sync::{Arc, Mutex, PoisonError};

use lunchpoll_core::{
    Clock, Config, GateState, Member, RejectReason, VoteAction, VoteOutcome,
};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    ButtonAction, CatalogHandle, ChatError, ChatEvent, ChatSink, LedgerService, PollMessage,
    Reply, RosterService,
};

pub const WRONG_CHANNEL_REPLY: &str = "Please give bot commands in the lunch channel.";
pub const EMPTY_MENU_REPLY: &str = "No menu items available.";
pub const MENU_UNAVAILABLE_REPLY: &str = "Could not load the menu. Please try again.";
pub const POLL_FAILED_REPLY: &str = "Could not post the menu. Please try again.";

const MENU_COMMAND: &str = "menu";

#[derive(Debug)]
pub struct Bot {
    config: Config,
    clock: Arc<dyn Clock>,
    ledger: LedgerService,
    roster: RosterService,
    catalog: CatalogHandle,
    sink: Arc<dyn ChatSink>,
    gate: Mutex<GateState>,
    live_poll: AsyncMutex<Option<String>>,
}

impl Bot {
    pub(crate) fn new(
        config: Config,
        clock: Arc<dyn Clock>,
        ledger: LedgerService,
        roster: RosterService,
        catalog: CatalogHandle,
        sink: Arc<dyn ChatSink>,
    ) -> Self {
        let gate = GateState::at(clock.now(), &config.window);
        Self {
            config,
            clock,
            ledger,
            roster,
            catalog,
            sink,
            gate: Mutex::new(gate),
            live_poll: AsyncMutex::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    pub fn gate_state(&self) -> GateState {
        *self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// ID of the poll message currently shown, if any.
    pub async fn live_poll(&self) -> Option<String> {
        self.live_poll.lock().await.clone()
    }

    /// Handles one inbound event.
    pub async fn handle(&self, event: ChatEvent) -> Reply {
        match event {
            ChatEvent::Ready { members } => {
                self.sync_roster(members).await;
                Reply::None
            }
            ChatEvent::Message {
                channel_id,
                author_id,
                author_is_bot,
                content,
            } => {
                self.on_message(&channel_id, &author_id, author_is_bot, &content)
                    .await
            }
            ChatEvent::Button {
                user_id,
                display_name,
                custom_id,
            } => {
                let outcome = self.on_button(&user_id, &display_name, &custom_id).await;
                Reply::ephemeral(outcome.reply_text(&self.config.window))
            }
            ChatEvent::MemberJoined { member } => {
                let user_id = member.user_id.clone();
                if let Err(e) = self.roster.add(member).await {
                    error!(user_id = %user_id, error = %e, "Failed to add member to roster");
                }
                Reply::None
            }
            ChatEvent::MemberLeft { user_id } => {
                if let Err(e) = self.roster.remove(&user_id).await {
                    error!(user_id = %user_id, error = %e, "Failed to remove member from roster");
                }
                Reply::None
            }
        }
    }

    #[instrument(skip(self, members), fields(members = members.len()))]
    async fn sync_roster(&self, members: Vec<Member>) {
        if let Err(e) = self.roster.sync(members).await {
            error!(error = %e, "Roster sync failed");
        }
    }

    #[instrument(skip(self, content))]
    async fn on_message(
        &self,
        channel_id: &str,
        author_id: &str,
        author_is_bot: bool,
        content: &str,
    ) -> Reply {
        if author_is_bot {
            return Reply::None;
        }
        let Some(command) = content.trim().strip_prefix(&self.config.chat.command_prefix) else {
            return Reply::None;
        };
        if channel_id != self.config.chat.channel_id {
            return Reply::channel(WRONG_CHANNEL_REPLY);
        }

        if command.trim().eq_ignore_ascii_case(MENU_COMMAND) {
            self.post_menu().await
        } else {
            debug!(command = %command.trim(), "Ignoring unknown command");
            Reply::None
        }
    }

    #[instrument(skip(self, display_name))]
    async fn on_button(&self, user_id: &str, display_name: &str, custom_id: &str) -> VoteOutcome {
        let now = self.clock.now();
        match ButtonAction::parse(custom_id) {
            ButtonAction::Vote(item_id) => {
                if !self.catalog.current().contains(item_id) {
                    warn!(item_id, "Vote for unknown item");
                    return VoteOutcome::rejected(RejectReason::UnknownItem);
                }
                self.ledger
                    .cast_vote(&VoteAction {
                        user_id: user_id.to_string(),
                        display_name: display_name.to_string(),
                        item_id: item_id.to_string(),
                        occurred_at: now,
                    })
                    .await
            }
            ButtonAction::Cancel => self.ledger.cancel_vote(user_id, now).await,
            ButtonAction::Unknown => {
                warn!("Unrecognized button");
                VoteOutcome::rejected(RejectReason::UnknownItem)
            }
        }
    }

    /// Reloads the menu and replaces the live poll with a fresh one.
    async fn post_menu(&self) -> Reply {
        let catalog = match self.catalog.refresh().await {
            Ok(catalog) => catalog,
            Err(e) => {
                error!(error = %e, "Failed to load menu");
                return Reply::channel(MENU_UNAVAILABLE_REPLY);
            }
        };
        if catalog.is_empty() {
            return Reply::channel(EMPTY_MENU_REPLY);
        }

        let poll = PollMessage::render(&catalog, self.gate_state());
        let channel_id = &self.config.chat.channel_id;
        let mut live = self.live_poll.lock().await;

        if let Some(previous) = live.take() {
            match self.sink.delete_message(channel_id, &previous).await {
                Ok(()) | Err(ChatError::UnknownMessage) => {}
                Err(e) => warn!(message_id = %previous, error = %e, "Failed to delete previous poll"),
            }
        }

        match self.sink.post_poll(channel_id, &poll).await {
            Ok(message_id) => {
                info!(message_id = %message_id, items = catalog.len(), "Poll posted");
                *live = Some(message_id);
                Reply::None
            }
            Err(e) => {
                error!(error = %e, "Failed to post poll");
                Reply::channel(POLL_FAILED_REPLY)
            }
        }
    }

    /// Applies a gate transition to the live poll.
    #[instrument(skip(self))]
    pub async fn on_gate_change(&self, state: GateState) {
        *self.gate.lock().unwrap_or_else(PoisonError::into_inner) = state;

        let mut live = self.live_poll.lock().await;
        let Some(message_id) = live.clone() else {
            return;
        };

        let poll = PollMessage::render(&self.catalog.current(), state);
        match self
            .sink
            .update_poll(&self.config.chat.channel_id, &message_id, &poll)
            .await
        {
            Ok(()) => info!(message_id = %message_id, "Poll buttons updated"),
            Err(ChatError::UnknownMessage) => {
                warn!(message_id = %message_id, "Live poll was deleted");
                *live = None;
            }
            Err(e) => error!(message_id = %message_id, error = %e, "Failed to update poll"),
        }
    }

    /// Forwards gate transitions to [`Self::on_gate_change`] until the gate
    /// task stops.
    pub async fn follow_gate(self: Arc<Self>, mut gate: watch::Receiver<GateState>) {
        while gate.changed().await.is_ok() {
            let state = *gate.borrow_and_update();
            self.on_gate_change(state).await;
        }
        debug!("Gate follower stopped");
    }
}
