//! Inbound chat events and the replies the bot hands back.
//!
//! Both travel as JSON, one object per line, between the gateway bridge and
//! `lunchpoll serve`.

use lunchpoll_core::Member;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// The gateway connected; carries the full member listing.
    Ready {
        #[serde(default)]
        members: Vec<Member>,
    },
    Message {
        channel_id: String,
        author_id: String,
        #[serde(default)]
        author_is_bot: bool,
        content: String,
    },
    /// A poll button was pressed.
    Button {
        user_id: String,
        display_name: String,
        custom_id: String,
    },
    MemberJoined {
        member: Member,
    },
    MemberLeft {
        user_id: String,
    },
}

/// What the bridge should send back in response to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    None,
    /// Visible only to the user who triggered the event.
    Ephemeral { content: String },
    /// Posted in the channel the event came from.
    Channel { content: String },
}

impl Reply {
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self::Ephemeral {
            content: content.into(),
        }
    }

    pub fn channel(content: impl Into<String>) -> Self {
        Self::Channel {
            content: content.into(),
        }
    }
}
