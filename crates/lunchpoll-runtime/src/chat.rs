//! Outbound chat messages: posting, updating and deleting the poll.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::PollMessage;

pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";
const USER_AGENT: &str = "DiscordBot (https://github.com/lunchpoll/lunchpoll, 0.1)";

/// Discord's JSON error code for a message that no longer exists.
const UNKNOWN_MESSAGE_CODE: u64 = 10008;

const RATE_LIMIT_RETRY_AFTER_DEFAULT: u64 = 5;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ChatError {
    /// The referenced message was deleted or never existed.
    #[error("unknown message")]
    UnknownMessage,

    #[error("chat API rate limit exceeded, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("chat API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Where the bot's own messages go.
#[async_trait]
pub trait ChatSink: std::fmt::Debug + Send + Sync {
    /// Posts a poll and returns the new message ID.
    async fn post_poll(&self, channel_id: &str, poll: &PollMessage) -> Result<String, ChatError>;

    async fn update_poll(
        &self,
        channel_id: &str,
        message_id: &str,
        poll: &PollMessage,
    ) -> Result<(), ChatError>;

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError>;
}

/// Discord REST client.
#[derive(Clone)]
pub struct DiscordSink {
    http: reqwest::Client,
    base_url: String,
    bot_token: String,
}

impl std::fmt::Debug for DiscordSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordSink")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    content: &'a str,
    components: &'a [crate::poll::ActionRow],
}

impl<'a> From<&'a PollMessage> for MessageBody<'a> {
    fn from(poll: &'a PollMessage) -> Self {
        Self {
            content: &poll.content,
            components: &poll.components,
        }
    }
}

impl DiscordSink {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
            bot_token: bot_token.into(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim().trim_end_matches('/').to_string();
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bot {}", self.bot_token))
            .header("User-Agent", USER_AGENT)
    }

    async fn handle_response(response: reqwest::Response) -> Result<reqwest::Response, ChatError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let json = serde_json::from_str::<serde_json::Value>(&body).ok();

        if status.as_u16() == 429 {
            let retry_after = json
                .as_ref()
                .and_then(|j| j.get("retry_after"))
                .and_then(serde_json::Value::as_f64)
                .and_then(round_seconds)
                .unwrap_or(RATE_LIMIT_RETRY_AFTER_DEFAULT);
            return Err(ChatError::RateLimited { retry_after });
        }

        let code = json
            .as_ref()
            .and_then(|j| j.get("code"))
            .and_then(serde_json::Value::as_u64);
        if code == Some(UNKNOWN_MESSAGE_CODE) {
            return Err(ChatError::UnknownMessage);
        }

        let message = match (code, json.as_ref().and_then(|j| j.get("message"))) {
            (Some(code), Some(message)) => {
                format!("code {code}: {}", message.as_str().unwrap_or("unknown error"))
            }
            _ => body,
        };
        Err(ChatError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "retry_after is verified to be finite and non-negative before casting"
)]
fn round_seconds(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value.round() as u64)
}

#[async_trait]
impl ChatSink for DiscordSink {
    #[instrument(skip(self, poll))]
    async fn post_poll(&self, channel_id: &str, poll: &PollMessage) -> Result<String, ChatError> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/channels/{channel_id}/messages"),
            )
            .json(&MessageBody::from(poll))
            .send()
            .await?;
        let message: MessageResponse = Self::handle_response(response).await?.json().await?;
        debug!(message_id = %message.id, "Poll posted");
        Ok(message.id)
    }

    #[instrument(skip(self, poll))]
    async fn update_poll(
        &self,
        channel_id: &str,
        message_id: &str,
        poll: &PollMessage,
    ) -> Result<(), ChatError> {
        let response = self
            .request(
                reqwest::Method::PATCH,
                &format!("/channels/{channel_id}/messages/{message_id}"),
            )
            .json(&MessageBody::from(poll))
            .send()
            .await?;
        Self::handle_response(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/channels/{channel_id}/messages/{message_id}"),
            )
            .send()
            .await?;
        Self::handle_response(response).await?;
        Ok(())
    }
}

/// Sink for dry runs: logs what would be sent.
#[derive(Debug, Default)]
pub struct LogSink {
    next_id: AtomicU64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatSink for LogSink {
    async fn post_poll(&self, channel_id: &str, poll: &PollMessage) -> Result<String, ChatError> {
        let id = format!("dry-run-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        info!(
            channel_id,
            message_id = %id,
            buttons = poll.buttons().count(),
            enabled = poll.buttons().all(|b| !b.disabled),
            "Would post poll"
        );
        Ok(id)
    }

    async fn update_poll(
        &self,
        channel_id: &str,
        message_id: &str,
        poll: &PollMessage,
    ) -> Result<(), ChatError> {
        info!(
            channel_id,
            message_id,
            enabled = poll.buttons().all(|b| !b.disabled),
            "Would update poll"
        );
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError> {
        info!(channel_id, message_id, "Would delete message");
        Ok(())
    }
}
