//! Reaction Platform Trait
//!
//! The slice of a chat platform the vote machinery needs: post a poll message,
//! find it again later, and read who reacted with what.

use async_trait::async_trait;
use std::sync::Arc;

pub type GuildId = String;
pub type ChannelId = String;
pub type MessageId = String;
pub type UserId = String;

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors that can occur in channel operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Rate limited: retry after {0}s")]
    RateLimited(u64),

    #[error("Channel error: {0}")]
    Other(String),
}

/// A message located on the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    /// Reaction symbols present on the message
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Added,
    Removed,
}

/// Inbound reaction event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub guild_id: GuildId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub symbol: String,
    pub kind: ReactionKind,
}

impl ReactionEvent {
    pub fn added(
        guild_id: impl Into<String>,
        message_id: impl Into<String>,
        user_id: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            guild_id: guild_id.into(),
            message_id: message_id.into(),
            user_id: user_id.into(),
            symbol: symbol.into(),
            kind: ReactionKind::Added,
        }
    }

    pub fn removed(
        guild_id: impl Into<String>,
        message_id: impl Into<String>,
        user_id: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            kind: ReactionKind::Removed,
            ..Self::added(guild_id, message_id, user_id, symbol)
        }
    }
}

/// Platform client used by the vote commands and recovery
#[async_trait]
pub trait ReactionPlatform: Send + Sync {
    /// The bot's own user id, once known. Its reactions never count as votes.
    fn bot_user_id(&self) -> Option<UserId>;

    /// Post a poll and place the bot's reaction for every symbol
    async fn post_poll(
        &self,
        channel_id: &str,
        content: &str,
        symbols: &[&str],
    ) -> ChannelResult<MessageId>;

    /// Replace the content of a posted poll
    async fn edit_poll(&self, channel_id: &str, message_id: &str, content: &str)
        -> ChannelResult<()>;

    /// Add the bot's reaction to a message
    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        symbol: &str,
    ) -> ChannelResult<()>;

    /// Find a message in a guild, trying `channel_hint` first.
    /// `Ok(None)` means the message is gone or not reachable.
    async fn fetch_message(
        &self,
        guild_id: &str,
        channel_hint: Option<&str>,
        message_id: &str,
    ) -> ChannelResult<Option<FetchedMessage>>;

    /// Users who reacted to a message with `symbol`
    async fn reaction_users(
        &self,
        channel_id: &str,
        message_id: &str,
        symbol: &str,
    ) -> ChannelResult<Vec<UserId>>;
}

/// Type-erased platform for sharing
pub type DynPlatform = Arc<dyn ReactionPlatform>;
