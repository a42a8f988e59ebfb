//! In-memory platform
//!
//! Keeps posted messages and their reactions in process. Used for dry runs and
//! tests; behaves like a single guild where every message is reachable.

use super::platform::{
    ChannelError, ChannelResult, FetchedMessage, MessageId, ReactionPlatform, UserId,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct StoredMessage {
    channel_id: String,
    content: String,
    /// symbol -> users, in first-reaction order
    reactions: Vec<(String, Vec<UserId>)>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    messages: BTreeMap<MessageId, StoredMessage>,
    offline: bool,
}

/// Platform double backed by process memory
#[derive(Debug)]
pub struct MemoryPlatform {
    bot_id: UserId,
    state: Mutex<MemoryState>,
}

impl MemoryPlatform {
    pub fn new(bot_id: impl Into<String>) -> Self {
        Self {
            bot_id: bot_id.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// React to a message as `user_id`
    pub fn react(&self, message_id: &str, user_id: &str, symbol: &str) {
        let mut state = self.state.lock();
        if let Some(message) = state.messages.get_mut(message_id) {
            push_reaction(message, user_id, symbol);
        }
    }

    /// Remove a reaction of `user_id`
    pub fn unreact(&self, message_id: &str, user_id: &str, symbol: &str) {
        let mut state = self.state.lock();
        if let Some(message) = state.messages.get_mut(message_id) {
            for (s, users) in message.reactions.iter_mut() {
                if s == symbol {
                    users.retain(|u| u != user_id);
                }
            }
            message.reactions.retain(|(_, users)| !users.is_empty());
        }
    }

    /// Delete a message
    pub fn delete_message(&self, message_id: &str) -> bool {
        self.state.lock().messages.remove(message_id).is_some()
    }

    /// Current content of a message
    pub fn content(&self, message_id: &str) -> Option<String> {
        self.state
            .lock()
            .messages
            .get(message_id)
            .map(|m| m.content.clone())
    }

    /// Users who reacted with `symbol`, bot included
    pub fn reactors(&self, message_id: &str, symbol: &str) -> Vec<UserId> {
        self.state
            .lock()
            .messages
            .get(message_id)
            .and_then(|m| m.reactions.iter().find(|(s, _)| s == symbol))
            .map(|(_, users)| users.clone())
            .unwrap_or_default()
    }

    /// Make every call fail as if the platform were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    fn check_online(&self) -> ChannelResult<()> {
        if self.state.lock().offline {
            return Err(ChannelError::ConnectionFailed(
                "platform offline".to_string(),
            ));
        }
        Ok(())
    }
}

fn push_reaction(message: &mut StoredMessage, user_id: &str, symbol: &str) {
    match message.reactions.iter_mut().find(|(s, _)| s == symbol) {
        Some((_, users)) => {
            if !users.iter().any(|u| u == user_id) {
                users.push(user_id.to_string());
            }
        }
        None => message
            .reactions
            .push((symbol.to_string(), vec![user_id.to_string()])),
    }
}

#[async_trait]
impl ReactionPlatform for MemoryPlatform {
    fn bot_user_id(&self) -> Option<UserId> {
        Some(self.bot_id.clone())
    }

    async fn post_poll(
        &self,
        channel_id: &str,
        content: &str,
        symbols: &[&str],
    ) -> ChannelResult<MessageId> {
        self.check_online()?;
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = format!("{}", 1000 + state.next_id);

        let mut message = StoredMessage {
            channel_id: channel_id.to_string(),
            content: content.to_string(),
            reactions: Vec::new(),
        };
        for symbol in symbols {
            push_reaction(&mut message, &self.bot_id, symbol);
        }
        state.messages.insert(id.clone(), message);
        Ok(id)
    }

    async fn edit_poll(
        &self,
        _channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> ChannelResult<()> {
        self.check_online()?;
        let mut state = self.state.lock();
        let message = state
            .messages
            .get_mut(message_id)
            .ok_or_else(|| ChannelError::SendFailed(format!("unknown message {}", message_id)))?;
        message.content = content.to_string();
        Ok(())
    }

    async fn add_reaction(
        &self,
        _channel_id: &str,
        message_id: &str,
        symbol: &str,
    ) -> ChannelResult<()> {
        self.check_online()?;
        self.react(message_id, &self.bot_id, symbol);
        Ok(())
    }

    async fn fetch_message(
        &self,
        _guild_id: &str,
        _channel_hint: Option<&str>,
        message_id: &str,
    ) -> ChannelResult<Option<FetchedMessage>> {
        self.check_online()?;
        let state = self.state.lock();
        Ok(state.messages.get(message_id).map(|m| FetchedMessage {
            id: message_id.to_string(),
            channel_id: m.channel_id.clone(),
            symbols: m.reactions.iter().map(|(s, _)| s.clone()).collect(),
        }))
    }

    async fn reaction_users(
        &self,
        _channel_id: &str,
        message_id: &str,
        symbol: &str,
    ) -> ChannelResult<Vec<UserId>> {
        self.check_online()?;
        Ok(self.reactors(message_id, symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_post_places_bot_reactions() {
        let platform = MemoryPlatform::new("bot");
        let id = platform.post_poll("chan", "legend", &["a", "b"]).await.unwrap();

        let fetched = platform.fetch_message("guild", None, &id).await.unwrap().unwrap();
        assert_eq!(fetched.channel_id, "chan");
        assert_eq!(fetched.symbols, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(platform.reactors(&id, "a"), vec!["bot".to_string()]);
    }

    #[tokio::test]
    async fn test_react_and_unreact() {
        let platform = MemoryPlatform::new("bot");
        let id = platform.post_poll("chan", "legend", &[]).await.unwrap();

        platform.react(&id, "u1", "x");
        platform.react(&id, "u1", "x");
        assert_eq!(platform.reactors(&id, "x"), vec!["u1".to_string()]);

        platform.unreact(&id, "u1", "x");
        let fetched = platform.fetch_message("guild", None, &id).await.unwrap().unwrap();
        assert!(fetched.symbols.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_and_offline() {
        let platform = MemoryPlatform::new("bot");
        let id = platform.post_poll("chan", "legend", &[]).await.unwrap();
        assert!(platform.delete_message(&id));
        assert!(platform.fetch_message("guild", None, &id).await.unwrap().is_none());

        platform.set_offline(true);
        assert!(matches!(
            platform.post_poll("chan", "legend", &[]).await,
            Err(ChannelError::ConnectionFailed(_))
        ));
    }
}
