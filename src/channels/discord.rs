//! Discord Channel Implementation
//!
//! Reaction polls over the Discord REST API (v10): post the poll embed, place
//! the option reactions, and read reactions back for recovery.

use super::platform::{
    ChannelError, ChannelResult, FetchedMessage, MessageId, ReactionPlatform, UserId,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{header::AUTHORIZATION, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Page size of the reaction-users endpoint
const REACTION_PAGE_LIMIT: usize = 100;

/// Attempts per request when Discord answers 429
const MAX_ATTEMPTS: u32 = 3;

/// Embed colour of poll messages
const POLL_COLOR: u32 = 0x2e_cc_71;

/// Text channel types a poll can live in (GUILD_TEXT, GUILD_ANNOUNCEMENT)
const TEXT_CHANNEL_TYPES: [u8; 2] = [0, 5];

/// Discord channel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscordConfig {
    /// Bot token from Discord Developer Portal
    pub bot_token: String,
    /// REST API base URL
    pub api_base_url: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base_url: "https://discord.com/api/v10".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Discord REST client
#[derive(Debug)]
pub struct DiscordClient {
    config: DiscordConfig,
    client: reqwest::Client,
    bot_user_id: RwLock<Option<UserId>>,
}

impl DiscordClient {
    /// Create a new Discord client
    pub fn new(config: DiscordConfig) -> ChannelResult<Self> {
        if config.bot_token.trim().is_empty() {
            return Err(ChannelError::InvalidConfig(
                "discord.botToken is not set".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ChannelError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            config,
            client,
            bot_user_id: RwLock::new(None),
        })
    }

    /// Verify the token and learn the bot's own user id
    pub async fn connect(&self) -> ChannelResult<UserId> {
        info!("Connecting to Discord...");
        let me: DiscordUser = self.api_request(Method::GET, "users/@me", None).await?;
        info!(user = %me.username, id = %me.id, "Discord connected successfully");
        *self.bot_user_id.write() = Some(me.id.clone());
        Ok(me.id)
    }

    /// Send a request, retrying when rate limited
    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
    ) -> ChannelResult<reqwest::Response> {
        let url = format!("{}/{}", self.config.api_base_url.trim_end_matches('/'), endpoint);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = self
                .client
                .request(method.clone(), &url)
                .header(AUTHORIZATION, format!("Bot {}", self.config.bot_token));
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            let retry_after = response
                .json::<RateLimitBody>()
                .await
                .map(|b| b.retry_after)
                .unwrap_or(1.0);
            if attempt >= MAX_ATTEMPTS {
                return Err(ChannelError::RateLimited(retry_after.ceil() as u64));
            }
            warn!(endpoint, retry_after, "Discord rate limit hit, backing off");
            tokio::time::sleep(Duration::from_secs_f64(retry_after.clamp(0.0, 60.0))).await;
        }
    }

    /// Send a request and decode a successful JSON response
    async fn api_request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> ChannelResult<T> {
        let response = self.send(method, endpoint, body.as_ref()).await?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ChannelError::Other(format!("Parse error: {}", e)))
    }

    /// Send a request whose response body does not matter
    async fn api_call(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> ChannelResult<()> {
        let response = self.send(method, endpoint, body.as_ref()).await?;
        check_status(response).await?;
        Ok(())
    }

    async fn guild_text_channels(&self, guild_id: &str) -> ChannelResult<Vec<String>> {
        let channels: Vec<DiscordChannel> = self
            .api_request(Method::GET, &format!("guilds/{}/channels", guild_id), None)
            .await?;
        Ok(channels
            .into_iter()
            .filter(|c| TEXT_CHANNEL_TYPES.contains(&c.kind))
            .map(|c| c.id)
            .collect())
    }

    /// Look a message up in one channel; missing or forbidden is `None`
    async fn get_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> ChannelResult<Option<DiscordMessage>> {
        let endpoint = format!("channels/{}/messages/{}", channel_id, message_id);
        let response = self.send(Method::GET, &endpoint, None).await?;
        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map(Some)
            .map_err(|e| ChannelError::Other(format!("Parse error: {}", e)))
    }
}

async fn check_status(response: reqwest::Response) -> ChannelResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    match status {
        StatusCode::UNAUTHORIZED => Err(ChannelError::AuthenticationFailed(error_text)),
        _ => Err(ChannelError::Other(format!("HTTP {}: {}", status, error_text))),
    }
}

fn poll_body(content: &str) -> serde_json::Value {
    let embed = DiscordEmbed {
        title: Some("Movie Night Vote".to_string()),
        description: Some(content.to_string()),
        color: Some(POLL_COLOR),
        footer: Some(DiscordEmbedFooter {
            text: "React with the option you want to watch. One vote per person!".to_string(),
        }),
    };
    serde_json::json!({ "embeds": [embed] })
}

fn reaction_endpoint(channel_id: &str, message_id: &str, symbol: &str) -> String {
    format!(
        "channels/{}/messages/{}/reactions/{}",
        channel_id,
        message_id,
        urlencoding::encode(symbol)
    )
}

#[async_trait]
impl ReactionPlatform for DiscordClient {
    fn bot_user_id(&self) -> Option<UserId> {
        self.bot_user_id.read().clone()
    }

    async fn post_poll(
        &self,
        channel_id: &str,
        content: &str,
        symbols: &[&str],
    ) -> ChannelResult<MessageId> {
        let message: DiscordMessage = self
            .api_request(
                Method::POST,
                &format!("channels/{}/messages", channel_id),
                Some(poll_body(content)),
            )
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;

        for symbol in symbols {
            self.add_reaction(channel_id, &message.id, symbol).await?;
        }
        debug!(channel = %channel_id, message = %message.id, options = symbols.len(), "Poll posted");
        Ok(message.id)
    }

    async fn edit_poll(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> ChannelResult<()> {
        self.api_call(
            Method::PATCH,
            &format!("channels/{}/messages/{}", channel_id, message_id),
            Some(poll_body(content)),
        )
        .await
    }

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        symbol: &str,
    ) -> ChannelResult<()> {
        let endpoint = format!("{}/@me", reaction_endpoint(channel_id, message_id, symbol));
        self.api_call(Method::PUT, &endpoint, None).await
    }

    async fn fetch_message(
        &self,
        guild_id: &str,
        channel_hint: Option<&str>,
        message_id: &str,
    ) -> ChannelResult<Option<FetchedMessage>> {
        if let Some(hint) = channel_hint {
            match self.get_message(hint, message_id).await {
                Ok(Some(message)) => return Ok(Some(message.into())),
                Ok(None) => {}
                Err(e) => {
                    debug!(channel = %hint, error = %e, "Lookup in stored channel failed");
                }
            }
        }

        for channel_id in self.guild_text_channels(guild_id).await? {
            if Some(channel_id.as_str()) == channel_hint {
                continue;
            }
            match self.get_message(&channel_id, message_id).await {
                Ok(Some(message)) => return Ok(Some(message.into())),
                Ok(None) => continue,
                Err(e) => {
                    debug!(channel = %channel_id, error = %e, "Message lookup failed, trying next channel");
                }
            }
        }
        Ok(None)
    }

    async fn reaction_users(
        &self,
        channel_id: &str,
        message_id: &str,
        symbol: &str,
    ) -> ChannelResult<Vec<UserId>> {
        let base = reaction_endpoint(channel_id, message_id, symbol);
        let mut users = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let mut endpoint = format!("{}?limit={}", base, REACTION_PAGE_LIMIT);
            if let Some(after) = &after {
                endpoint.push_str(&format!("&after={}", after));
            }
            let page: Vec<DiscordUser> = self.api_request(Method::GET, &endpoint, None).await?;
            let full = page.len() == REACTION_PAGE_LIMIT;
            after = page.last().map(|u| u.id.clone());
            users.extend(page.into_iter().map(|u| u.id));
            if !full {
                break;
            }
        }
        Ok(users)
    }
}

// Discord API response types
#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

#[derive(Debug, Deserialize)]
struct DiscordUser {
    id: String,
    #[serde(default)]
    username: String,
}

#[derive(Debug, Deserialize)]
struct DiscordChannel {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
}

#[derive(Debug, Deserialize)]
struct DiscordMessage {
    id: String,
    channel_id: String,
    #[serde(default)]
    reactions: Vec<DiscordReaction>,
}

impl From<DiscordMessage> for FetchedMessage {
    fn from(message: DiscordMessage) -> Self {
        Self {
            symbols: message.reactions.iter().map(|r| r.emoji.symbol()).collect(),
            id: message.id,
            channel_id: message.channel_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DiscordReaction {
    emoji: DiscordEmoji,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DiscordEmoji {
    id: Option<String>,
    name: Option<String>,
}

impl DiscordEmoji {
    /// Symbol as used in reaction endpoints: unicode emoji as-is, custom emoji as `name:id`
    fn symbol(&self) -> String {
        let name = self.name.clone().unwrap_or_default();
        match &self.id {
            Some(id) => format!("{}:{}", name, id),
            None => name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct DiscordEmbed {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<DiscordEmbedFooter>,
}

#[derive(Debug, Clone, Serialize)]
struct DiscordEmbedFooter {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_token() {
        let err = DiscordClient::new(DiscordConfig::default()).unwrap_err();
        assert!(matches!(err, ChannelError::InvalidConfig(_)));

        let client = DiscordClient::new(DiscordConfig {
            bot_token: "token".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.bot_user_id(), None);
    }

    #[test]
    fn test_reaction_endpoint_encodes_emoji() {
        let endpoint = reaction_endpoint("1", "2", "1\u{fe0f}\u{20e3}");
        assert_eq!(
            endpoint,
            "channels/1/messages/2/reactions/1%EF%B8%8F%E2%83%A3"
        );
    }

    #[test]
    fn test_emoji_symbol() {
        let unicode = DiscordEmoji {
            id: None,
            name: Some("\u{1f1e6}".to_string()),
        };
        assert_eq!(unicode.symbol(), "\u{1f1e6}");

        let custom = DiscordEmoji {
            id: Some("42".to_string()),
            name: Some("popcorn".to_string()),
        };
        assert_eq!(custom.symbol(), "popcorn:42");
    }

    #[test]
    fn test_message_deserializes_without_reactions() {
        let message: DiscordMessage =
            serde_json::from_str(r#"{"id":"5","channel_id":"6","content":"hi"}"#).unwrap();
        assert_eq!(message.id, "5");
        assert!(message.reactions.is_empty());
    }

    #[test]
    fn test_message_converts_to_fetched() {
        let message: DiscordMessage = serde_json::from_str(
            r#"{"id":"5","channel_id":"6","reactions":[
                {"count":2,"emoji":{"id":null,"name":"\u0031\ufe0f\u20e3"}},
                {"count":1,"emoji":{"id":"9","name":"popcorn"}}
            ]}"#,
        )
        .unwrap();
        let fetched = FetchedMessage::from(message);
        assert_eq!(fetched.channel_id, "6");
        assert_eq!(
            fetched.symbols,
            vec!["1\u{fe0f}\u{20e3}".to_string(), "popcorn:9".to_string()]
        );
    }

    #[test]
    fn test_poll_body_shape() {
        let body = poll_body("legend");
        assert_eq!(body["embeds"][0]["description"], "legend");
        assert_eq!(body["embeds"][0]["color"], POLL_COLOR);
        assert!(body["embeds"][0].get("image").is_none());
    }
}
