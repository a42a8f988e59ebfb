//! Channels Module
//!
//! Chat platform clients used to post polls and read reactions back.

pub mod discord;
pub mod memory;
pub mod platform;

pub use discord::{DiscordClient, DiscordConfig};
pub use memory::MemoryPlatform;
pub use platform::{
    ChannelError, ChannelId, ChannelResult, DynPlatform, FetchedMessage, GuildId, MessageId,
    ReactionEvent, ReactionKind, ReactionPlatform, UserId,
};
