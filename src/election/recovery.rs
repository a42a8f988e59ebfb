//! Recovery Reader
//!
//! Ballots only live in memory and on the poll message itself. After a restart
//! the vote is rebuilt by reopening it over the persisted candidate list and
//! replaying every reaction still present on the message.

use super::engine::Election;
use super::types::{Candidate, ElectionError, VoteEffect};
use crate::channels::{ChannelError, FetchedMessage, ReactionPlatform, UserId};
use crate::suggestions::PollMarker;
use tracing::{debug, info};

/// Recovery errors. Callers degrade all of them to "no active poll".
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("Poll message {0} could not be found")]
    MessageNotFound(String),

    #[error("Platform error while reading the poll: {0}")]
    Channel(#[from] ChannelError),

    #[error("Could not reopen the vote: {0}")]
    Election(#[from] ElectionError),
}

/// Rebuild the open vote described by `marker`
pub async fn recover(
    platform: &dyn ReactionPlatform,
    guild_id: &str,
    marker: &PollMarker,
    candidates: Vec<Candidate>,
) -> Result<Election, RecoveryError> {
    let message = platform
        .fetch_message(guild_id, Some(&marker.channel_id), &marker.message_id)
        .await?
        .ok_or_else(|| RecoveryError::MessageNotFound(marker.message_id.clone()))?;

    let mut election = Election::new();
    election.open_poll(candidates)?;
    election.bind_message(message.id.clone())?;

    let reactions = reactions_of(platform, &election, &message).await?;
    let bot = platform.bot_user_id();

    let mut replayed = 0usize;
    for (symbol, users) in &reactions {
        for user in users {
            if bot.as_deref() == Some(user.as_str()) {
                continue;
            }
            if election.on_reaction_added(&message.id, user, symbol) != VoteEffect::Ignored {
                replayed += 1;
            }
        }
    }

    info!(
        guild = %guild_id,
        message = %message.id,
        candidates = election.candidates().len(),
        replayed,
        "Recovered open vote"
    );
    Ok(election)
}

/// Users per vote symbol present on `message`, bot included.
/// Symbols that are not part of the vote are skipped.
pub async fn reactions_of(
    platform: &dyn ReactionPlatform,
    election: &Election,
    message: &FetchedMessage,
) -> Result<Vec<(String, Vec<UserId>)>, ChannelError> {
    let mut reactions = Vec::new();
    for symbol in &message.symbols {
        if !election.accepts_symbol(symbol) {
            debug!(message = %message.id, symbol = %symbol, "Skipping foreign reaction");
            continue;
        }
        let users = platform
            .reaction_users(&message.channel_id, &message.id, symbol)
            .await?;
        reactions.push((symbol.clone(), users));
    }
    Ok(reactions)
}
