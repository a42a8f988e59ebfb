//! Movie night commands
//!
//! The operations users trigger: managing the suggestion list and running the
//! vote. Each call locks the guild's election for its whole duration, so a vote
//! can't start while a suggestion is being removed.

use crate::channels::{ChannelError, DynPlatform, ReactionEvent, ReactionKind};
use crate::election::{
    Candidate, CandidateCount, ElectionError, ElectionRegistry, Resolution, VoteEffect,
};
use crate::suggestions::{PollMarker, Selector, StoreError, SuggestionStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Command errors, rendered verbatim to whoever issued the command
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Election(#[from] ElectionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Could not reach the chat platform: {0}")]
    Channel(#[from] ChannelError),

    #[error("Cannot {0} while a vote is in progress!")]
    VoteInProgress(&'static str),

    #[error("A movie title is required.")]
    EmptyTitle,
}

pub type CommandResult<T> = Result<T, CommandError>;

/// A suggestion that made it into the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggested {
    pub candidate: Candidate,
    /// 1-based position in the list
    pub position: usize,
    /// Symbol assigned when the title joined a vote already running
    pub live_symbol: Option<&'static str>,
}

/// A freshly posted vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteStarted {
    pub message_id: String,
    pub legend: String,
}

/// Movie night service for every guild the bot is in
pub struct MovieNight {
    registry: ElectionRegistry,
    max_suggestions: usize,
}

impl MovieNight {
    pub fn new(platform: DynPlatform, store: Arc<SuggestionStore>, max_suggestions: usize) -> Self {
        Self {
            registry: ElectionRegistry::new(platform, store),
            max_suggestions,
        }
    }

    fn store(&self) -> &SuggestionStore {
        self.registry.store()
    }

    fn platform(&self) -> &DynPlatform {
        self.registry.platform()
    }

    /// Add a title to the suggestion list, and to the running vote if there is one
    pub async fn suggest(
        &self,
        guild_id: &str,
        title: &str,
        genre: Option<&str>,
    ) -> CommandResult<Suggested> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CommandError::EmptyTitle);
        }
        let mut candidate = Candidate::new(title);
        if let Some(genre) = genre.map(str::trim).filter(|g| !g.is_empty()) {
            candidate = candidate.with_genre(genre);
        }

        let mut election = self.registry.get_or_create(guild_id).await;
        let position = self
            .store()
            .append(guild_id, candidate.clone(), self.max_suggestions)
            .await?;

        let mut live_symbol = None;
        if election.is_open() {
            match election.add_candidate(candidate.clone()) {
                Ok(symbol) => live_symbol = Some(symbol),
                Err(e) => {
                    // Keep the list in step with the vote so recovery maps symbols correctly
                    self.store().remove_by_title(guild_id, title).await?;
                    return Err(e.into());
                }
            }
            if let (Some(legend), Some(message_id)) = (election.legend(), election.message_id()) {
                // The title is already in the list and the vote; a stale message is not fatal
                if let Err(e) = self
                    .refresh_poll(guild_id, message_id, &legend, live_symbol)
                    .await
                {
                    warn!(guild = %guild_id, title = %title, error = %e, "Suggestion joined the vote but the poll message was not updated");
                }
            }
        }

        info!(guild = %guild_id, title = %title, position, live = live_symbol.is_some(), "Suggestion added");
        Ok(Suggested {
            candidate,
            position,
            live_symbol,
        })
    }

    /// Remove a suggestion by 1-based index or title
    pub async fn unsuggest(&self, guild_id: &str, selector: &Selector) -> CommandResult<Candidate> {
        let election = self.registry.get_or_create(guild_id).await;
        if election.is_open() {
            return Err(CommandError::VoteInProgress("remove suggestions"));
        }
        let removed = self.store().remove(guild_id, selector).await?;
        info!(guild = %guild_id, title = %removed.title, "Suggestion removed");
        Ok(removed)
    }

    /// Current suggestion list
    pub async fn suggestions(&self, guild_id: &str) -> Vec<Candidate> {
        self.store().list(guild_id).await
    }

    /// Winner of the last vote
    pub async fn next_movie(&self, guild_id: &str) -> Option<String> {
        self.store().next_movie(guild_id).await
    }

    /// Change the genre of a suggestion, refreshing the running vote's legend
    pub async fn set_genre(
        &self,
        guild_id: &str,
        selector: &Selector,
        genre: &str,
    ) -> CommandResult<Candidate> {
        let mut election = self.registry.get_or_create(guild_id).await;
        let updated = self.store().set_genre(guild_id, selector, genre.trim()).await?;

        if election.set_genre(&updated.title, &updated.genre) {
            if let (Some(legend), Some(message_id)) = (election.legend(), election.message_id()) {
                if let Err(e) = self.refresh_poll(guild_id, message_id, &legend, None).await {
                    warn!(guild = %guild_id, title = %updated.title, error = %e, "Genre changed but the poll message was not updated");
                }
            }
        }
        Ok(updated)
    }

    /// Drop every suggestion, returning how many were removed
    pub async fn clear_suggestions(&self, guild_id: &str) -> CommandResult<usize> {
        let election = self.registry.get_or_create(guild_id).await;
        if election.is_open() {
            return Err(CommandError::VoteInProgress("clear suggestions"));
        }
        let count = self.store().clear(guild_id).await?;
        info!(guild = %guild_id, count, "Suggestions cleared");
        Ok(count)
    }

    /// Open a vote over the suggestion list and post it to `channel_id`
    pub async fn start_vote(&self, guild_id: &str, channel_id: &str) -> CommandResult<VoteStarted> {
        let mut election = self.registry.get_or_create(guild_id).await;
        let suggestions = self.store().list(guild_id).await;
        let legend = election.open_poll(suggestions)?;

        let symbols = election.symbols();
        let message_id = match self.platform().post_poll(channel_id, &legend, symbols).await {
            Ok(id) => id,
            Err(e) => {
                election.abort()?;
                return Err(e.into());
            }
        };
        election.bind_message(message_id.clone())?;

        let marker = PollMarker::new(message_id.clone(), channel_id);
        if let Err(e) = self.store().set_poll_marker(guild_id, Some(marker)).await {
            election.abort()?;
            return Err(e.into());
        }

        info!(guild = %guild_id, channel = %channel_id, message = %message_id, candidates = symbols.len(), "Vote started");
        Ok(VoteStarted { message_id, legend })
    }

    /// Close the vote and consume the winner and bad votes.
    /// A tie, or a failed store write, leaves the vote running.
    pub async fn stop_vote(&self, guild_id: &str) -> CommandResult<Resolution> {
        let mut election = self.registry.get_or_create(guild_id).await;
        let outcome = election.outcome()?;

        let mut consumed = vec![outcome.winner.clone()];
        consumed.extend(outcome.bad_votes.iter().cloned());
        self.store()
            .finish_vote(guild_id, &outcome.winner, &consumed)
            .await?;
        let resolution = election.resolve()?;

        info!(
            guild = %guild_id,
            winner = %resolution.winner,
            bad_votes = resolution.bad_votes.len(),
            "Vote closed"
        );
        Ok(resolution)
    }

    /// Abandon the vote without a winner
    pub async fn cancel_vote(&self, guild_id: &str) -> CommandResult<()> {
        let mut election = self.registry.get_or_create(guild_id).await;
        if !election.is_open() {
            return Err(ElectionError::NoActivePoll.into());
        }
        self.store().set_poll_marker(guild_id, None).await?;
        election.abort()?;
        info!(guild = %guild_id, "Vote cancelled");
        Ok(())
    }

    /// Valid ballots per candidate of the running vote
    pub async fn vote_status(&self, guild_id: &str) -> CommandResult<Vec<CandidateCount>> {
        let election = self.registry.get_or_create(guild_id).await;
        Ok(election.counts_by_candidate()?)
    }

    /// Feed a reaction event into the guild's vote
    pub async fn handle_reaction(&self, event: &ReactionEvent) -> VoteEffect {
        if self.platform().bot_user_id().as_deref() == Some(event.user_id.as_str()) {
            return VoteEffect::Ignored;
        }

        let mut election = self.registry.get_or_create(&event.guild_id).await;
        let effect = match event.kind {
            ReactionKind::Added => {
                election.on_reaction_added(&event.message_id, &event.user_id, &event.symbol)
            }
            ReactionKind::Removed => {
                election.on_reaction_removed(&event.message_id, &event.user_id, &event.symbol)
            }
        };
        if effect == VoteEffect::Conflicted {
            warn!(guild = %event.guild_id, user = %event.user_id, "Voter picked more than one option");
        } else {
            debug!(guild = %event.guild_id, user = %event.user_id, ?effect, "Reaction handled");
        }
        effect
    }

    async fn refresh_poll(
        &self,
        guild_id: &str,
        message_id: &str,
        legend: &str,
        new_symbol: Option<&str>,
    ) -> CommandResult<()> {
        let Some(marker) = self.store().poll_marker(guild_id).await else {
            warn!(guild = %guild_id, "Open vote has no stored marker, poll message not updated");
            return Ok(());
        };
        self.platform()
            .edit_poll(&marker.channel_id, message_id, legend)
            .await?;
        if let Some(symbol) = new_symbol {
            self.platform()
                .add_reaction(&marker.channel_id, message_id, symbol)
                .await?;
        }
        Ok(())
    }
}
