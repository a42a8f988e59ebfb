//! Suggestion store - guild-scoped suggestion lists and vote markers.
//!
//! Everything a guild needs to survive a restart lives here: the ordered list
//! of suggested titles and the marker of the vote message in flight. Ballots
//! are not stored; they are read back from the vote message itself.

use crate::election::Candidate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

/// On-disk format version
const STORE_VERSION: u32 = 1;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write store: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid store format: {0}")]
    InvalidFormat(String),

    #[error("\"{0}\" is already in the list!")]
    Duplicate(String),

    #[error("Maximum number of suggestions ({0}) has already been reached!")]
    LimitReached(usize),

    #[error("{0} isn't a valid index, sorry! Please check the current list.")]
    InvalidIndex(usize),

    #[error("Could not find \"{0}\" in the list!")]
    NotFound(String),
}

/// How a command refers to a suggestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// 1-based position in the list
    Index(usize),
    /// Title, matched case-insensitively
    Title(String),
}

impl Selector {
    /// Numbers are positions, anything else is a title
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input.parse::<usize>() {
            Ok(index) => Selector::Index(index),
            Err(_) => Selector::Title(input.to_string()),
        }
    }
}

/// The vote message in flight for a guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollMarker {
    pub message_id: String,
    pub channel_id: String,
    pub opened_at: DateTime<Utc>,
}

impl PollMarker {
    pub fn new(message_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            channel_id: channel_id.into(),
            opened_at: Utc::now(),
        }
    }
}

/// Persisted state of one guild
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildState {
    #[serde(default)]
    pub suggestions: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_poll: Option<PollMarker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_movie: Option<String>,
}

/// Store data kept on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreData {
    pub version: u32,
    #[serde(default)]
    pub guilds: HashMap<String, GuildState>,
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            guilds: HashMap::new(),
        }
    }
}

/// Suggestion lists for every guild, optionally backed by a JSON file
#[derive(Debug)]
pub struct SuggestionStore {
    data: RwLock<StoreData>,
    path: Option<PathBuf>,
}

fn titles_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn position_of(state: &GuildState, selector: &Selector) -> Result<usize, StoreError> {
    match selector {
        Selector::Index(index) => {
            if *index == 0 || *index > state.suggestions.len() {
                Err(StoreError::InvalidIndex(*index))
            } else {
                Ok(index - 1)
            }
        }
        Selector::Title(title) => state
            .suggestions
            .iter()
            .position(|c| titles_match(&c.title, title))
            .ok_or_else(|| StoreError::NotFound(title.clone())),
    }
}

impl SuggestionStore {
    /// Open (or create) a store file
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let data = if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str(&content).map_err(|e| StoreError::InvalidFormat(e.to_string()))?
        } else {
            StoreData::default()
        };
        debug!(path = %path.display(), guilds = data.guilds.len(), "Suggestion store opened");

        Ok(Self {
            data: RwLock::new(data),
            path: Some(path),
        })
    }

    /// A store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            data: RwLock::new(StoreData::default()),
            path: None,
        }
    }

    async fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(data)?;
        // Write to a sibling temp file and rename so a crash never truncates the store
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read<T>(&self, guild_id: &str, f: impl FnOnce(&GuildState) -> T) -> T {
        let data = self.data.read().await;
        match data.guilds.get(guild_id) {
            Some(state) => f(state),
            None => f(&GuildState::default()),
        }
    }

    async fn update<T>(
        &self,
        guild_id: &str,
        f: impl FnOnce(&mut GuildState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut data = self.data.write().await;
        // Memory only changes once the file does
        let mut next = data.clone();
        let out = f(next.guilds.entry(guild_id.to_string()).or_default())?;
        self.persist(&next).await?;
        *data = next;
        Ok(out)
    }

    /// Suggestions of a guild, in list order
    pub async fn list(&self, guild_id: &str) -> Vec<Candidate> {
        self.read(guild_id, |s| s.suggestions.clone()).await
    }

    /// Append a suggestion, returning the new list length
    pub async fn append(
        &self,
        guild_id: &str,
        candidate: Candidate,
        limit: usize,
    ) -> Result<usize, StoreError> {
        self.update(guild_id, |s| {
            if s.suggestions.len() >= limit {
                return Err(StoreError::LimitReached(limit));
            }
            if s.suggestions
                .iter()
                .any(|c| titles_match(&c.title, &candidate.title))
            {
                return Err(StoreError::Duplicate(candidate.title));
            }
            s.suggestions.push(candidate);
            Ok(s.suggestions.len())
        })
        .await
    }

    /// Remove the suggestion at a 0-based position
    pub async fn remove_at(&self, guild_id: &str, index: usize) -> Result<Candidate, StoreError> {
        self.remove(guild_id, &Selector::Index(index + 1)).await
    }

    /// Remove a suggestion by title
    pub async fn remove_by_title(
        &self,
        guild_id: &str,
        title: &str,
    ) -> Result<Candidate, StoreError> {
        self.remove(guild_id, &Selector::Title(title.to_string()))
            .await
    }

    /// Remove the selected suggestion
    pub async fn remove(&self, guild_id: &str, selector: &Selector) -> Result<Candidate, StoreError> {
        self.update(guild_id, |s| {
            let index = position_of(s, selector)?;
            Ok(s.suggestions.remove(index))
        })
        .await
    }

    /// Record a finished vote in one write: drop the consumed titles (missing
    /// ones are skipped), store the winner as next movie and clear the marker.
    pub async fn finish_vote(
        &self,
        guild_id: &str,
        winner: &str,
        consumed: &[String],
    ) -> Result<Vec<Candidate>, StoreError> {
        self.update(guild_id, |s| {
            let (removed, kept) = std::mem::take(&mut s.suggestions)
                .into_iter()
                .partition(|c| consumed.iter().any(|t| t == &c.title));
            s.suggestions = kept;
            s.next_movie = Some(winner.to_string());
            s.active_poll = None;
            Ok(removed)
        })
        .await
    }

    /// Drop every suggestion, returning how many there were
    pub async fn clear(&self, guild_id: &str) -> Result<usize, StoreError> {
        self.update(guild_id, |s| {
            let count = s.suggestions.len();
            s.suggestions.clear();
            Ok(count)
        })
        .await
    }

    /// Change the genre of a suggestion, returning the updated entry
    pub async fn set_genre(
        &self,
        guild_id: &str,
        selector: &Selector,
        genre: &str,
    ) -> Result<Candidate, StoreError> {
        self.update(guild_id, |s| {
            let index = position_of(s, selector)?;
            s.suggestions[index].genre = genre.to_string();
            Ok(s.suggestions[index].clone())
        })
        .await
    }

    /// Marker of the vote in flight
    pub async fn poll_marker(&self, guild_id: &str) -> Option<PollMarker> {
        self.read(guild_id, |s| s.active_poll.clone()).await
    }

    pub async fn set_poll_marker(
        &self,
        guild_id: &str,
        marker: Option<PollMarker>,
    ) -> Result<(), StoreError> {
        self.update(guild_id, |s| {
            s.active_poll = marker;
            Ok(())
        })
        .await
    }

    /// Title chosen by the last vote
    pub async fn next_movie(&self, guild_id: &str) -> Option<String> {
        self.read(guild_id, |s| s.next_movie.clone()).await
    }
}
