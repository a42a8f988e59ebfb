//! Election types
//!
//! Candidates, outcomes, and the error taxonomy shared by the election engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Genre used when nobody has told us what a title is.
pub const UNKNOWN_GENRE: &str = "Unknown";

/// A nominated title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Display title, also the candidate's identity within a poll
    pub title: String,
    /// Genre label
    #[serde(default = "default_genre")]
    pub genre: String,
}

fn default_genre() -> String {
    UNKNOWN_GENRE.to_string()
}

impl Candidate {
    /// Create a candidate with an unknown genre
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            genre: default_genre(),
        }
    }

    /// Set genre
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    /// Whether the genre is known
    pub fn has_genre(&self) -> bool {
        !self.genre.trim().is_empty() && self.genre != UNKNOWN_GENRE
    }
}

/// Valid ballot count for one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateCount {
    pub title: String,
    pub symbol: String,
    pub votes: usize,
}

/// Outcome of a successfully resolved poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Winning title
    pub winner: String,
    /// Titles that received at least one conflicted ballot
    pub bad_votes: Vec<String>,
    /// Final counts in candidate order
    pub counts: Vec<CandidateCount>,
}

/// What a reaction event did to the tally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteEffect {
    /// Off-target event: no poll, other message, or unknown symbol
    Ignored,
    /// New ballot stored
    Recorded,
    /// Same ballot seen again
    Duplicate,
    /// Voter now holds ballots for more than one candidate
    Conflicted,
    /// Ballot removed
    Withdrawn,
}

/// Election errors. All of them are reported verbatim to whoever issued the command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElectionError {
    #[error("Cannot run a vote with no suggestions.")]
    EmptyCandidateList,

    #[error("Too many suggestions for one vote ({count}, maximum is {max}).")]
    TooManyCandidates { count: usize, max: usize },

    #[error("The vote is full, no more than {max} options can be voted on.")]
    CapacityExceeded { max: usize },

    #[error("\"{0}\" appears more than once in the vote.")]
    DuplicateCandidate(String),

    #[error("There is no vote in progress.")]
    NoActivePoll,

    #[error("A vote is already in progress.")]
    AlreadyOpen,

    #[error("The vote is tied between: {}. Let voting continue and try again.", .0.join(", "))]
    Tie(Vec<String>),
}

/// Result type for election operations
pub type ElectionResult<T> = Result<T, ElectionError>;
