//! Election Module
//!
//! Reaction-based single-winner votes: the state machine, the emoji bijection,
//! the ballot tally, recovery from a posted poll, and the per-guild registry.

pub mod emoji;
pub mod engine;
pub mod recovery;
pub mod registry;
pub mod tally;
pub mod types;

pub use emoji::{EmojiMap, MAX_CANDIDATES, PALETTE};
pub use engine::{render_legend, Election};
pub use recovery::{reactions_of, recover, RecoveryError};
pub use registry::{ElectionGuard, ElectionRegistry};
pub use tally::BallotTally;
pub use types::{
    Candidate, CandidateCount, ElectionError, ElectionResult, Resolution, VoteEffect,
    UNKNOWN_GENRE,
};
