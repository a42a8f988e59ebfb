//! Election State Machine
//!
//! Owns the candidate snapshot, emoji bijection, and ballot tally for one
//! community. Performs no I/O: callers post the returned legend and feed back
//! the message id and reaction events.

use super::emoji::{EmojiMap, MAX_CANDIDATES};
use super::tally::BallotTally;
use super::types::{
    Candidate, CandidateCount, ElectionError, ElectionResult, Resolution, VoteEffect,
};
use std::collections::HashSet;

/// Poll state while a vote is open
#[derive(Debug, Clone)]
struct OpenPoll {
    candidates: Vec<Candidate>,
    emojis: EmojiMap,
    message_id: Option<String>,
    tally: BallotTally,
}

impl OpenPoll {
    fn position_of(&self, title: &str) -> Option<usize> {
        self.candidates.iter().position(|c| c.title == title)
    }

    fn counts(&self) -> Vec<CandidateCount> {
        let votes = self.tally.counts_by_candidate(self.candidates.len());
        self.candidates
            .iter()
            .zip(votes)
            .enumerate()
            .map(|(i, (candidate, votes))| CandidateCount {
                title: candidate.title.clone(),
                symbol: self.emojis.symbol_of(i).unwrap_or_default().to_string(),
                votes,
            })
            .collect()
    }

    fn legend(&self) -> String {
        render_legend(&self.candidates, &self.emojis)
    }
}

/// Vote state machine for one community: INACTIVE (no poll) or OPEN
#[derive(Debug, Clone, Default)]
pub struct Election {
    poll: Option<OpenPoll>,
}

impl Election {
    /// Create an inactive election
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a vote is in progress
    pub fn is_open(&self) -> bool {
        self.poll.is_some()
    }

    /// Open a vote over `candidates`, returning the legend to post
    pub fn open_poll(&mut self, candidates: Vec<Candidate>) -> ElectionResult<String> {
        if candidates.is_empty() {
            return Err(ElectionError::EmptyCandidateList);
        }
        if candidates.len() > MAX_CANDIDATES {
            return Err(ElectionError::TooManyCandidates {
                count: candidates.len(),
                max: MAX_CANDIDATES,
            });
        }
        let mut seen = HashSet::new();
        for candidate in &candidates {
            if !seen.insert(candidate.title.as_str()) {
                return Err(ElectionError::DuplicateCandidate(candidate.title.clone()));
            }
        }
        if self.is_open() {
            return Err(ElectionError::AlreadyOpen);
        }

        let emojis = EmojiMap::allocate(candidates.len())?;
        let poll = OpenPoll {
            candidates,
            emojis,
            message_id: None,
            tally: BallotTally::new(),
        };
        let legend = poll.legend();
        self.poll = Some(poll);
        Ok(legend)
    }

    /// Bind the posted poll message
    pub fn bind_message(&mut self, message_id: impl Into<String>) -> ElectionResult<()> {
        let poll = self.poll.as_mut().ok_or(ElectionError::NoActivePoll)?;
        poll.message_id = Some(message_id.into());
        Ok(())
    }

    /// Id of the bound poll message
    pub fn message_id(&self) -> Option<&str> {
        self.poll.as_ref()?.message_id.as_deref()
    }

    /// Whether `message_id` is the bound poll message of an open vote
    pub fn is_poll_message(&self, message_id: &str) -> bool {
        self.message_id() == Some(message_id)
    }

    /// Apply a reaction-add event
    pub fn on_reaction_added(&mut self, message_id: &str, voter: &str, symbol: &str) -> VoteEffect {
        match self.target(message_id, symbol) {
            Some((poll, candidate)) => poll.tally.record_vote(voter, candidate),
            None => VoteEffect::Ignored,
        }
    }

    /// Apply a reaction-remove event
    pub fn on_reaction_removed(
        &mut self,
        message_id: &str,
        voter: &str,
        symbol: &str,
    ) -> VoteEffect {
        match self.target(message_id, symbol) {
            Some((poll, candidate)) => poll.tally.withdraw_vote(voter, candidate),
            None => VoteEffect::Ignored,
        }
    }

    fn target(&mut self, message_id: &str, symbol: &str) -> Option<(&mut OpenPoll, usize)> {
        let poll = self.poll.as_mut()?;
        if poll.message_id.as_deref() != Some(message_id) {
            return None;
        }
        let candidate = poll.emojis.candidate_of(symbol)?;
        Some((poll, candidate))
    }

    /// Valid ballots per candidate, in candidate order
    pub fn counts_by_candidate(&self) -> ElectionResult<Vec<CandidateCount>> {
        let poll = self.poll.as_ref().ok_or(ElectionError::NoActivePoll)?;
        Ok(poll.counts())
    }

    /// Resolution the open vote would reach now, without closing it
    pub fn outcome(&self) -> ElectionResult<Resolution> {
        let poll = self.poll.as_ref().ok_or(ElectionError::NoActivePoll)?;
        let counts = poll.counts();

        let top = counts.iter().map(|c| c.votes).max().unwrap_or(0);
        let leaders: Vec<usize> = if top == 0 {
            (0..counts.len()).collect()
        } else {
            (0..counts.len()).filter(|&i| counts[i].votes == top).collect()
        };
        let winner = match leaders.as_slice() {
            [single] => *single,
            tied => {
                return Err(ElectionError::Tie(
                    tied.iter().map(|&i| counts[i].title.clone()).collect(),
                ))
            }
        };

        let bad_votes = poll
            .tally
            .bad_votes()
            .into_iter()
            .map(|i| poll.candidates[i].title.clone())
            .collect();
        Ok(Resolution {
            winner: counts[winner].title.clone(),
            bad_votes,
            counts,
        })
    }

    /// Pick the winner and close the vote. A tie leaves the vote open.
    pub fn resolve(&mut self) -> ElectionResult<Resolution> {
        let resolution = self.outcome()?;
        self.poll = None;
        Ok(resolution)
    }

    /// Discard the vote without a winner
    pub fn abort(&mut self) -> ElectionResult<()> {
        self.poll.take().ok_or(ElectionError::NoActivePoll)?;
        Ok(())
    }

    /// Add a candidate to the open vote, returning its symbol
    pub fn add_candidate(&mut self, candidate: Candidate) -> ElectionResult<&'static str> {
        let poll = self.poll.as_mut().ok_or(ElectionError::NoActivePoll)?;
        if poll.position_of(&candidate.title).is_some() {
            return Err(ElectionError::DuplicateCandidate(candidate.title));
        }
        let symbol = poll.emojis.extend()?;
        poll.candidates.push(candidate);
        Ok(symbol)
    }

    /// Update the genre of a candidate in the open vote. Returns false when
    /// there is no vote or the title is not part of it.
    pub fn set_genre(&mut self, title: &str, genre: &str) -> bool {
        let Some(poll) = self.poll.as_mut() else {
            return false;
        };
        match poll.position_of(title) {
            Some(i) => {
                poll.candidates[i].genre = genre.to_string();
                true
            }
            None => false,
        }
    }

    /// Candidates of the open vote
    pub fn candidates(&self) -> &[Candidate] {
        self.poll
            .as_ref()
            .map(|p| p.candidates.as_slice())
            .unwrap_or_default()
    }

    /// Symbols of the open vote, in candidate order
    pub fn symbols(&self) -> &'static [&'static str] {
        self.poll
            .as_ref()
            .map(|p| p.emojis.symbols())
            .unwrap_or_default()
    }

    /// Whether `symbol` is bound to a candidate of the open vote
    pub fn accepts_symbol(&self, symbol: &str) -> bool {
        self.poll
            .as_ref()
            .is_some_and(|p| p.emojis.candidate_of(symbol).is_some())
    }

    /// Legend of the open vote
    pub fn legend(&self) -> Option<String> {
        self.poll.as_ref().map(|p| p.legend())
    }
}

/// Render the candidate-to-symbol legend, one line per candidate.
///
/// This text is what gets posted, so its shape must not depend on anything but
/// the candidate list.
pub fn render_legend(candidates: &[Candidate], emojis: &EmojiMap) -> String {
    candidates
        .iter()
        .enumerate()
        .filter_map(|(i, candidate)| {
            let symbol = emojis.symbol_of(i)?;
            Some(if candidate.has_genre() {
                format!("{} {} ({})", symbol, candidate.title, candidate.genre)
            } else {
                format!("{} {}", symbol, candidate.title)
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}
