//! Ballot Tally
//!
//! One ballot per voter, fed by unordered add/remove events. Candidates are
//! referred to by their position in the poll.

use super::types::VoteEffect;
use std::collections::{BTreeSet, HashMap};

/// Ballots for one open poll
#[derive(Debug, Clone, Default)]
pub struct BallotTally {
    /// voter -> candidate index of their active ballot
    ballots: HashMap<String, usize>,
    /// voter -> every candidate they touched once conflicted (sticky)
    conflicted: HashMap<String, BTreeSet<usize>>,
}

impl BallotTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a ballot for `candidate`
    pub fn record_vote(&mut self, voter: &str, candidate: usize) -> VoteEffect {
        if let Some(touched) = self.conflicted.get_mut(voter) {
            touched.insert(candidate);
            return VoteEffect::Conflicted;
        }

        match self.ballots.get(voter).copied() {
            None => {
                self.ballots.insert(voter.to_string(), candidate);
                VoteEffect::Recorded
            }
            Some(current) if current == candidate => VoteEffect::Duplicate,
            Some(current) => {
                self.conflicted
                    .insert(voter.to_string(), BTreeSet::from([current, candidate]));
                VoteEffect::Conflicted
            }
        }
    }

    /// Withdraw the voter's ballot if it points at `candidate`
    pub fn withdraw_vote(&mut self, voter: &str, candidate: usize) -> VoteEffect {
        if self.ballots.get(voter) == Some(&candidate) {
            self.ballots.remove(voter);
            VoteEffect::Withdrawn
        } else {
            VoteEffect::Ignored
        }
    }

    /// Valid ballots per candidate for `candidates` positions
    pub fn counts_by_candidate(&self, candidates: usize) -> Vec<usize> {
        let mut counts = vec![0; candidates];
        for (voter, &candidate) in &self.ballots {
            if self.conflicted.contains_key(voter) {
                continue;
            }
            if let Some(count) = counts.get_mut(candidate) {
                *count += 1;
            }
        }
        counts
    }

    /// Candidates that received at least one conflicted ballot, in position order
    pub fn bad_votes(&self) -> BTreeSet<usize> {
        self.conflicted.values().flatten().copied().collect()
    }

    /// Current ballot of a voter
    pub fn ballot_of(&self, voter: &str) -> Option<usize> {
        self.ballots.get(voter).copied()
    }

    pub fn is_conflicted(&self, voter: &str) -> bool {
        self.conflicted.contains_key(voter)
    }

    /// Number of voters with a ballot, conflicted or not
    pub fn voters(&self) -> usize {
        self.ballots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_then_withdraw_restores_state() {
        let mut tally = BallotTally::new();
        tally.record_vote("u1", 0);
        let before = tally.counts_by_candidate(3);

        assert_eq!(tally.record_vote("u2", 1), VoteEffect::Recorded);
        assert_eq!(tally.withdraw_vote("u2", 1), VoteEffect::Withdrawn);

        assert_eq!(tally.counts_by_candidate(3), before);
        assert_eq!(tally.ballot_of("u2"), None);
        assert_eq!(tally.voters(), 1);
    }

    #[test]
    fn test_duplicate_add_is_idempotent() {
        let mut tally = BallotTally::new();
        assert_eq!(tally.record_vote("u1", 2), VoteEffect::Recorded);
        assert_eq!(tally.record_vote("u1", 2), VoteEffect::Duplicate);
        assert_eq!(tally.counts_by_candidate(3), vec![0, 0, 1]);
    }

    #[test]
    fn test_withdraw_of_other_or_missing_ballot_is_noop() {
        let mut tally = BallotTally::new();
        assert_eq!(tally.withdraw_vote("ghost", 0), VoteEffect::Ignored);

        tally.record_vote("u1", 0);
        assert_eq!(tally.withdraw_vote("u1", 1), VoteEffect::Ignored);
        assert_eq!(tally.ballot_of("u1"), Some(0));
    }

    #[test]
    fn test_second_candidate_conflicts_voter() {
        let mut tally = BallotTally::new();
        tally.record_vote("u1", 0);
        tally.record_vote("u2", 0);
        assert_eq!(tally.record_vote("u1", 1), VoteEffect::Conflicted);

        assert!(tally.is_conflicted("u1"));
        // First ballot is kept but no longer counted
        assert_eq!(tally.ballot_of("u1"), Some(0));
        assert_eq!(tally.counts_by_candidate(3), vec![1, 0, 0]);
        assert_eq!(tally.bad_votes(), BTreeSet::from([0, 1]));
    }

    #[test]
    fn test_conflict_is_sticky() {
        let mut tally = BallotTally::new();
        tally.record_vote("u1", 0);
        tally.record_vote("u1", 1);
        tally.withdraw_vote("u1", 0);
        tally.record_vote("u1", 2);

        assert!(tally.is_conflicted("u1"));
        assert_eq!(tally.bad_votes(), BTreeSet::from([0, 1, 2]));
        assert_eq!(tally.counts_by_candidate(3), vec![0, 0, 0]);
    }

    #[test]
    fn test_remove_before_add_is_tolerated() {
        let mut tally = BallotTally::new();
        assert_eq!(tally.withdraw_vote("u1", 1), VoteEffect::Ignored);
        assert_eq!(tally.record_vote("u1", 1), VoteEffect::Recorded);
        assert_eq!(tally.counts_by_candidate(2), vec![0, 1]);
    }
}
