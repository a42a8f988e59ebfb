//! Emoji Allocator
//!
//! Binds candidate positions to reaction symbols. The binding depends only on
//! position, so it can be recomputed from the candidate list after a restart.

use super::types::{ElectionError, ElectionResult};

/// Reaction symbols in allocation order: keycaps 1-10, then regional indicators A-J.
pub const PALETTE: [&str; 20] = [
    "1\u{fe0f}\u{20e3}",
    "2\u{fe0f}\u{20e3}",
    "3\u{fe0f}\u{20e3}",
    "4\u{fe0f}\u{20e3}",
    "5\u{fe0f}\u{20e3}",
    "6\u{fe0f}\u{20e3}",
    "7\u{fe0f}\u{20e3}",
    "8\u{fe0f}\u{20e3}",
    "9\u{fe0f}\u{20e3}",
    "\u{1f51f}",
    "\u{1f1e6}",
    "\u{1f1e7}",
    "\u{1f1e8}",
    "\u{1f1e9}",
    "\u{1f1ea}",
    "\u{1f1eb}",
    "\u{1f1ec}",
    "\u{1f1ed}",
    "\u{1f1ee}",
    "\u{1f1ef}",
];

/// Largest number of candidates a single poll can carry
pub const MAX_CANDIDATES: usize = PALETTE.len();

/// Position <-> symbol bijection for one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiMap {
    len: usize,
}

impl EmojiMap {
    /// Allocate symbols for `len` candidates
    pub fn allocate(len: usize) -> ElectionResult<Self> {
        if len > MAX_CANDIDATES {
            return Err(ElectionError::CapacityExceeded {
                max: MAX_CANDIDATES,
            });
        }
        Ok(Self { len })
    }

    /// Number of bound candidates
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bind one more position, returning its symbol
    pub fn extend(&mut self) -> ElectionResult<&'static str> {
        let symbol = PALETTE.get(self.len).ok_or(ElectionError::CapacityExceeded {
            max: MAX_CANDIDATES,
        })?;
        self.len += 1;
        Ok(symbol)
    }

    /// Symbol bound to a position
    pub fn symbol_of(&self, index: usize) -> Option<&'static str> {
        if index < self.len {
            Some(PALETTE[index])
        } else {
            None
        }
    }

    /// Position bound to a symbol, ignoring variation selectors
    pub fn candidate_of(&self, symbol: &str) -> Option<usize> {
        let wanted = normalize(symbol);
        PALETTE[..self.len]
            .iter()
            .position(|candidate| normalize(candidate) == wanted)
    }

    /// All bound symbols in position order
    pub fn symbols(&self) -> &'static [&'static str] {
        &PALETTE[..self.len]
    }
}

fn normalize(symbol: &str) -> String {
    symbol.chars().filter(|c| *c != '\u{fe0f}').collect()
}
