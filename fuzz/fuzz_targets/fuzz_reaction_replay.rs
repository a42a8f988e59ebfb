#![no_main]

use libfuzzer_sys::fuzz_target;

use marquee::election::{Candidate, Election, ElectionError, PALETTE};

const MESSAGE: &str = "poll";

fuzz_target!(|data: &[u8]| {
    // First byte picks the candidate count, every following byte is one
    // reaction event: bit 7 add/remove, bits 4-6 voter, bits 0-3 symbol.
    let Some((&first, events)) = data.split_first() else {
        return;
    };
    let count = (first as usize % PALETTE.len()) + 1;
    let candidates: Vec<Candidate> = (0..count).map(|i| Candidate::new(format!("M{}", i))).collect();

    let mut election = Election::new();
    if election.open_poll(candidates).is_err() {
        return;
    }
    let _ = election.bind_message(MESSAGE);

    for &byte in events {
        let voter = format!("u{}", (byte >> 4) & 0x07);
        let symbol = PALETTE[(byte & 0x0f) as usize];
        if byte & 0x80 == 0 {
            election.on_reaction_added(MESSAGE, &voter, symbol);
        } else {
            election.on_reaction_removed(MESSAGE, &voter, symbol);
        }
    }

    // Counts never exceed the number of voters and resolution is total
    let counts = election.counts_by_candidate().unwrap_or_default();
    assert!(counts.iter().map(|c| c.votes).sum::<usize>() <= 8);
    match election.resolve() {
        Ok(resolution) => assert!(resolution.counts.iter().any(|c| c.title == resolution.winner)),
        Err(ElectionError::Tie(tied)) => assert!(!tied.is_empty()),
        Err(other) => panic!("unexpected error {}", other),
    }
});
