//! End-to-end movie night flows
//!
//! Drives the command layer against the in-memory platform and a file-backed
//! store. "Restarting" means building a fresh service over the same store file
//! and platform, which forces the vote to be recovered from reactions.

use marquee::channels::{MemoryPlatform, ReactionEvent};
use marquee::commands::{CommandError, MovieNight};
use marquee::election::{ElectionError, VoteEffect, PALETTE};
use marquee::suggestions::{Selector, SuggestionStore};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const GUILD: &str = "guild-1";
const CHANNEL: &str = "movie-night";

async fn service(platform: &Arc<MemoryPlatform>, path: &Path) -> MovieNight {
    let store = SuggestionStore::open(path).await.unwrap();
    MovieNight::new(platform.clone(), Arc::new(store), 20)
}

fn titles(list: Vec<marquee::election::Candidate>) -> Vec<String> {
    list.into_iter().map(|c| c.title).collect()
}

#[tokio::test]
async fn test_vote_survives_restart() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.json");
    let platform = Arc::new(MemoryPlatform::new("bot"));

    let night = service(&platform, &path).await;
    for title in ["A", "B", "C"] {
        night.suggest(GUILD, title, None).await.unwrap();
    }
    let message_id = night.start_vote(GUILD, CHANNEL).await.unwrap().message_id;

    // Reactions land while the process is down
    drop(night);
    platform.react(&message_id, "u1", PALETTE[0]);
    platform.react(&message_id, "u2", PALETTE[1]);

    let night = service(&platform, &path).await;
    let votes: Vec<usize> = night
        .vote_status(GUILD)
        .await
        .unwrap()
        .iter()
        .map(|c| c.votes)
        .collect();
    assert_eq!(votes, vec![1, 1, 0]);

    match night.stop_vote(GUILD).await {
        Err(CommandError::Election(ElectionError::Tie(tied))) => {
            assert_eq!(tied, vec!["A".to_string(), "B".to_string()]);
        }
        other => panic!("Expected a tie, got {:?}", other),
    }

    // Live event after recovery breaks the tie
    let effect = night
        .handle_reaction(&ReactionEvent::added(GUILD, message_id.as_str(), "u3", PALETTE[1]))
        .await;
    assert_eq!(effect, VoteEffect::Recorded);

    let resolution = night.stop_vote(GUILD).await.unwrap();
    assert_eq!(resolution.winner, "B");
    drop(night);

    let night = service(&platform, &path).await;
    assert_eq!(night.next_movie(GUILD).await, Some("B".to_string()));
    assert_eq!(titles(night.suggestions(GUILD).await), vec!["A", "C"]);
    assert!(matches!(
        night.vote_status(GUILD).await,
        Err(CommandError::Election(ElectionError::NoActivePoll))
    ));
}

#[tokio::test]
async fn test_deleted_poll_degrades_to_no_vote() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.json");
    let platform = Arc::new(MemoryPlatform::new("bot"));

    let night = service(&platform, &path).await;
    night.suggest(GUILD, "A", None).await.unwrap();
    let message_id = night.start_vote(GUILD, CHANNEL).await.unwrap().message_id;
    drop(night);

    platform.delete_message(&message_id);

    let night = service(&platform, &path).await;
    assert!(matches!(
        night.stop_vote(GUILD).await,
        Err(CommandError::Election(ElectionError::NoActivePoll))
    ));
    // The list is editable again and a new vote can be posted
    night.unsuggest(GUILD, &Selector::Index(1)).await.unwrap();
    night.suggest(GUILD, "D", None).await.unwrap();
    night.start_vote(GUILD, CHANNEL).await.unwrap();
}

#[tokio::test]
async fn test_live_addition_is_recovered() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.json");
    let platform = Arc::new(MemoryPlatform::new("bot"));

    let night = service(&platform, &path).await;
    night.suggest(GUILD, "A", None).await.unwrap();
    let message_id = night.start_vote(GUILD, CHANNEL).await.unwrap().message_id;
    let added = night.suggest(GUILD, "B", None).await.unwrap();
    assert_eq!(added.live_symbol, Some(PALETTE[1]));
    drop(night);

    platform.react(&message_id, "u1", PALETTE[1]);

    let night = service(&platform, &path).await;
    assert_eq!(night.stop_vote(GUILD).await.unwrap().winner, "B");
}

#[tokio::test]
async fn test_guilds_vote_independently() {
    let temp = TempDir::new().unwrap();
    let platform = Arc::new(MemoryPlatform::new("bot"));
    let night = service(&platform, &temp.path().join("store.json")).await;

    night.suggest("g1", "A", None).await.unwrap();
    night.suggest("g2", "B", None).await.unwrap();
    let first = night.start_vote("g1", CHANNEL).await.unwrap().message_id;

    // A reaction on g1's poll does nothing to g2
    let effect = night
        .handle_reaction(&ReactionEvent::added("g2", first.as_str(), "u1", PALETTE[0]))
        .await;
    assert_eq!(effect, VoteEffect::Ignored);
    assert!(night.clear_suggestions("g2").await.is_ok());
    assert!(matches!(
        night.clear_suggestions("g1").await,
        Err(CommandError::VoteInProgress(_))
    ));
}

#[tokio::test]
async fn test_failed_store_write_keeps_vote_open() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");
    let platform = Arc::new(MemoryPlatform::new("bot"));
    let store = Arc::new(SuggestionStore::open(dir.join("store.json")).await.unwrap());
    let night = MovieNight::new(platform.clone(), store.clone(), 20);

    for title in ["A", "B"] {
        night.suggest(GUILD, title, None).await.unwrap();
    }
    let message_id = night.start_vote(GUILD, CHANNEL).await.unwrap().message_id;
    night
        .handle_reaction(&ReactionEvent::added(GUILD, message_id.as_str(), "u1", PALETTE[0]))
        .await;

    std::fs::remove_dir_all(&dir).unwrap();
    assert!(matches!(
        night.stop_vote(GUILD).await,
        Err(CommandError::Store(_))
    ));
    assert!(matches!(
        night.cancel_vote(GUILD).await,
        Err(CommandError::Store(_))
    ));

    // Nothing moved: same vote, same list, same marker
    let votes: Vec<usize> = night
        .vote_status(GUILD)
        .await
        .unwrap()
        .iter()
        .map(|c| c.votes)
        .collect();
    assert_eq!(votes, vec![1, 0]);
    assert_eq!(titles(night.suggestions(GUILD).await), vec!["A", "B"]);
    assert_eq!(
        store.poll_marker(GUILD).await.map(|m| m.message_id),
        Some(message_id.clone())
    );
    assert_eq!(night.next_movie(GUILD).await, None);

    // Once the disk is back the same vote closes normally
    std::fs::create_dir_all(&dir).unwrap();
    assert_eq!(night.stop_vote(GUILD).await.unwrap().winner, "A");
    assert_eq!(titles(night.suggestions(GUILD).await), vec!["B"]);
    assert_eq!(store.poll_marker(GUILD).await, None);
    drop(night);

    let night = service(&platform, &dir.join("store.json")).await;
    assert_eq!(night.next_movie(GUILD).await, Some("A".to_string()));
}
