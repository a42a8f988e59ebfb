//! Election Registry
//!
//! One election per guild, created lazily. The first access after process
//! start runs recovery if the store says a vote was in flight.

use super::engine::Election;
use super::recovery::recover;
use crate::channels::{DynPlatform, GuildId};
use crate::suggestions::SuggestionStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Slot {
    election: Election,
    recovered: bool,
}

/// Exclusive access to one guild's election
pub struct ElectionGuard {
    guard: OwnedMutexGuard<Slot>,
}

impl Deref for ElectionGuard {
    type Target = Election;

    fn deref(&self) -> &Election {
        &self.guard.election
    }
}

impl DerefMut for ElectionGuard {
    fn deref_mut(&mut self) -> &mut Election {
        &mut self.guard.election
    }
}

/// Per-guild elections sharing one platform client and store
pub struct ElectionRegistry {
    platform: DynPlatform,
    store: Arc<SuggestionStore>,
    slots: Mutex<HashMap<GuildId, Arc<AsyncMutex<Slot>>>>,
}

impl ElectionRegistry {
    pub fn new(platform: DynPlatform, store: Arc<SuggestionStore>) -> Self {
        Self {
            platform,
            store,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn platform(&self) -> &DynPlatform {
        &self.platform
    }

    pub fn store(&self) -> &Arc<SuggestionStore> {
        &self.store
    }

    /// Lock the election of `guild_id`, recovering it on first access.
    ///
    /// Holding the guard serializes every operation on that guild; other
    /// guilds are unaffected.
    pub async fn get_or_create(&self, guild_id: &str) -> ElectionGuard {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(guild_id.to_string()).or_default())
        };

        let mut guard = slot.lock_owned().await;
        if !guard.recovered {
            guard.election = self.recover_guild(guild_id).await;
            guard.recovered = true;
        }
        ElectionGuard { guard }
    }

    /// Number of guilds touched since start
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    async fn recover_guild(&self, guild_id: &str) -> Election {
        let Some(marker) = self.store.poll_marker(guild_id).await else {
            debug!(guild = %guild_id, "No vote in flight");
            return Election::new();
        };

        let candidates = self.store.list(guild_id).await;
        match recover(self.platform.as_ref(), guild_id, &marker, candidates).await {
            Ok(election) => election,
            Err(e) => {
                warn!(guild = %guild_id, message = %marker.message_id, error = %e, "Vote recovery failed, dropping poll marker");
                if let Err(e) = self.store.set_poll_marker(guild_id, None).await {
                    warn!(guild = %guild_id, error = %e, "Failed to clear poll marker");
                }
                Election::new()
            }
        }
    }
}
