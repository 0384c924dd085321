//! Persistence collaborator: one record per player, keyed by player id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use grove_core::PlayerId;
use grove_engine::GameState;
use serde::{Deserialize, Serialize};

use crate::{Profile, StoreError};

/// Everything persisted for one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Identity as last resolved.
    pub profile: Profile,
    /// Game state.
    pub state: GameState,
}

/// Opaque get/put of player records.
#[async_trait]
pub trait PlayerStore: Send + Sync {
    /// Load a player's record.
    async fn load(&self, player: PlayerId) -> Result<Option<PlayerRecord>, StoreError>;

    /// Store a player's record, replacing any previous one.
    async fn save(&self, record: &PlayerRecord) -> Result<(), StoreError>;

    /// Player owning `code`, if any.
    async fn find_by_referral_code(&self, code: &str) -> Result<Option<PlayerId>, StoreError>;
}

/// Map-backed store with optional injected read and write failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<PlayerId, PlayerRecord>>,
    failing_loads: AtomicU32,
    failing_saves: AtomicU32,
    saves: AtomicU64,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` loads fail as unavailable.
    pub fn fail_next_loads(&self, n: u32) {
        self.failing_loads.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` saves fail as unavailable.
    pub fn fail_next_saves(&self, n: u32) {
        self.failing_saves.store(n, Ordering::SeqCst);
    }

    /// Successful saves so far.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Stored copy of a record, bypassing the async interface.
    pub fn get(&self, player: PlayerId) -> Option<PlayerRecord> {
        self.records().get(&player).cloned()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<PlayerId, PlayerRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn take_injected(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl PlayerStore for MemoryStore {
    async fn load(&self, player: PlayerId) -> Result<Option<PlayerRecord>, StoreError> {
        if take_injected(&self.failing_loads) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        Ok(self.records().get(&player).cloned())
    }

    async fn save(&self, record: &PlayerRecord) -> Result<(), StoreError> {
        if take_injected(&self.failing_saves) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        self.records()
            .insert(record.profile.player_id, record.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<PlayerId>, StoreError> {
        Ok(self
            .records()
            .values()
            .find(|record| record.state.referral.code == code)
            .map(|record| record.profile.player_id))
    }
}
