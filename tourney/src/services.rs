//! Wiring of every service over one store and one cache.

use std::sync::Arc;

use crate::cache::{MemoryRankedCache, RankedCache};
use crate::leaderboard::LeaderboardProjection;
use crate::maintenance::Maintenance;
use crate::mirror::{BestEffortMirror, CacheMirror};
use crate::store::{MemoryStore, Store};
use crate::tournament::{TournamentManager, TournamentRules};
use crate::user::UserManager;

/// Every service sharing the same backends.
#[derive(Clone)]
pub struct Services {
    pub users: UserManager,
    pub tournaments: TournamentManager,
    pub leaderboard: LeaderboardProjection,
    pub maintenance: Maintenance,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn RankedCache>, rules: TournamentRules) -> Self {
        let mirror: Arc<dyn CacheMirror> = Arc::new(BestEffortMirror::new(Arc::clone(&cache)));
        Self {
            users: UserManager::new(Arc::clone(&store), Arc::clone(&mirror)),
            tournaments: TournamentManager::new(Arc::clone(&store), Arc::clone(&mirror), rules),
            leaderboard: LeaderboardProjection::new(Arc::clone(&store), Arc::clone(&cache)),
            maintenance: Maintenance::new(store, cache, mirror),
        }
    }

    /// Services over fresh in-memory backends.
    pub fn in_memory(rules: TournamentRules) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryRankedCache::new()),
            rules,
        )
    }
}
