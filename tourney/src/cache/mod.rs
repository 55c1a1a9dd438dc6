//! Ranked cache: ephemeral sorted sets keyed by leaderboard namespace.
//!
//! Scores are kept in descending order; ranges are 0-indexed and inclusive
//! on both ends. Ties are ordered by member descending, the order Redis uses
//! for `ZREVRANGE`. Every key carries the configured prefix.

pub mod errors;
pub mod memory;
pub mod redis_cache;

pub use errors::{CacheError, CacheResult};
pub use memory::MemoryRankedCache;
pub use redis_cache::RedisRankedCache;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::models::{TournamentId, UserId};

/// Key of the global leaderboard.
pub const GLOBAL_KEY: &str = "leaderboard";

/// Leaderboard namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Global,
    Tournament(TournamentId),
}

impl Namespace {
    /// Key without the configured prefix.
    pub fn key(self) -> String {
        match self {
            Namespace::Global => GLOBAL_KEY.to_string(),
            Namespace::Tournament(id) => format!("{GLOBAL_KEY}:{id}"),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Ranked cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis connection URL
    pub url: String,

    /// Prefix prepended to every key
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "tourney:".to_string(),
        }
    }
}

/// One member of a ranked window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankedMember {
    /// 1-based position in the namespace
    pub rank: usize,
    pub user_id: UserId,
    pub score: i64,
}

/// Sorted-set cache.
#[async_trait]
pub trait RankedCache: Send + Sync {
    /// Set or update a member's score.
    async fn upsert(&self, namespace: Namespace, user_id: UserId, score: i64) -> CacheResult<()>;

    /// Members ranked `start..=stop`, highest score first. Empty when
    /// `stop < start`.
    async fn range(
        &self,
        namespace: Namespace,
        start: usize,
        stop: usize,
    ) -> CacheResult<Vec<RankedMember>>;

    /// Current score of a member, `None` if absent.
    async fn score(&self, namespace: Namespace, user_id: UserId) -> CacheResult<Option<i64>>;

    async fn remove_member(&self, namespace: Namespace, user_id: UserId) -> CacheResult<()>;

    /// Delete a whole namespace.
    async fn remove(&self, namespace: Namespace) -> CacheResult<()>;

    /// Delete every key under the configured prefix.
    async fn clear(&self) -> CacheResult<()>;

    async fn ping(&self) -> CacheResult<()>;
}

/// Parse a sorted-set member back into a user id.
pub(crate) fn parse_member(member: &str) -> CacheResult<UserId> {
    member
        .parse()
        .map_err(|_| CacheError::InvalidMember(member.to_string()))
}
