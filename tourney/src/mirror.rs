//! Cache mirror: pushes ranked-cache mutations after a durable commit.
//!
//! The store and the cache are not atomically coupled. Services collect the
//! [`CacheOp`]s an operation implies, commit the transaction, then hand the
//! list to a [`CacheMirror`]. A failure here leaves the cache behind the store
//! (drift); it is logged and reported, never rolled back.

use async_trait::async_trait;
use std::sync::Arc;

use crate::cache::{CacheError, CacheResult, Namespace, RankedCache};
use crate::models::UserId;
use crate::store::{StoreResult, StoreTx};

/// A single cache mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    /// Set or update a member.
    Upsert {
        namespace: Namespace,
        user_id: UserId,
        score: i64,
    },
    /// Update a member only if it is already in the namespace.
    RefreshIfPresent {
        namespace: Namespace,
        user_id: UserId,
        score: i64,
    },
    RemoveMember {
        namespace: Namespace,
        user_id: UserId,
    },
    RemoveNamespace(Namespace),
    /// Drop every prefixed key.
    Clear,
}

/// Upserts of a user's new score into every open tournament they play in.
///
/// Read inside the transaction that changed the score, so the participant
/// set matches what is committed.
pub(crate) async fn tournament_score_ops(
    tx: &mut dyn StoreTx,
    user_id: UserId,
    score: i64,
) -> StoreResult<Vec<CacheOp>> {
    Ok(tx
        .open_tournaments_of(user_id)
        .await?
        .into_iter()
        .map(|tournament_id| CacheOp::Upsert {
            namespace: Namespace::Tournament(tournament_id),
            user_id,
            score,
        })
        .collect())
}

/// Applies cache operations after commit.
#[async_trait]
pub trait CacheMirror: Send + Sync {
    /// Apply `ops` in order. Returns the first failure, if any.
    async fn apply(&self, ops: Vec<CacheOp>) -> CacheResult<()>;
}

/// Mirror that attempts every operation even after one fails.
#[derive(Clone)]
pub struct BestEffortMirror {
    cache: Arc<dyn RankedCache>,
}

impl BestEffortMirror {
    pub fn new(cache: Arc<dyn RankedCache>) -> Self {
        Self { cache }
    }

    async fn apply_one(&self, op: &CacheOp) -> CacheResult<()> {
        match *op {
            CacheOp::Upsert {
                namespace,
                user_id,
                score,
            } => self.cache.upsert(namespace, user_id, score).await,
            CacheOp::RefreshIfPresent {
                namespace,
                user_id,
                score,
            } => {
                if self.cache.score(namespace, user_id).await?.is_some() {
                    self.cache.upsert(namespace, user_id, score).await?;
                }
                Ok(())
            }
            CacheOp::RemoveMember { namespace, user_id } => {
                self.cache.remove_member(namespace, user_id).await
            }
            CacheOp::RemoveNamespace(namespace) => self.cache.remove(namespace).await,
            CacheOp::Clear => self.cache.clear().await,
        }
    }
}

#[async_trait]
impl CacheMirror for BestEffortMirror {
    async fn apply(&self, ops: Vec<CacheOp>) -> CacheResult<()> {
        let mut first_error: Option<CacheError> = None;
        for op in &ops {
            if let Err(err) = self.apply_one(op).await {
                log::warn!("Leaderboard cache drift: {op:?} not applied: {err}");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
