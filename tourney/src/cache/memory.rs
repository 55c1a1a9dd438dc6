//! In-process ranked cache.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::{CacheError, CacheResult, Namespace, RankedCache, RankedMember};
use crate::models::UserId;

/// [`RankedCache`] held in memory. Can simulate an outage with
/// [`MemoryRankedCache::set_unavailable`].
#[derive(Debug, Default)]
pub struct MemoryRankedCache {
    prefix: String,
    sets: Mutex<HashMap<String, HashMap<UserId, i64>>>,
    unavailable: AtomicBool,
}

impl MemoryRankedCache {
    pub fn new() -> Self {
        Self::with_prefix("tourney:")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Make every following call fail with [`CacheError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of live keys.
    pub async fn key_count(&self) -> usize {
        self.sets.lock().await.len()
    }

    fn key(&self, namespace: Namespace) -> String {
        format!("{}{}", self.prefix, namespace.key())
    }

    fn check(&self) -> CacheResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

/// Descending score, ties by member descending. Members compare as strings,
/// matching a Redis sorted set.
fn ranked(set: &HashMap<UserId, i64>) -> Vec<(UserId, i64)> {
    let mut members: Vec<(UserId, i64)> = set.iter().map(|(&m, &s)| (m, s)).collect();
    members.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| b.0.to_string().cmp(&a.0.to_string()))
    });
    members
}

#[async_trait]
impl RankedCache for MemoryRankedCache {
    async fn upsert(&self, namespace: Namespace, user_id: UserId, score: i64) -> CacheResult<()> {
        self.check()?;
        self.sets
            .lock()
            .await
            .entry(self.key(namespace))
            .or_default()
            .insert(user_id, score);
        Ok(())
    }

    async fn range(
        &self,
        namespace: Namespace,
        start: usize,
        stop: usize,
    ) -> CacheResult<Vec<RankedMember>> {
        self.check()?;
        let sets = self.sets.lock().await;
        let Some(set) = sets.get(&self.key(namespace)) else {
            return Ok(Vec::new());
        };
        if stop < start {
            return Ok(Vec::new());
        }

        Ok(ranked(set)
            .into_iter()
            .enumerate()
            .skip(start)
            .take((stop - start).saturating_add(1))
            .map(|(index, (user_id, score))| RankedMember {
                rank: index + 1,
                user_id,
                score,
            })
            .collect())
    }

    async fn score(&self, namespace: Namespace, user_id: UserId) -> CacheResult<Option<i64>> {
        self.check()?;
        let sets = self.sets.lock().await;
        Ok(sets
            .get(&self.key(namespace))
            .and_then(|set| set.get(&user_id).copied()))
    }

    async fn remove_member(&self, namespace: Namespace, user_id: UserId) -> CacheResult<()> {
        self.check()?;
        let key = self.key(namespace);
        let mut sets = self.sets.lock().await;
        if let Some(set) = sets.get_mut(&key) {
            set.remove(&user_id);
            if set.is_empty() {
                sets.remove(&key);
            }
        }
        Ok(())
    }

    async fn remove(&self, namespace: Namespace) -> CacheResult<()> {
        self.check()?;
        self.sets.lock().await.remove(&self.key(namespace));
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.check()?;
        let prefix = self.prefix.clone();
        self.sets
            .lock()
            .await
            .retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        self.check()
    }
}
