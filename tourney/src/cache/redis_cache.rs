//! Redis-backed ranked cache.
//!
//! The connection manager is established lazily and dropped after any failed
//! command so the next call reconnects. Mutations run as `MULTI`/`EXEC`
//! pipelines.

use async_trait::async_trait;
use redis::FromRedisValue;
use redis::aio::ConnectionManager;
use tokio::sync::{Mutex, MutexGuard};

use super::{
    CacheConfig, CacheError, CacheResult, Namespace, RankedCache, RankedMember, parse_member,
};
use crate::models::UserId;
use crate::score::{cache_score, from_cache_score};

/// [`RankedCache`] over Redis sorted sets.
pub struct RedisRankedCache {
    client: redis::Client,
    connection: Mutex<Option<ConnectionManager>>,
    prefix: String,
}

impl RedisRankedCache {
    /// Create a cache client. No connection is made until first use.
    pub fn new(config: &CacheConfig) -> CacheResult<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            prefix: config.key_prefix.clone(),
        })
    }

    fn key(&self, namespace: Namespace) -> String {
        format!("{}{}", self.prefix, namespace.key())
    }

    async fn ensure_connection(&self) -> CacheResult<MutexGuard<'_, Option<ConnectionManager>>> {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(self.client.get_connection_manager().await?);
        }
        Ok(guard)
    }

    async fn query<T: FromRedisValue>(&self, pipe: &redis::Pipeline) -> CacheResult<T> {
        let mut guard = self.ensure_connection().await.inspect_err(|err| {
            log::warn!("Redis connection failed: {err}");
        })?;
        let Some(conn) = guard.as_mut() else {
            return Err(CacheError::Unavailable("no connection".to_string()));
        };

        let result: redis::RedisResult<T> = pipe.query_async(conn).await;
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                log::warn!("Redis command failed: {err}");
                *guard = None;
                Err(err.into())
            }
        }
    }
}

#[async_trait]
impl RankedCache for RedisRankedCache {
    async fn upsert(&self, namespace: Namespace, user_id: UserId, score: i64) -> CacheResult<()> {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .zadd(self.key(namespace), user_id, cache_score(score))
            .ignore();
        self.query(&pipe).await
    }

    async fn range(
        &self,
        namespace: Namespace,
        start: usize,
        stop: usize,
    ) -> CacheResult<Vec<RankedMember>> {
        let start_index = isize::try_from(start).unwrap_or(isize::MAX);
        let stop_index = isize::try_from(stop).unwrap_or(isize::MAX);

        let mut pipe = redis::pipe();
        pipe.zrevrange_withscores(self.key(namespace), start_index, stop_index);
        let (members,): (Vec<(String, f64)>,) = self.query(&pipe).await?;

        members
            .into_iter()
            .enumerate()
            .map(|(offset, (member, score))| {
                Ok(RankedMember {
                    rank: start + offset + 1,
                    user_id: parse_member(&member)?,
                    score: from_cache_score(score),
                })
            })
            .collect()
    }

    async fn score(&self, namespace: Namespace, user_id: UserId) -> CacheResult<Option<i64>> {
        let mut pipe = redis::pipe();
        pipe.zscore(self.key(namespace), user_id);
        let (score,): (Option<f64>,) = self.query(&pipe).await?;
        Ok(score.map(from_cache_score))
    }

    async fn remove_member(&self, namespace: Namespace, user_id: UserId) -> CacheResult<()> {
        let mut pipe = redis::pipe();
        pipe.atomic().zrem(self.key(namespace), user_id).ignore();
        self.query(&pipe).await
    }

    async fn remove(&self, namespace: Namespace) -> CacheResult<()> {
        let mut pipe = redis::pipe();
        pipe.atomic().del(self.key(namespace)).ignore();
        self.query(&pipe).await
    }

    async fn clear(&self) -> CacheResult<()> {
        let mut lookup = redis::pipe();
        lookup.keys(format!("{}*", self.prefix));
        let (keys,): (Vec<String>,) = self.query(&lookup).await?;
        if keys.is_empty() {
            return Ok(());
        }

        log::debug!("Clearing {} cache keys", keys.len());
        let mut pipe = redis::pipe();
        pipe.atomic().del(keys).ignore();
        self.query(&pipe).await
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut pipe = redis::pipe();
        pipe.cmd("PING");
        let (_pong,): (String,) = self.query(&pipe).await?;
        Ok(())
    }
}
