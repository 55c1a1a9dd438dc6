//! Health checks and administrative wipe.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::errors::{ServiceError, ServiceResult};
use crate::mirror::{CacheMirror, CacheOp};
use crate::cache::RankedCache;
use crate::store::Store;

/// Default bound on each health check.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Reachability of one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "detail")]
pub enum BackendStatus {
    Up,
    Down(String),
}

impl BackendStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, BackendStatus::Up)
    }
}

/// Health of the durable store and the ranked cache, checked independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub store: BackendStatus,
    pub cache: BackendStatus,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.store.is_up() && self.cache.is_up()
    }
}

/// Maintenance operations
#[derive(Clone)]
pub struct Maintenance {
    store: Arc<dyn Store>,
    cache: Arc<dyn RankedCache>,
    mirror: Arc<dyn CacheMirror>,
    check_timeout: Duration,
}

impl Maintenance {
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<dyn RankedCache>,
        mirror: Arc<dyn CacheMirror>,
    ) -> Self {
        Self {
            store,
            cache,
            mirror,
            check_timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }

    pub fn with_check_timeout(mut self, check_timeout: Duration) -> Self {
        self.check_timeout = check_timeout;
        self
    }

    /// Ping both backends.
    pub async fn health(&self) -> HealthReport {
        let (store, cache) = tokio::join!(
            timeout(self.check_timeout, self.store.ping()),
            timeout(self.check_timeout, self.cache.ping()),
        );

        let store = match store {
            Ok(Ok(())) => BackendStatus::Up,
            Ok(Err(err)) => BackendStatus::Down(err.to_string()),
            Err(_) => BackendStatus::Down(format!("timed out after {:?}", self.check_timeout)),
        };
        let cache = match cache {
            Ok(Ok(())) => BackendStatus::Up,
            Ok(Err(err)) => BackendStatus::Down(err.to_string()),
            Err(_) => BackendStatus::Down(format!("timed out after {:?}", self.check_timeout)),
        };

        if !store.is_up() || !cache.is_up() {
            log::warn!("Health check degraded: store={store:?} cache={cache:?}");
        }
        HealthReport { store, cache }
    }

    /// Truncate every table and clear every prefixed cache key.
    pub async fn wipe(&self) -> ServiceResult<()> {
        self.store.truncate_all().await?;
        log::warn!("All tables truncated");
        self.mirror
            .apply(vec![CacheOp::Clear])
            .await
            .map_err(ServiceError::from)
    }
}
