//! User manager.

use std::sync::Arc;

use crate::cache::Namespace;
use crate::errors::{ServiceError, ServiceResult};
use crate::mirror::{CacheMirror, CacheOp, tournament_score_ops};
use crate::models::{CreateUserRequest, MAX_LEVEL, UpdateUserRequest, User, UserId};
use crate::store::Store;

/// User manager
#[derive(Clone)]
pub struct UserManager {
    store: Arc<dyn Store>,
    mirror: Arc<dyn CacheMirror>,
}

impl UserManager {
    pub fn new(store: Arc<dyn Store>, mirror: Arc<dyn CacheMirror>) -> Self {
        Self { store, mirror }
    }

    /// Create a user. The score is derived, never supplied.
    pub async fn create(&self, request: CreateUserRequest) -> ServiceResult<User> {
        let new_user = request.validate()?;

        let mut tx = self.store.begin().await?;
        let user = tx.insert_user(&new_user).await?;
        tx.commit().await?;

        log::info!("Created user {} ({})", user.id, user.name);
        Ok(user)
    }

    /// Apply a partial update. The global leaderboard is refreshed only if
    /// the user is already on it; open tournaments they play in always are.
    pub async fn update(&self, user_id: UserId, request: UpdateUserRequest) -> ServiceResult<User> {
        let mut tx = self.store.begin().await?;
        let current = tx
            .lock_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;

        let updated = request.apply_to(&current)?;
        tx.save_user(&updated).await?;

        let mut ops = Vec::new();
        if updated.score() != current.score() {
            ops.push(CacheOp::RefreshIfPresent {
                namespace: Namespace::Global,
                user_id,
                score: updated.score(),
            });
            ops.extend(tournament_score_ops(tx.as_mut(), user_id, updated.score()).await?);
        }
        tx.commit().await?;

        if !ops.is_empty() {
            self.mirror(ops).await?;
        }
        Ok(updated)
    }

    /// Delete a user and drop them from the global leaderboard and from
    /// every open tournament ranking.
    pub async fn delete(&self, user_id: UserId) -> ServiceResult<()> {
        let mut tx = self.store.begin().await?;
        let mut ops = vec![CacheOp::RemoveMember {
            namespace: Namespace::Global,
            user_id,
        }];
        ops.extend(
            tx.open_tournaments_of(user_id)
                .await?
                .into_iter()
                .map(|tournament_id| CacheOp::RemoveMember {
                    namespace: Namespace::Tournament(tournament_id),
                    user_id,
                }),
        );

        if !tx.delete_user(user_id).await? {
            return Err(ServiceError::not_found("User", user_id));
        }
        tx.commit().await?;

        log::info!("Deleted user {}", user_id);
        self.mirror(ops).await
    }

    pub async fn get(&self, user_id: UserId) -> ServiceResult<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))
    }

    pub async fn list(&self) -> ServiceResult<Vec<User>> {
        Ok(self.store.list_users().await?)
    }

    /// Spend `100 + level * 50` money to gain one level.
    pub async fn level_up(&self, user_id: UserId) -> ServiceResult<User> {
        let mut tx = self.store.begin().await?;
        let mut user = tx
            .lock_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;

        if user.level >= MAX_LEVEL {
            return Err(ServiceError::Validation(format!(
                "user is already at the maximum level {MAX_LEVEL}"
            )));
        }

        user.debit(user.level_up_cost())?;
        user.set_level(user.level + 1)?;
        tx.save_user(&user).await?;

        let mut ops = vec![CacheOp::Upsert {
            namespace: Namespace::Global,
            user_id,
            score: user.score(),
        }];
        ops.extend(tournament_score_ops(tx.as_mut(), user_id, user.score()).await?);
        tx.commit().await?;

        log::debug!("User {} reached level {}", user_id, user.level);
        self.mirror(ops).await?;
        Ok(user)
    }

    async fn mirror(&self, ops: Vec<CacheOp>) -> ServiceResult<()> {
        self.mirror.apply(ops).await.map_err(ServiceError::from)
    }
}
