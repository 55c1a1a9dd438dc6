//! Leaderboard projection queries.

use std::sync::Arc;

use crate::cache::{Namespace, RankedCache, RankedMember};
use crate::errors::{ServiceError, ServiceResult};
use crate::models::{EntryFilter, EntryStatus, LeaderboardEntry, TournamentId, UserId};
use crate::store::Store;

/// First rank returned when the caller gives none.
pub const DEFAULT_START: i64 = 0;

/// Last rank returned when the caller gives none (inclusive).
pub const DEFAULT_STOP: i64 = 9;

/// Validated, inclusive, 0-indexed rank window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankWindow {
    pub start: usize,
    pub stop: usize,
}

impl RankWindow {
    /// Build a window from optional bounds, defaulting to the top ten.
    pub fn new(start: Option<i64>, stop: Option<i64>) -> ServiceResult<Self> {
        let start = start.unwrap_or(DEFAULT_START);
        let stop = stop.unwrap_or(DEFAULT_STOP);

        let (Ok(start_index), Ok(stop_index)) = (usize::try_from(start), usize::try_from(stop))
        else {
            return Err(ServiceError::Validation(
                "leaderboard window bounds cannot be negative".to_string(),
            ));
        };
        if stop_index < start_index {
            return Err(ServiceError::Validation(format!(
                "leaderboard window stop ({stop}) is before start ({start})"
            )));
        }
        Ok(Self {
            start: start_index,
            stop: stop_index,
        })
    }
}

impl Default for RankWindow {
    fn default() -> Self {
        Self {
            start: 0,
            stop: 9,
        }
    }
}

/// Leaderboard projection
#[derive(Clone)]
pub struct LeaderboardProjection {
    store: Arc<dyn Store>,
    cache: Arc<dyn RankedCache>,
}

impl LeaderboardProjection {
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn RankedCache>) -> Self {
        Self { store, cache }
    }

    /// Global ranking window, highest score first.
    pub async fn active(&self, window: RankWindow) -> ServiceResult<Vec<RankedMember>> {
        Ok(self
            .cache
            .range(Namespace::Global, window.start, window.stop)
            .await?)
    }

    /// Live ranking window of an open tournament, highest score first.
    /// Empty once the tournament is settled.
    pub async fn tournament_ranking(
        &self,
        tournament_id: TournamentId,
        window: RankWindow,
    ) -> ServiceResult<Vec<RankedMember>> {
        self.ensure_tournament(tournament_id).await?;
        Ok(self
            .cache
            .range(
                Namespace::Tournament(tournament_id),
                window.start,
                window.stop,
            )
            .await?)
    }

    /// Active rows of a tournament.
    pub async fn active_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> ServiceResult<Vec<LeaderboardEntry>> {
        self.ensure_tournament(tournament_id).await?;
        Ok(self
            .store
            .list_entries(EntryFilter::status(EntryStatus::Active).tournament(tournament_id))
            .await?)
    }

    /// Active rows across every tournament a user is in.
    pub async fn active_by_user(&self, user_id: UserId) -> ServiceResult<Vec<LeaderboardEntry>> {
        if self.store.find_user(user_id).await?.is_none() {
            return Err(ServiceError::not_found("User", user_id));
        }
        Ok(self
            .store
            .list_entries(EntryFilter::status(EntryStatus::Active).user(user_id))
            .await?)
    }

    /// Final standings of a tournament, in rank order.
    pub async fn finished_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> ServiceResult<Vec<LeaderboardEntry>> {
        self.ensure_tournament(tournament_id).await?;
        Ok(self
            .store
            .list_entries(EntryFilter::status(EntryStatus::Passive).tournament(tournament_id))
            .await?)
    }

    async fn ensure_tournament(&self, tournament_id: TournamentId) -> ServiceResult<()> {
        if self.store.find_tournament(tournament_id).await?.is_none() {
            return Err(ServiceError::not_found("Tournament", tournament_id));
        }
        Ok(())
    }
}
