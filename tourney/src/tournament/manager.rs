//! Tournament manager: CRUD, join, end and finalize.

use serde::Serialize;
use std::sync::Arc;

use super::payout::payout_for;
use crate::cache::Namespace;
use crate::errors::{ServiceError, ServiceResult};
use crate::mirror::{CacheMirror, CacheOp, tournament_score_ops};
use crate::models::{
    CreateTournamentRequest, EntryStatus, JoinRequest, NewEntry, Tournament, TournamentId,
    TournamentStatus, UpdateTournamentRequest, User, UserId,
};
use crate::store::{Store, StoreTx};

/// Money deducted from a user on join.
pub const ENTRY_FEE: i64 = 50;

/// Participant count that finishes a tournament.
pub const MAX_PARTICIPANTS: usize = 10;

/// Entry fee and capacity applied to every tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TournamentRules {
    pub entry_fee: i64,
    pub capacity: usize,
}

impl Default for TournamentRules {
    fn default() -> Self {
        Self {
            entry_fee: ENTRY_FEE,
            capacity: MAX_PARTICIPANTS,
        }
    }
}

/// Prize paid to one ranked participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Award {
    pub user_id: UserId,
    pub rank: usize,
    pub payout: i64,
    /// User score after the payout
    pub score: i64,
}

/// Result of finalizing a tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub tournament_id: TournamentId,
    pub prize: i64,
    /// Awards in rank order
    pub awards: Vec<Award>,
}

/// Result of a join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinOutcome {
    pub tournament: Tournament,
    pub user: User,
    /// Present when this join filled the tournament
    pub settlement: Option<Settlement>,
}

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    store: Arc<dyn Store>,
    mirror: Arc<dyn CacheMirror>,
    rules: TournamentRules,
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(store: Arc<dyn Store>, mirror: Arc<dyn CacheMirror>, rules: TournamentRules) -> Self {
        Self {
            store,
            mirror,
            rules,
        }
    }

    pub fn rules(&self) -> TournamentRules {
        self.rules
    }

    /// Create a Planned tournament together with its placeholder leaderboard row.
    pub async fn create(&self, request: CreateTournamentRequest) -> ServiceResult<Tournament> {
        let (name, prize) = request.validate()?;
        let key = Tournament::key_for(&name);

        let mut tx = self.store.begin().await?;
        let tournament = tx.insert_tournament(&name, &key, prize).await?;
        tx.insert_entry(&NewEntry::placeholder(tournament.id)).await?;
        tx.commit().await?;

        log::info!("Created tournament {} ({})", tournament.id, tournament.key);
        Ok(tournament)
    }

    /// Update name, prize or status. Status only moves forward.
    pub async fn update(
        &self,
        tournament_id: TournamentId,
        request: UpdateTournamentRequest,
    ) -> ServiceResult<Tournament> {
        let mut tx = self.store.begin().await?;
        let current = tx
            .lock_tournament(tournament_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tournament", tournament_id))?;

        let updated = request.apply_to(&current)?;
        tx.save_tournament(&updated).await?;
        tx.commit().await?;

        if current.status != updated.status {
            log::info!(
                "Tournament {} moved from {} to {}",
                tournament_id,
                current.status,
                updated.status
            );
        }
        Ok(updated)
    }

    /// Delete a tournament, its participants and leaderboard rows.
    pub async fn delete(&self, tournament_id: TournamentId) -> ServiceResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_tournament(tournament_id).await? {
            return Err(ServiceError::not_found("Tournament", tournament_id));
        }
        tx.commit().await?;

        log::info!("Deleted tournament {}", tournament_id);
        self.mirror(vec![CacheOp::RemoveNamespace(Namespace::Tournament(
            tournament_id,
        ))])
        .await
    }

    pub async fn get(&self, tournament_id: TournamentId) -> ServiceResult<Tournament> {
        self.store
            .find_tournament(tournament_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tournament", tournament_id))
    }

    pub async fn list_all(&self) -> ServiceResult<Vec<Tournament>> {
        Ok(self.store.list_tournaments(None).await?)
    }

    pub async fn list_ongoing(&self) -> ServiceResult<Vec<Tournament>> {
        Ok(self
            .store
            .list_tournaments(Some(TournamentStatus::Ongoing))
            .await?)
    }

    /// Join a user to a tournament, paying the entry fee.
    ///
    /// The join that reaches capacity finishes the tournament, records an
    /// Active leaderboard row per participant and settles prizes before the
    /// transaction commits.
    pub async fn join(&self, request: JoinRequest) -> ServiceResult<JoinOutcome> {
        let JoinRequest {
            tournament_id,
            user_id,
        } = request;

        let mut tx = self.store.begin().await?;
        let mut tournament = tx
            .lock_tournament(tournament_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tournament", tournament_id))?;

        if tournament.is_finished() {
            return Err(ServiceError::Conflict(
                "cannot join a finished tournament".to_string(),
            ));
        }

        let mut user = tx
            .lock_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;

        if tournament.has_participant(user_id) {
            return Err(ServiceError::Conflict(
                "user already joined this tournament".to_string(),
            ));
        }

        user.debit(self.rules.entry_fee)?;
        tx.save_user(&user).await?;
        tx.add_participant(tournament_id, user_id).await?;
        tournament.users.push(user.clone());

        let mut settlement = None;
        if tournament.participant_count() >= self.rules.capacity {
            log::info!(
                "Tournament {} reached {} participants, finishing",
                tournament_id,
                self.rules.capacity
            );
            for participant in &tournament.users {
                tx.insert_entry(&NewEntry::active(
                    tournament_id,
                    participant.id,
                    participant.score(),
                ))
                .await?;
            }

            let (settled, outcome) = settle(tx.as_mut(), &tournament.key).await?;
            tournament = settled;
            user = tx
                .lock_user(user_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("User", user_id))?;
            settlement = Some(outcome);
        }

        // The fee or payout changed the user's score in every open tournament
        // they play in, this one included while it is still running.
        let ops = match &settlement {
            Some(settlement) => settlement_ops(tx.as_mut(), settlement).await?,
            None => {
                let mut ops = vec![CacheOp::Upsert {
                    namespace: Namespace::Global,
                    user_id,
                    score: user.score(),
                }];
                ops.extend(tournament_score_ops(tx.as_mut(), user_id, user.score()).await?);
                ops
            }
        };

        tx.commit().await?;
        log::debug!("User {} joined tournament {}", user_id, tournament_id);
        self.mirror(ops).await?;

        Ok(JoinOutcome {
            tournament,
            user,
            settlement,
        })
    }

    /// Mark a full (or already finished) tournament as Finished. No prizes
    /// are paid.
    pub async fn end(&self, tournament_id: TournamentId) -> ServiceResult<Tournament> {
        let mut tx = self.store.begin().await?;
        let mut tournament = tx
            .lock_tournament(tournament_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tournament", tournament_id))?;

        if tournament.participant_count() < self.rules.capacity && !tournament.is_finished() {
            return Err(ServiceError::Conflict(
                "tournament cannot be ended".to_string(),
            ));
        }

        if !tournament.is_finished() {
            tournament.status = TournamentStatus::Finished;
            tx.save_tournament(&tournament).await?;
            tx.commit().await?;
            log::info!("Ended tournament {}", tournament_id);
        }
        Ok(tournament)
    }

    /// Rank, pay out and close the tournament identified by `key`.
    pub async fn finalize(&self, key: &str) -> ServiceResult<Settlement> {
        let mut tx = self.store.begin().await?;
        let (_, settlement) = settle(tx.as_mut(), key).await?;
        let ops = settlement_ops(tx.as_mut(), &settlement).await?;
        tx.commit().await?;

        self.mirror(ops).await?;
        Ok(settlement)
    }

    async fn mirror(&self, ops: Vec<CacheOp>) -> ServiceResult<()> {
        self.mirror.apply(ops).await.map_err(ServiceError::from)
    }
}

/// Cache updates implied by a settlement: each paid user's new score goes to
/// the global ranking and to the other open tournaments they play in, and
/// the settled tournament's ranking is dropped.
async fn settlement_ops(
    tx: &mut dyn StoreTx,
    settlement: &Settlement,
) -> ServiceResult<Vec<CacheOp>> {
    let mut ops = Vec::with_capacity(settlement.awards.len() + 1);
    for award in &settlement.awards {
        ops.push(CacheOp::Upsert {
            namespace: Namespace::Global,
            user_id: award.user_id,
            score: award.score,
        });
        ops.extend(tournament_score_ops(tx, award.user_id, award.score).await?);
    }
    ops.push(CacheOp::RemoveNamespace(Namespace::Tournament(
        settlement.tournament_id,
    )));
    Ok(ops)
}

/// Finalize inside an open transaction.
///
/// Active rows are ranked by score descending, earlier rows first on ties.
/// Each ranked user is credited their payout; each row records rank, payout
/// and the score it was ranked by, then turns Passive. Returns the refreshed
/// tournament and the settlement.
async fn settle(tx: &mut dyn StoreTx, key: &str) -> ServiceResult<(Tournament, Settlement)> {
    let mut tournament = tx
        .lock_tournament_by_key(key)
        .await?
        .ok_or_else(|| ServiceError::not_found("Tournament", key))?;

    if tournament.is_finished() {
        return Err(ServiceError::Conflict(
            "tournament is not active".to_string(),
        ));
    }

    let (mut ranked, placeholders): (Vec<_>, Vec<_>) = tx
        .tournament_entries(tournament.id, EntryStatus::Active)
        .await?
        .into_iter()
        .partition(|entry| !entry.is_placeholder());
    ranked.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));

    let mut awards = Vec::with_capacity(ranked.len());
    for (index, mut entry) in ranked.into_iter().enumerate() {
        let Some(user_id) = entry.user_id else {
            continue;
        };
        let rank = index + 1;
        let payout = payout_for(rank, tournament.prize);

        let mut user = tx
            .lock_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;
        user.credit(payout)?;
        tx.save_user(&user).await?;

        entry.rank = Some(i32::try_from(rank).unwrap_or(i32::MAX));
        entry.payout = Some(payout);
        entry.status = EntryStatus::Passive;
        tx.save_entry(&entry).await?;

        awards.push(Award {
            user_id,
            rank,
            payout,
            score: user.score(),
        });
    }

    for mut placeholder in placeholders {
        placeholder.status = EntryStatus::Passive;
        tx.save_entry(&placeholder).await?;
    }

    tournament.status = TournamentStatus::Finished;
    tx.save_tournament(&tournament).await?;

    // Reload so participants carry their post-payout balances.
    let tournament = tx
        .lock_tournament(tournament.id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Tournament", tournament.id))?;

    log::info!(
        "Finalized tournament {}: {} awards from prize {}",
        tournament.id,
        awards.len(),
        tournament.prize
    );

    let settlement = Settlement {
        tournament_id: tournament.id,
        prize: tournament.prize,
        awards,
    };
    Ok((tournament, settlement))
}
