//! In-process store.
//!
//! Transactions take the whole state lock and work on a copy, so they are
//! fully serialized and a dropped transaction leaves no trace. Used by tests
//! and by the server's `--memory` mode.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, StoreError, StoreResult, StoreTx};
use crate::models::{
    EntryFilter, EntryId, EntryStatus, LeaderboardEntry, NewEntry, NewUser, Tournament,
    TournamentId, TournamentStatus, User, UserId,
};

#[derive(Debug, Clone)]
struct TournamentRow {
    id: TournamentId,
    name: String,
    key: String,
    status: TournamentStatus,
    prize: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: BTreeMap<UserId, User>,
    tournaments: BTreeMap<TournamentId, TournamentRow>,
    participants: BTreeMap<TournamentId, Vec<UserId>>,
    entries: BTreeMap<EntryId, LeaderboardEntry>,
    last_user_id: UserId,
    last_tournament_id: TournamentId,
    last_entry_id: EntryId,
}

impl MemoryState {
    fn tournament(&self, row: &TournamentRow) -> Tournament {
        let users = self
            .participants
            .get(&row.id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.users.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();

        Tournament {
            id: row.id,
            name: row.name.clone(),
            key: row.key.clone(),
            status: row.status,
            prize: row.prize,
            users,
            created_at: row.created_at,
        }
    }

    fn key_taken(&self, key: &str, except: Option<TournamentId>) -> bool {
        self.tournaments
            .values()
            .any(|t| t.key == key && Some(t.id) != except)
    }
}

/// In-memory [`Store`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next commit fail, as a lost connection would. The failing
    /// transaction is rolled back.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            fail_commit: self.fail_next_commit.clone(),
        }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn truncate_all(&self) -> StoreResult<()> {
        *self.state.lock().await = MemoryState::default();
        Ok(())
    }

    async fn find_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.state.lock().await.users.values().cloned().collect())
    }

    async fn find_tournament(&self, tournament_id: TournamentId) -> StoreResult<Option<Tournament>> {
        let state = self.state.lock().await;
        Ok(state
            .tournaments
            .get(&tournament_id)
            .map(|row| state.tournament(row)))
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> StoreResult<Vec<Tournament>> {
        let state = self.state.lock().await;
        Ok(state
            .tournaments
            .values()
            .filter(|row| status.is_none_or(|s| row.status == s))
            .map(|row| state.tournament(row))
            .collect())
    }

    async fn list_entries(&self, filter: EntryFilter) -> StoreResult<Vec<LeaderboardEntry>> {
        let state = self.state.lock().await;
        let mut entries: Vec<LeaderboardEntry> = state
            .entries
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            a.tournament_id
                .cmp(&b.tournament_id)
                .then_with(|| match (a.rank, b.rank) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .then_with(|| b.score.cmp(&a.score))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(entries)
    }
}

/// Transaction over [`MemoryStore`].
struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_commit: Arc<AtomicBool>,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User> {
        self.working.last_user_id += 1;
        let user = User::from_parts(
            self.working.last_user_id,
            user.name.clone(),
            user.money,
            user.level,
            Utc::now(),
        );
        self.working.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn lock_user(&mut self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.working.users.get(&user_id).cloned())
    }

    async fn save_user(&mut self, user: &User) -> StoreResult<()> {
        match self.working.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!("user {} vanished", user.id))),
        }
    }

    async fn delete_user(&mut self, user_id: UserId) -> StoreResult<bool> {
        if self.working.users.remove(&user_id).is_none() {
            return Ok(false);
        }
        for ids in self.working.participants.values_mut() {
            ids.retain(|id| *id != user_id);
        }
        self.working
            .entries
            .retain(|_, e| e.user_id != Some(user_id));
        Ok(true)
    }

    async fn insert_tournament(
        &mut self,
        name: &str,
        key: &str,
        prize: i64,
    ) -> StoreResult<Tournament> {
        if self.working.key_taken(key, None) {
            return Err(StoreError::Duplicate("tournament key".to_string()));
        }
        self.working.last_tournament_id += 1;
        let row = TournamentRow {
            id: self.working.last_tournament_id,
            name: name.to_string(),
            key: key.to_string(),
            status: TournamentStatus::Planned,
            prize,
            created_at: Utc::now(),
        };
        let tournament = self.working.tournament(&row);
        self.working.tournaments.insert(row.id, row);
        Ok(tournament)
    }

    async fn lock_tournament(
        &mut self,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<Tournament>> {
        Ok(self
            .working
            .tournaments
            .get(&tournament_id)
            .map(|row| self.working.tournament(row)))
    }

    async fn lock_tournament_by_key(&mut self, key: &str) -> StoreResult<Option<Tournament>> {
        Ok(self
            .working
            .tournaments
            .values()
            .find(|row| row.key == key)
            .map(|row| self.working.tournament(row)))
    }

    async fn save_tournament(&mut self, tournament: &Tournament) -> StoreResult<()> {
        if self.working.key_taken(&tournament.key, Some(tournament.id)) {
            return Err(StoreError::Duplicate("tournament key".to_string()));
        }
        let row = self
            .working
            .tournaments
            .get_mut(&tournament.id)
            .ok_or_else(|| StoreError::Backend(format!("tournament {} vanished", tournament.id)))?;
        row.name = tournament.name.clone();
        row.key = tournament.key.clone();
        row.status = tournament.status;
        row.prize = tournament.prize;
        Ok(())
    }

    async fn delete_tournament(&mut self, tournament_id: TournamentId) -> StoreResult<bool> {
        if self.working.tournaments.remove(&tournament_id).is_none() {
            return Ok(false);
        }
        self.working.participants.remove(&tournament_id);
        self.working
            .entries
            .retain(|_, e| e.tournament_id != tournament_id);
        Ok(true)
    }

    async fn add_participant(
        &mut self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> StoreResult<()> {
        let ids = self.working.participants.entry(tournament_id).or_default();
        if ids.contains(&user_id) {
            return Err(StoreError::Duplicate("tournament participant".to_string()));
        }
        ids.push(user_id);
        Ok(())
    }

    async fn open_tournaments_of(&mut self, user_id: UserId) -> StoreResult<Vec<TournamentId>> {
        let state = &self.working;
        Ok(state
            .participants
            .iter()
            .filter(|(id, users)| {
                users.contains(&user_id)
                    && state
                        .tournaments
                        .get(id)
                        .is_some_and(|t| t.status != TournamentStatus::Finished)
            })
            .map(|(id, _)| *id)
            .collect())
    }

    async fn insert_entry(&mut self, entry: &NewEntry) -> StoreResult<LeaderboardEntry> {
        self.working.last_entry_id += 1;
        let entry = LeaderboardEntry {
            id: self.working.last_entry_id,
            user_id: entry.user_id,
            tournament_id: entry.tournament_id,
            score: entry.score,
            status: entry.status,
            rank: None,
            payout: None,
        };
        self.working.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn tournament_entries(
        &mut self,
        tournament_id: TournamentId,
        status: EntryStatus,
    ) -> StoreResult<Vec<LeaderboardEntry>> {
        Ok(self
            .working
            .entries
            .values()
            .filter(|e| e.tournament_id == tournament_id && e.status == status)
            .cloned()
            .collect())
    }

    async fn save_entry(&mut self, entry: &LeaderboardEntry) -> StoreResult<()> {
        match self.working.entries.get_mut(&entry.id) {
            Some(existing) => {
                *existing = entry.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!(
                "leaderboard entry {} vanished",
                entry.id
            ))),
        }
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx {
            mut guard,
            working,
            fail_commit,
        } = *self;
        if fail_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected commit failure".to_string()));
        }
        *guard = working;
        Ok(())
    }
}
