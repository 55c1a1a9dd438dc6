//! Durable store: the relational system of record.
//!
//! Every write goes through a [`StoreTx`] obtained from [`Store::begin`]. The
//! transaction is a scoped guard: [`StoreTx::commit`] publishes its writes,
//! and dropping it on any other path (an early `?` return, a panic unwinding
//! through the caller) rolls everything back. Readers never observe partial
//! writes.
//!
//! ## Example
//!
//! ```no_run
//! use tourney::store::{MemoryStore, Store};
//! use tourney::models::CreateUserRequest;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let new_user = CreateUserRequest { name: "ada".into(), money: 100, level: 1 }.validate()?;
//!
//! let mut tx = store.begin().await?;
//! let user = tx.insert_user(&new_user).await?;
//! tx.commit().await?;
//!
//! assert!(store.find_user(user.id).await?.is_some());
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod memory;
pub mod postgres;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::models::{
    EntryFilter, EntryStatus, LeaderboardEntry, NewEntry, NewUser, Tournament, TournamentId,
    TournamentStatus, User, UserId,
};

/// Read access and transaction factory for the durable store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a write transaction.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    /// Check connectivity.
    async fn ping(&self) -> StoreResult<()>;

    /// Remove every row and restart identities.
    async fn truncate_all(&self) -> StoreResult<()>;

    async fn find_user(&self, user_id: UserId) -> StoreResult<Option<User>>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Find a tournament with its participants eagerly loaded.
    async fn find_tournament(&self, tournament_id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// List tournaments with participants, optionally filtered by status.
    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> StoreResult<Vec<Tournament>>;

    /// Leaderboard rows matching `filter`, placeholders excluded, ordered by
    /// tournament, then rank, then score descending.
    async fn list_entries(&self, filter: EntryFilter) -> StoreResult<Vec<LeaderboardEntry>>;
}

/// An open write transaction.
///
/// `lock_*` methods hold a row lock until the transaction ends.
#[async_trait]
pub trait StoreTx: Send {
    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User>;

    async fn lock_user(&mut self, user_id: UserId) -> StoreResult<Option<User>>;

    /// Persist name, money, level and the derived score.
    async fn save_user(&mut self, user: &User) -> StoreResult<()>;

    /// Returns `false` when no row was deleted.
    async fn delete_user(&mut self, user_id: UserId) -> StoreResult<bool>;

    async fn insert_tournament(
        &mut self,
        name: &str,
        key: &str,
        prize: i64,
    ) -> StoreResult<Tournament>;

    async fn lock_tournament(
        &mut self,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<Tournament>>;

    /// Lock a tournament by its human-readable key.
    async fn lock_tournament_by_key(&mut self, key: &str) -> StoreResult<Option<Tournament>>;

    /// Persist name, key, prize and status. Participants are untouched.
    async fn save_tournament(&mut self, tournament: &Tournament) -> StoreResult<()>;

    async fn delete_tournament(&mut self, tournament_id: TournamentId) -> StoreResult<bool>;

    /// Append a participant after the existing ones.
    async fn add_participant(
        &mut self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> StoreResult<()>;

    /// Tournaments not yet Finished that the user participates in.
    async fn open_tournaments_of(&mut self, user_id: UserId) -> StoreResult<Vec<TournamentId>>;

    async fn insert_entry(&mut self, entry: &NewEntry) -> StoreResult<LeaderboardEntry>;

    /// Every row of a tournament with the given status, placeholders
    /// included, in insertion order.
    async fn tournament_entries(
        &mut self,
        tournament_id: TournamentId,
        status: EntryStatus,
    ) -> StoreResult<Vec<LeaderboardEntry>>;

    /// Persist score, status, rank and payout.
    async fn save_entry(&mut self, entry: &LeaderboardEntry) -> StoreResult<()>;

    /// Publish every write made through this transaction.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
