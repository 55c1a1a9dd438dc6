//! PostgreSQL store.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Row, Transaction};
use std::collections::HashMap;
use std::sync::Arc;

use super::{Store, StoreError, StoreResult, StoreTx};
use crate::db::timeouts::{DEFAULT_QUERY_TIMEOUT, with_timeout};
use crate::models::{
    EntryFilter, EntryStatus, LeaderboardEntry, NewEntry, NewUser, Tournament, TournamentId,
    TournamentStatus, User, UserId,
};

const USER_COLUMNS: &str = "id, name, money, level, created_at";
const TOURNAMENT_COLUMNS: &str = "id, name, lookup_key, status, prize, created_at";
const ENTRY_COLUMNS: &str = "id, user_id, tournament_id, score, status, final_rank, payout";

fn user_from_row(row: &PgRow) -> User {
    User::from_parts(
        row.get("id"),
        row.get("name"),
        row.get("money"),
        row.get("level"),
        row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    )
}

fn tournament_from_row(row: &PgRow, users: Vec<User>) -> StoreResult<Tournament> {
    let status: TournamentStatus = row.get::<String, _>("status").parse()?;
    Ok(Tournament {
        id: row.get("id"),
        name: row.get("name"),
        key: row.get("lookup_key"),
        status,
        prize: row.get("prize"),
        users,
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    })
}

fn entry_from_row(row: &PgRow) -> StoreResult<LeaderboardEntry> {
    let status: EntryStatus = row.get::<String, _>("status").parse()?;
    Ok(LeaderboardEntry {
        id: row.get("id"),
        user_id: row.get("user_id"),
        tournament_id: row.get("tournament_id"),
        score: row.get("score"),
        status,
        rank: row.get("final_rank"),
        payout: row.get("payout"),
    })
}

/// Turn unique violations into [`StoreError::Duplicate`].
fn map_unique(err: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate(what.to_string());
        }
    }
    StoreError::Database(err)
}

async fn fetch_participants<'e, E>(executor: E, tournament_id: TournamentId) -> StoreResult<Vec<User>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query(
        r#"
        SELECT u.id, u.name, u.money, u.level, u.created_at
        FROM tournament_users tu
        JOIN users u ON u.id = tu.user_id
        WHERE tu.tournament_id = $1
        ORDER BY tu.seq
        "#,
    )
    .bind(tournament_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.iter().map(user_from_row).collect())
}

/// [`Store`] backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    /// Create a store over an existing pool
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTx { tx }))
    }

    async fn ping(&self) -> StoreResult<()> {
        with_timeout(
            DEFAULT_QUERY_TIMEOUT,
            sqlx::query("SELECT 1").execute(self.pool.as_ref()),
        )
        .await?;
        Ok(())
    }

    async fn truncate_all(&self) -> StoreResult<()> {
        sqlx::query(
            "TRUNCATE TABLE leaderboards, tournament_users, tournaments, users RESTART IDENTITY CASCADE",
        )
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn find_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(self.pool.as_ref())
            .await?;
        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn find_tournament(&self, tournament_id: TournamentId) -> StoreResult<Option<Tournament>> {
        let Some(row) = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1"
        ))
        .bind(tournament_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        else {
            return Ok(None);
        };

        let users = fetch_participants(self.pool.as_ref(), tournament_id).await?;
        tournament_from_row(&row, users).map(Some)
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> StoreResult<Vec<Tournament>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE status = $1 ORDER BY id"
                ))
                .bind(status.as_str())
                .fetch_all(self.pool.as_ref())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {TOURNAMENT_COLUMNS} FROM tournaments ORDER BY id"
                ))
                .fetch_all(self.pool.as_ref())
                .await?
            }
        };

        // One round trip for every participant list.
        let participant_rows = sqlx::query(
            r#"
            SELECT tu.tournament_id, u.id, u.name, u.money, u.level, u.created_at
            FROM tournament_users tu
            JOIN users u ON u.id = tu.user_id
            ORDER BY tu.tournament_id, tu.seq
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        let mut participants: HashMap<TournamentId, Vec<User>> = HashMap::new();
        for row in &participant_rows {
            participants
                .entry(row.get("tournament_id"))
                .or_default()
                .push(user_from_row(row));
        }

        rows.iter()
            .map(|row| {
                let id: TournamentId = row.get("id");
                tournament_from_row(row, participants.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn list_entries(&self, filter: EntryFilter) -> StoreResult<Vec<LeaderboardEntry>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {ENTRY_COLUMNS} FROM leaderboards WHERE user_id IS NOT NULL"
        ));
        if let Some(tournament_id) = filter.tournament_id {
            query.push(" AND tournament_id = ").push_bind(tournament_id);
        }
        if let Some(user_id) = filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY tournament_id, final_rank NULLS LAST, score DESC, id");

        let rows = query.build().fetch_all(self.pool.as_ref()).await?;
        rows.iter().map(entry_from_row).collect()
    }
}

/// Transaction over [`PgStore`]. Dropping it without commit rolls back.
struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (name, money, level, score) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.name)
        .bind(user.money)
        .bind(user.level)
        .bind(user.score())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(user_from_row(&row))
    }

    async fn lock_user(&mut self, user_id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn save_user(&mut self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $1, money = $2, level = $3, score = $4, updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(&user.name)
        .bind(user.money)
        .bind(user.level)
        .bind(user.score())
        .bind(user.id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(format!("user {} vanished", user.id)));
        }
        Ok(())
    }

    async fn delete_user(&mut self, user_id: UserId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_tournament(
        &mut self,
        name: &str,
        key: &str,
        prize: i64,
    ) -> StoreResult<Tournament> {
        let row = sqlx::query(&format!(
            "INSERT INTO tournaments (name, lookup_key, status, prize) VALUES ($1, $2, $3, $4) RETURNING {TOURNAMENT_COLUMNS}"
        ))
        .bind(name)
        .bind(key)
        .bind(TournamentStatus::Planned.as_str())
        .bind(prize)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_unique(e, "tournament key"))?;

        tournament_from_row(&row, Vec::new())
    }

    async fn lock_tournament(
        &mut self,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<Tournament>> {
        let Some(row) = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1 FOR UPDATE"
        ))
        .bind(tournament_id)
        .fetch_optional(&mut *self.tx)
        .await?
        else {
            return Ok(None);
        };

        let users = fetch_participants(&mut *self.tx, tournament_id).await?;
        tournament_from_row(&row, users).map(Some)
    }

    async fn lock_tournament_by_key(&mut self, key: &str) -> StoreResult<Option<Tournament>> {
        let Some(row) = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE lookup_key = $1 FOR UPDATE"
        ))
        .bind(key)
        .fetch_optional(&mut *self.tx)
        .await?
        else {
            return Ok(None);
        };

        let tournament_id: TournamentId = row.get("id");
        let users = fetch_participants(&mut *self.tx, tournament_id).await?;
        tournament_from_row(&row, users).map(Some)
    }

    async fn save_tournament(&mut self, tournament: &Tournament) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tournaments
            SET name = $1, lookup_key = $2, prize = $3, status = $4, updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(&tournament.name)
        .bind(&tournament.key)
        .bind(tournament.prize)
        .bind(tournament.status.as_str())
        .bind(tournament.id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique(e, "tournament key"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(format!(
                "tournament {} vanished",
                tournament.id
            )));
        }
        Ok(())
    }

    async fn delete_tournament(&mut self, tournament_id: TournamentId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tournaments WHERE id = $1")
            .bind(tournament_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_participant(
        &mut self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> StoreResult<()> {
        sqlx::query("INSERT INTO tournament_users (tournament_id, user_id) VALUES ($1, $2)")
            .bind(tournament_id)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_unique(e, "tournament participant"))?;
        Ok(())
    }

    async fn open_tournaments_of(&mut self, user_id: UserId) -> StoreResult<Vec<TournamentId>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id
            FROM tournament_users tu
            JOIN tournaments t ON t.id = tu.tournament_id
            WHERE tu.user_id = $1 AND t.status <> 'finished'
            ORDER BY t.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn insert_entry(&mut self, entry: &NewEntry) -> StoreResult<LeaderboardEntry> {
        let row = sqlx::query(&format!(
            "INSERT INTO leaderboards (user_id, tournament_id, score, status) VALUES ($1, $2, $3, $4) RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(entry.user_id)
        .bind(entry.tournament_id)
        .bind(entry.score)
        .bind(entry.status.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        entry_from_row(&row)
    }

    async fn tournament_entries(
        &mut self,
        tournament_id: TournamentId,
        status: EntryStatus,
    ) -> StoreResult<Vec<LeaderboardEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM leaderboards WHERE tournament_id = $1 AND status = $2 ORDER BY id FOR UPDATE"
        ))
        .bind(tournament_id)
        .bind(status.as_str())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn save_entry(&mut self, entry: &LeaderboardEntry) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE leaderboards
            SET score = $1, status = $2, final_rank = $3, payout = $4, updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(entry.score)
        .bind(entry.status.as_str())
        .bind(entry.rank)
        .bind(entry.payout)
        .bind(entry.id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(format!(
                "leaderboard entry {} vanished",
                entry.id
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
