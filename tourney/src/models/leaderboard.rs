//! Durable leaderboard rows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ParseStatusError;
use super::tournament::TournamentId;
use super::user::UserId;

/// Leaderboard entry ID type
pub type EntryId = i64;

/// Whether a row belongs to a live tournament or is archived history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Active,
    Passive,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Active => "active",
            EntryStatus::Passive => "passive",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EntryStatus::Active),
            "passive" => Ok(EntryStatus::Passive),
            other => Err(ParseStatusError {
                kind: "leaderboard",
                value: other.to_string(),
            }),
        }
    }
}

/// Leaderboard row.
///
/// Rows without a `user_id` are the placeholder created with the tournament.
/// `rank` and `payout` are recorded when the tournament is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub id: EntryId,
    pub user_id: Option<UserId>,
    pub tournament_id: TournamentId,
    pub score: i64,
    pub status: EntryStatus,
    pub rank: Option<i32>,
    pub payout: Option<i64>,
}

impl LeaderboardEntry {
    pub fn is_placeholder(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Row to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub user_id: Option<UserId>,
    pub tournament_id: TournamentId,
    pub score: i64,
    pub status: EntryStatus,
}

impl NewEntry {
    /// Empty row anchoring a freshly created tournament's leaderboard.
    pub fn placeholder(tournament_id: TournamentId) -> Self {
        Self {
            user_id: None,
            tournament_id,
            score: 0,
            status: EntryStatus::Active,
        }
    }

    pub fn active(tournament_id: TournamentId, user_id: UserId, score: i64) -> Self {
        Self {
            user_id: Some(user_id),
            tournament_id,
            score,
            status: EntryStatus::Active,
        }
    }
}

/// Filter for leaderboard reads. Placeholder rows never match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub tournament_id: Option<TournamentId>,
    pub user_id: Option<UserId>,
    pub status: Option<EntryStatus>,
}

impl EntryFilter {
    pub fn status(status: EntryStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn tournament(mut self, tournament_id: TournamentId) -> Self {
        self.tournament_id = Some(tournament_id);
        self
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn matches(&self, entry: &LeaderboardEntry) -> bool {
        !entry.is_placeholder()
            && self.tournament_id.is_none_or(|id| entry.tournament_id == id)
            && self.user_id.is_none_or(|id| entry.user_id == Some(id))
            && self.status.is_none_or(|s| entry.status == s)
    }
}
