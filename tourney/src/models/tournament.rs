//! Tournament entity and lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ParseStatusError;
use super::user::{User, UserId};
use crate::errors::{ServiceError, ServiceResult};

/// Tournament ID type
pub type TournamentId = i64;

/// Prefix of the human-readable tournament key.
pub const KEY_PREFIX: &str = "leaderboard:";

/// Largest prize a tournament can offer (2^51). The winner's half plus a
/// balance at [`super::user::MAX_MONEY`] stays below
/// [`crate::score::MAX_SCORE`].
pub const MAX_PRIZE: i64 = 1 << 51;

/// Tournament lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentStatus {
    /// Created, accepting participants
    Planned,
    /// In play
    Ongoing,
    /// Closed for joins
    Finished,
}

impl TournamentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TournamentStatus::Planned => "planned",
            TournamentStatus::Ongoing => "ongoing",
            TournamentStatus::Finished => "finished",
        }
    }

    /// Whether moving from `self` to `next` keeps the lifecycle moving forward.
    pub fn can_become(self, next: TournamentStatus) -> bool {
        next >= self
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(TournamentStatus::Planned),
            "ongoing" => Ok(TournamentStatus::Ongoing),
            "finished" => Ok(TournamentStatus::Finished),
            other => Err(ParseStatusError {
                kind: "tournament",
                value: other.to_string(),
            }),
        }
    }
}

/// Tournament with its participants in join order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    /// Human-readable lookup key, distinct from `id`.
    pub key: String,
    pub status: TournamentStatus,
    pub prize: i64,
    pub users: Vec<User>,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    /// Lookup key derived from a tournament name.
    pub fn key_for(name: &str) -> String {
        format!("{KEY_PREFIX}{name}")
    }

    pub fn participant_count(&self) -> usize {
        self.users.len()
    }

    pub fn has_participant(&self, user_id: UserId) -> bool {
        self.users.iter().any(|u| u.id == user_id)
    }

    pub fn is_finished(&self) -> bool {
        self.status == TournamentStatus::Finished
    }
}

fn validate_name(name: &str) -> ServiceResult<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::Validation(
            "tournament name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_prize(prize: i64) -> ServiceResult<()> {
    if prize <= 0 {
        return Err(ServiceError::Validation(
            "tournament prize must be greater than zero".to_string(),
        ));
    }
    if prize > MAX_PRIZE {
        return Err(ServiceError::Validation(format!(
            "tournament prize cannot exceed {MAX_PRIZE}"
        )));
    }
    Ok(())
}

/// Create tournament request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTournamentRequest {
    pub name: String,
    pub prize: i64,
}

impl CreateTournamentRequest {
    /// Validate and return the trimmed name and prize.
    pub fn validate(self) -> ServiceResult<(String, i64)> {
        validate_name(&self.name)?;
        validate_prize(self.prize)?;
        Ok((self.name.trim().to_string(), self.prize))
    }
}

/// Partial tournament update. Omitted fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTournamentRequest {
    pub name: Option<String>,
    pub prize: Option<i64>,
    pub status: Option<TournamentStatus>,
}

impl UpdateTournamentRequest {
    /// Apply the update to a copy of `tournament`.
    ///
    /// Status may only move forward; anything else is a conflict.
    pub fn apply_to(&self, tournament: &Tournament) -> ServiceResult<Tournament> {
        let mut updated = tournament.clone();
        if let Some(name) = &self.name {
            validate_name(name)?;
            updated.name = name.trim().to_string();
            updated.key = Tournament::key_for(&updated.name);
        }
        if let Some(prize) = self.prize {
            validate_prize(prize)?;
            updated.prize = prize;
        }
        if let Some(status) = self.status {
            if !tournament.status.can_become(status) {
                return Err(ServiceError::Conflict(format!(
                    "tournament status cannot move from {} to {}",
                    tournament.status, status
                )));
            }
            updated.status = status;
        }
        Ok(updated)
    }
}

/// Join request
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct JoinRequest {
    pub tournament_id: TournamentId,
    pub user_id: UserId,
}
