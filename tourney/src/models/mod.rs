//! Domain entities and the typed requests that create or change them.

pub mod leaderboard;
pub mod tournament;
pub mod user;

pub use leaderboard::{EntryFilter, EntryId, EntryStatus, LeaderboardEntry, NewEntry};
pub use tournament::{
    CreateTournamentRequest, JoinRequest, MAX_PRIZE, Tournament, TournamentId, TournamentStatus,
    UpdateTournamentRequest,
};
pub use user::{
    CreateUserRequest, MAX_LEVEL, MAX_MONEY, NewUser, UpdateUserRequest, User, UserId,
};

/// Error produced when a status string read from storage is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} status: {value}")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}
