//! Leaderboard read side.
//!
//! The global ranking comes from the ranked cache; per-tournament and
//! per-user views come from the durable leaderboard rows.

pub mod projection;

pub use projection::{DEFAULT_START, DEFAULT_STOP, LeaderboardProjection, RankWindow};
