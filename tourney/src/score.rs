//! Score policy.
//!
//! A user's score is derived from level and money and is never stored
//! independently of them. Both the durable leaderboard rows and the ranked
//! cache take their values from [`score`].

/// Weight of one level, in money units.
pub const LEVEL_WEIGHT: i64 = 100;

/// Largest score the ranked cache carries exactly (2^53, the `f64` mantissa).
pub const MAX_SCORE: i64 = 1 << 53;

/// Derive a score from a level and a money balance.
///
/// Saturates instead of overflowing; values built through
/// [`checked_score`] never get near the limit.
///
/// # Examples
///
/// ```
/// use tourney::score::score;
///
/// assert_eq!(score(2, 850), 1050);
/// ```
pub fn score(level: i32, money: i64) -> i64 {
    i64::from(level)
        .saturating_mul(LEVEL_WEIGHT)
        .saturating_add(money)
}

/// Score for `level` and `money`, or `None` when it falls outside
/// `0..=MAX_SCORE`.
pub fn checked_score(level: i32, money: i64) -> Option<i64> {
    i64::from(level)
        .checked_mul(LEVEL_WEIGHT)?
        .checked_add(money)
        .filter(|score| (0..=MAX_SCORE).contains(score))
}

/// Score as carried by the ranked cache.
#[allow(clippy::cast_precision_loss)]
pub fn cache_score(score: i64) -> f64 {
    score as f64
}

/// Score read back from the ranked cache.
#[allow(clippy::cast_possible_truncation)]
pub fn from_cache_score(score: f64) -> i64 {
    score as i64
}
