//! Prize split by final rank.

/// Share of the prize paid to a 1-based rank.
///
/// Rank 1 takes half, rank 2 a quarter, rank 3 an eighth and every rank
/// after that a sixteenth. Amounts truncate toward zero.
///
/// ```
/// use tourney::tournament::payout_for;
///
/// assert_eq!(payout_for(1, 1000), 500);
/// assert_eq!(payout_for(7, 1000), 62);
/// ```
pub fn payout_for(rank: usize, prize: i64) -> i64 {
    match rank {
        0 => 0,
        1 => prize / 2,
        2 => prize / 4,
        3 => prize / 8,
        _ => prize / 16,
    }
}

/// Payouts for ranks `1..=entrants`.
pub fn payouts(prize: i64, entrants: usize) -> Vec<i64> {
    (1..=entrants).map(|rank| payout_for(rank, prize)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_four_entrants() {
        assert_eq!(payouts(1000, 4), vec![500, 250, 125, 62]);
    }

    #[test]
    fn test_tail_ranks_share_sixteenth() {
        let split = payouts(2000, 10);
        assert_eq!(split[0], 1000);
        assert!(split[3..].iter().all(|&p| p == 125));
    }

    #[test]
    fn test_rank_zero_pays_nothing() {
        assert_eq!(payout_for(0, 1000), 0);
    }

    #[test]
    fn test_small_prize_truncates() {
        assert_eq!(payouts(3, 4), vec![1, 0, 0, 0]);
    }

    proptest! {
        #[test]
        fn prop_payouts_never_increase_with_rank(prize in 1i64..10_000_000, entrants in 1usize..64) {
            let split = payouts(prize, entrants);
            prop_assert!(split.windows(2).all(|w| w[0] >= w[1]));
        }

        #[test]
        fn prop_top_three_stay_within_prize(prize in 1i64..10_000_000) {
            let top: i64 = payouts(prize, 3).iter().sum();
            prop_assert!(top <= prize);
        }
    }
}
