//! Tournament lifecycle engine.
//!
//! A tournament moves forward only: Planned, then optionally Ongoing (set
//! through [`TournamentManager::update`]), then Finished. Joining costs the
//! entry fee; the join that fills the last seat finishes the tournament and
//! settles it in the same transaction.
//!
//! ## Example
//!
//! ```no_run
//! use tourney::cache::MemoryRankedCache;
//! use tourney::mirror::BestEffortMirror;
//! use tourney::models::{CreateTournamentRequest, JoinRequest};
//! use tourney::store::MemoryStore;
//! use tourney::tournament::{TournamentManager, TournamentRules};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), tourney::ServiceError> {
//! let store = Arc::new(MemoryStore::new());
//! let mirror = Arc::new(BestEffortMirror::new(Arc::new(MemoryRankedCache::new())));
//! let tournaments = TournamentManager::new(store, mirror, TournamentRules::default());
//!
//! let spring = tournaments
//!     .create(CreateTournamentRequest { name: "spring".into(), prize: 1000 })
//!     .await?;
//! let outcome = tournaments
//!     .join(JoinRequest { tournament_id: spring.id, user_id: 1 })
//!     .await?;
//! println!("{} seats taken", outcome.tournament.participant_count());
//! # Ok(())
//! # }
//! ```

pub mod manager;
pub mod payout;

pub use manager::{
    Award, ENTRY_FEE, JoinOutcome, MAX_PARTICIPANTS, Settlement, TournamentManager,
    TournamentRules,
};
pub use payout::{payout_for, payouts};
