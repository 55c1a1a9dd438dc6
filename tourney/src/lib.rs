//! # Tourney
//!
//! Tournament lifecycle and leaderboard consistency engine.
//!
//! Users accrue money and levels, join tournaments for a fixed entry fee and
//! are ranked on leaderboards. A tournament finishes when its last seat is
//! taken and pays its prize out by rank.
//!
//! Two backends hold the data:
//!
//! - the durable [`store`] (PostgreSQL, or memory for tests) is the system
//!   of record, written only inside transactions;
//! - the [`cache`] keeps ranked sorted sets (Redis, or memory) for fast
//!   top-N reads.
//!
//! Services commit to the store first and then push the implied cache
//! changes through a [`mirror::CacheMirror`]. A cache failure after commit is
//! reported as [`ServiceError::Cache`] and logged as drift.
//!
//! ## Core Modules
//!
//! - [`tournament`]: create/update/delete, join, end and finalize
//! - [`user`]: user CRUD and level-up
//! - [`leaderboard`]: read-side projections
//! - [`maintenance`]: health and wipe
//! - [`score`]: the score policy
//!
//! ## Example
//!
//! ```
//! use tourney::Services;
//! use tourney::models::CreateUserRequest;
//! use tourney::tournament::TournamentRules;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), tourney::ServiceError> {
//! let services = Services::in_memory(TournamentRules::default());
//! let ada = services
//!     .users
//!     .create(CreateUserRequest { name: "ada".into(), money: 1000, level: 1 })
//!     .await?;
//!
//! let ada = services.users.level_up(ada.id).await?;
//! assert_eq!(ada.score(), 1050);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod db;
pub mod errors;
pub mod leaderboard;
pub mod maintenance;
pub mod mirror;
pub mod models;
pub mod score;
pub mod services;
pub mod store;
pub mod tournament;
pub mod user;

pub use errors::{ErrorKind, ServiceError, ServiceResult};
pub use services::Services;
