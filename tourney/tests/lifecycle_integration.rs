//! Integration tests for the tournament lifecycle on in-memory backends.
//!
//! Covers joins, capacity-triggered settlement, manual finalize, level-up,
//! rollback on a failed commit and cache drift after a committed change.

use std::sync::Arc;

use tourney::cache::{MemoryRankedCache, Namespace, RankedCache};
use tourney::leaderboard::RankWindow;
use tourney::models::{
    CreateTournamentRequest, CreateUserRequest, EntryFilter, EntryStatus, JoinRequest, MAX_LEVEL,
    MAX_MONEY, MAX_PRIZE, Tournament, TournamentStatus, UpdateUserRequest, User,
};
use tourney::score::{MAX_SCORE, score};
use tourney::store::{MemoryStore, Store};
use tourney::tournament::TournamentRules;
use tourney::{ServiceError, Services};

struct Harness {
    store: Arc<MemoryStore>,
    cache: Arc<MemoryRankedCache>,
    services: Services,
}

fn harness_with(rules: TournamentRules) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryRankedCache::new());
    let services = Services::new(store.clone(), cache.clone(), rules);
    Harness {
        store,
        cache,
        services,
    }
}

fn harness() -> Harness {
    harness_with(TournamentRules::default())
}

impl Harness {
    async fn user(&self, name: &str, money: i64, level: i32) -> User {
        self.services
            .users
            .create(CreateUserRequest {
                name: name.to_string(),
                money,
                level,
            })
            .await
            .unwrap()
    }

    async fn tournament(&self, name: &str, prize: i64) -> Tournament {
        self.services
            .tournaments
            .create(CreateTournamentRequest {
                name: name.to_string(),
                prize,
            })
            .await
            .unwrap()
    }

    async fn join(&self, tournament: &Tournament, user: &User) -> Result<tourney::tournament::JoinOutcome, ServiceError> {
        self.services
            .tournaments
            .join(JoinRequest {
                tournament_id: tournament.id,
                user_id: user.id,
            })
            .await
    }
}

fn assert_score_invariant(user: &User) {
    assert_eq!(user.score(), score(user.level, user.money), "{user:?}");
}

#[tokio::test]
async fn test_score_invariant_across_operations() {
    let h = harness_with(TournamentRules {
        entry_fee: 50,
        capacity: 2,
    });

    let ada = h.user("ada", 1000, 1).await;
    assert_score_invariant(&ada);

    let ada = h
        .services
        .users
        .update(
            ada.id,
            UpdateUserRequest {
                money: Some(900),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_score_invariant(&ada);

    let ada = h.services.users.level_up(ada.id).await.unwrap();
    assert_score_invariant(&ada);

    let cup = h.tournament("cup", 400).await;
    let outcome = h.join(&cup, &ada).await.unwrap();
    assert_score_invariant(&outcome.user);

    let bob = h.user("bob", 60, 0).await;
    let outcome = h.join(&cup, &bob).await.unwrap();
    assert!(outcome.settlement.is_some());

    for user in h.services.users.list().await.unwrap() {
        assert_score_invariant(&user);
    }
}

#[tokio::test]
async fn test_extreme_balances_are_rejected_or_exact() {
    let h = harness_with(TournamentRules {
        entry_fee: 50,
        capacity: 2,
    });

    let overflow = h
        .services
        .users
        .create(CreateUserRequest {
            name: "overflow".to_string(),
            money: i64::MAX,
            level: 1,
        })
        .await;
    assert!(matches!(overflow, Err(ServiceError::Validation(_))));

    let whale = h.user("whale", MAX_MONEY, MAX_LEVEL).await;
    let minnow = h.user("minnow", 100, 0).await;
    let cup = h.tournament("cup", MAX_PRIZE).await;
    h.join(&cup, &whale).await.unwrap();
    let outcome = h.join(&cup, &minnow).await.unwrap();

    let settlement = outcome.settlement.unwrap();
    assert_eq!(settlement.awards[0].user_id, whale.id);
    assert_eq!(settlement.awards[0].payout, MAX_PRIZE / 2);

    let whale = h.services.users.get(whale.id).await.unwrap();
    assert_eq!(whale.money, MAX_MONEY - 50 + MAX_PRIZE / 2);
    assert_score_invariant(&whale);
    assert!(whale.score() <= MAX_SCORE);
    assert_eq!(
        h.cache.score(Namespace::Global, whale.id).await.unwrap(),
        Some(whale.score())
    );
}

#[tokio::test]
async fn test_tournament_ranking_follows_score_changes() {
    let h = harness();
    let cup = h.tournament("cup", 1000).await;
    let ada = h.user("ada", 1000, 1).await;
    h.join(&cup, &ada).await.unwrap();

    let ada = h.services.users.level_up(ada.id).await.unwrap();
    assert_eq!(ada.score(), 1000);
    assert_eq!(
        h.cache.score(Namespace::Global, ada.id).await.unwrap(),
        Some(1000)
    );
    assert_eq!(
        h.cache
            .score(Namespace::Tournament(cup.id), ada.id)
            .await
            .unwrap(),
        Some(1000)
    );

    let ranking = h
        .services
        .leaderboard
        .tournament_ranking(cup.id, RankWindow::default())
        .await
        .unwrap();
    assert_eq!(ranking.len(), 1);
    assert_eq!(ranking[0].score, 1000);
}

#[tokio::test]
async fn test_join_charges_exactly_entry_fee() {
    let h = harness();
    let cup = h.tournament("cup", 1000).await;
    let ada = h.user("ada", 300, 2).await;

    let outcome = h.join(&cup, &ada).await.unwrap();
    assert_eq!(outcome.user.money, 250);
    assert_eq!(outcome.tournament.participant_count(), 1);

    let stored = h.services.tournaments.get(cup.id).await.unwrap();
    assert_eq!(stored.users.len(), 1);
    assert_eq!(stored.users[0].id, ada.id);
    assert_eq!(stored.status, TournamentStatus::Planned);
}

#[tokio::test]
async fn test_capacity_finishes_and_pays_top_scorer() {
    let h = harness();
    let cup = h.tournament("cup", 2000).await;

    let mut players = Vec::new();
    for i in 0..10 {
        players.push(h.user(&format!("p{i}"), 100 + i * 25, 2).await);
    }
    // Highest score joins first
    players.reverse();
    let top = players[0].clone();

    let mut last = None;
    for player in &players {
        last = Some(h.join(&cup, player).await.unwrap());
    }
    let outcome = last.unwrap();
    assert_eq!(outcome.tournament.status, TournamentStatus::Finished);
    assert_eq!(outcome.tournament.participant_count(), 10);

    let settlement = outcome.settlement.unwrap();
    assert_eq!(settlement.awards[0].user_id, top.id);
    assert_eq!(settlement.awards[0].payout, 1000);

    let top_after = h.services.users.get(top.id).await.unwrap();
    assert_eq!(top_after.money, top.money - 50 + 1000);

    let late = h.user("late", 500, 0).await;
    let result = h.join(&cup, &late).await;
    assert!(
        matches!(result, Err(ServiceError::Conflict(ref m)) if m == "cannot join a finished tournament")
    );
    assert_eq!(h.services.users.get(late.id).await.unwrap().money, 500);
    assert_eq!(
        h.services.tournaments.get(cup.id).await.unwrap().participant_count(),
        10
    );
}

#[tokio::test]
async fn test_four_entrants_split_prize() {
    let h = harness_with(TournamentRules {
        entry_fee: 50,
        capacity: 4,
    });
    let cup = h.tournament("cup", 1000).await;

    for (i, money) in [400, 300, 200, 100].into_iter().enumerate() {
        let user = h.user(&format!("p{i}"), money, 0).await;
        h.join(&cup, &user).await.unwrap();
    }

    let finished = h
        .services
        .leaderboard
        .finished_by_tournament(cup.id)
        .await
        .unwrap();
    let payouts: Vec<i64> = finished.iter().filter_map(|e| e.payout).collect();
    assert_eq!(payouts, vec![500, 250, 125, 62]);
    let ranks: Vec<i32> = finished.iter().filter_map(|e| e.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_finalize_leaves_only_passive_snapshot() {
    let h = harness_with(TournamentRules {
        entry_fee: 50,
        capacity: 3,
    });
    let cup = h.tournament("cup", 800).await;
    let mut ids = Vec::new();
    for i in 0..3 {
        let user = h.user(&format!("p{i}"), 100, i).await;
        ids.push(user.id);
        h.join(&cup, &user).await.unwrap();
    }

    let active = h
        .services
        .leaderboard
        .active_by_tournament(cup.id)
        .await
        .unwrap();
    assert!(active.is_empty());

    let finished = h
        .services
        .leaderboard
        .finished_by_tournament(cup.id)
        .await
        .unwrap();
    assert_eq!(finished.len(), 3);
    assert!(finished.iter().all(|e| e.status == EntryStatus::Passive));
    let mut finished_users: Vec<_> = finished.iter().filter_map(|e| e.user_id).collect();
    finished_users.sort_unstable();
    assert_eq!(finished_users, ids);

    // The tournament namespace is gone; the global one holds final scores.
    assert!(h
        .cache
        .range(Namespace::Tournament(cup.id), 0, 9)
        .await
        .unwrap()
        .is_empty());
    for id in ids {
        let user = h.services.users.get(id).await.unwrap();
        assert_eq!(
            h.cache.score(Namespace::Global, id).await.unwrap(),
            Some(user.score())
        );
    }
}

#[tokio::test]
async fn test_manual_finalize_by_key() {
    let h = harness();
    let cup = h.tournament("cup", 1000).await;
    let ada = h.user("ada", 200, 0).await;
    h.join(&cup, &ada).await.unwrap();

    let settlement = h.services.tournaments.finalize(&cup.key).await.unwrap();
    // Active rows only exist once a tournament fills.
    assert!(settlement.awards.is_empty());
    assert!(h.services.tournaments.get(cup.id).await.unwrap().is_finished());

    let result = h.services.tournaments.finalize(&cup.key).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn test_level_up_scenario() {
    let h = harness();
    let ada = h.user("ada", 1000, 1).await;

    let ada = h.services.users.level_up(ada.id).await.unwrap();
    assert_eq!((ada.money, ada.level, ada.score()), (850, 2, 1050));

    let top = h
        .services
        .leaderboard
        .active(RankWindow::default())
        .await
        .unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].user_id, ada.id);
    assert_eq!(top[0].score, 1050);
}

#[tokio::test]
async fn test_failed_commit_leaves_no_partial_writes() {
    let h = harness_with(TournamentRules {
        entry_fee: 50,
        capacity: 2,
    });
    let cup = h.tournament("cup", 1000).await;
    let ada = h.user("ada", 200, 0).await;
    let bob = h.user("bob", 200, 0).await;
    h.join(&cup, &ada).await.unwrap();

    h.store.fail_next_commit();
    let result = h.join(&cup, &bob).await;
    assert!(matches!(result, Err(ServiceError::Store(_))));

    let stored = h.services.tournaments.get(cup.id).await.unwrap();
    assert_eq!(stored.status, TournamentStatus::Planned);
    assert_eq!(stored.participant_count(), 1);
    assert_eq!(h.services.users.get(bob.id).await.unwrap().money, 200);
    assert_eq!(h.services.users.get(ada.id).await.unwrap().money, 150);
    assert!(h
        .store
        .list_entries(EntryFilter::default().tournament(cup.id))
        .await
        .unwrap()
        .is_empty());
    assert_eq!(h.cache.score(Namespace::Global, bob.id).await.unwrap(), None);

    // The retry goes through.
    let outcome = h.join(&cup, &bob).await.unwrap();
    assert!(outcome.settlement.is_some());
}

#[tokio::test]
async fn test_cache_outage_after_commit_is_drift() {
    let h = harness();
    let cup = h.tournament("cup", 1000).await;
    let ada = h.user("ada", 200, 0).await;

    h.cache.set_unavailable(true);
    let result = h.join(&cup, &ada).await;
    assert!(matches!(result, Err(ServiceError::Cache(_))));

    // Durable change survived.
    assert_eq!(h.services.users.get(ada.id).await.unwrap().money, 150);
    assert_eq!(
        h.services.tournaments.get(cup.id).await.unwrap().participant_count(),
        1
    );

    h.cache.set_unavailable(false);
    assert_eq!(h.cache.score(Namespace::Global, ada.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_concurrent_joins_never_exceed_capacity() {
    let h = harness();
    let cup = h.tournament("cup", 1000).await;

    let mut users = Vec::new();
    for i in 0..15 {
        users.push(h.user(&format!("p{i}"), 100, 0).await);
    }

    let mut handles = Vec::new();
    for user in users {
        let tournaments = h.services.tournaments.clone();
        let tournament_id = cup.id;
        handles.push(tokio::spawn(async move {
            tournaments
                .join(JoinRequest {
                    tournament_id,
                    user_id: user.id,
                })
                .await
        }));
    }

    let mut joined = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => joined += 1,
            Err(ServiceError::Conflict(_)) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(joined, 10);
    assert_eq!(rejected, 5);

    let stored = h.services.tournaments.get(cup.id).await.unwrap();
    assert_eq!(stored.participant_count(), 10);
    assert!(stored.is_finished());
}

#[tokio::test]
async fn test_wipe_resets_everything() {
    let h = harness();
    let cup = h.tournament("cup", 1000).await;
    let ada = h.user("ada", 200, 0).await;
    h.join(&cup, &ada).await.unwrap();

    h.services.maintenance.wipe().await.unwrap();
    assert!(h.services.users.list().await.unwrap().is_empty());
    assert!(h.services.tournaments.list_all().await.unwrap().is_empty());
    assert_eq!(h.cache.key_count().await, 0);

    // Identities restart.
    let again = h.user("ada", 200, 0).await;
    assert_eq!(again.id, 1);
}
