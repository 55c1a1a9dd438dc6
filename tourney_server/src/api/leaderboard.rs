//! Leaderboard API handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tourney::cache::RankedMember;
use tourney::leaderboard::RankWindow;
use tourney::models::{LeaderboardEntry, TournamentId, UserId};

use super::AppState;
use super::errors::ApiResult;
use super::extract::{ApiPath, ApiQuery};

/// Rank window query, both bounds inclusive and 0-indexed.
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub start: Option<i64>,
    pub stop: Option<i64>,
}

/// Global ranking window. Defaults to the top ten.
///
/// ```bash
/// curl "http://localhost:8080/api/v1/leaderboard?start=0&stop=4"
/// ```
pub async fn active(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<WindowQuery>,
) -> ApiResult<Json<Vec<RankedMember>>> {
    let window = RankWindow::new(query.start, query.stop)?;
    Ok(Json(state.services.leaderboard.active(window).await?))
}

/// Live ranking window of an open tournament.
///
/// ```bash
/// curl "http://localhost:8080/api/v1/leaderboard/tournaments/1?start=0&stop=4"
/// ```
pub async fn tournament_ranking(
    State(state): State<AppState>,
    ApiPath(tournament_id): ApiPath<TournamentId>,
    ApiQuery(query): ApiQuery<WindowQuery>,
) -> ApiResult<Json<Vec<RankedMember>>> {
    let window = RankWindow::new(query.start, query.stop)?;
    Ok(Json(
        state
            .services
            .leaderboard
            .tournament_ranking(tournament_id, window)
            .await?,
    ))
}

pub async fn active_by_tournament(
    State(state): State<AppState>,
    ApiPath(tournament_id): ApiPath<TournamentId>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    Ok(Json(
        state
            .services
            .leaderboard
            .active_by_tournament(tournament_id)
            .await?,
    ))
}

pub async fn finished_by_tournament(
    State(state): State<AppState>,
    ApiPath(tournament_id): ApiPath<TournamentId>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    Ok(Json(
        state
            .services
            .leaderboard
            .finished_by_tournament(tournament_id)
            .await?,
    ))
}

pub async fn active_by_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    Ok(Json(
        state.services.leaderboard.active_by_user(user_id).await?,
    ))
}
