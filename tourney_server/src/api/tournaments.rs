//! Tournament API handlers.
//!
//! # Examples
//!
//! Create a tournament:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "spring", "prize": 2000}'
//! ```
//!
//! Join it:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments/1/join \
//!   -H "Content-Type: application/json" \
//!   -d '{"user_id": 7}'
//! ```

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tourney::models::{
    CreateTournamentRequest, JoinRequest, Tournament, TournamentId, UpdateTournamentRequest,
    UserId,
};
use tourney::tournament::{JoinOutcome, Settlement};

use super::AppState;
use super::errors::ApiResult;
use super::extract::{ApiJson, ApiPath};
use super::request_id::RequestId;

/// Body of a join request; the tournament comes from the path.
#[derive(Debug, Deserialize)]
pub struct JoinBody {
    pub user_id: UserId,
}

/// Body of a finalize request.
#[derive(Debug, Deserialize)]
pub struct FinalizeBody {
    /// Tournament lookup key, e.g. `leaderboard:spring`
    pub key: String,
}

pub async fn list_tournaments(State(state): State<AppState>) -> ApiResult<Json<Vec<Tournament>>> {
    Ok(Json(state.services.tournaments.list_all().await?))
}

pub async fn list_ongoing(State(state): State<AppState>) -> ApiResult<Json<Vec<Tournament>>> {
    Ok(Json(state.services.tournaments.list_ongoing().await?))
}

/// Create a Planned tournament.
///
/// # Errors
///
/// - `400 Bad Request`: malformed body, empty name, prize outside `1..=2^51`
/// - `409 Conflict`: a tournament with the same name exists
pub async fn create_tournament(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateTournamentRequest>,
) -> ApiResult<(StatusCode, Json<Tournament>)> {
    let tournament = state.services.tournaments.create(request).await?;
    Ok((StatusCode::CREATED, Json(tournament)))
}

pub async fn get_tournament(
    State(state): State<AppState>,
    ApiPath(tournament_id): ApiPath<TournamentId>,
) -> ApiResult<Json<Tournament>> {
    Ok(Json(state.services.tournaments.get(tournament_id).await?))
}

/// Update name, prize or status (forward only).
pub async fn update_tournament(
    State(state): State<AppState>,
    ApiPath(tournament_id): ApiPath<TournamentId>,
    ApiJson(request): ApiJson<UpdateTournamentRequest>,
) -> ApiResult<Json<Tournament>> {
    Ok(Json(
        state
            .services
            .tournaments
            .update(tournament_id, request)
            .await?,
    ))
}

pub async fn delete_tournament(
    State(state): State<AppState>,
    ApiPath(tournament_id): ApiPath<TournamentId>,
) -> ApiResult<StatusCode> {
    state.services.tournaments.delete(tournament_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Join a tournament, paying the entry fee.
///
/// The join that fills the last seat returns the settlement as well.
///
/// # Errors
///
/// - `404 Not Found`: tournament or user missing
/// - `409 Conflict`: tournament finished, or user already joined
/// - `402 Payment Required`: money below the entry fee
/// - `503 Service Unavailable`: joined, but the leaderboard cache was not updated
pub async fn join_tournament(
    State(state): State<AppState>,
    ApiPath(tournament_id): ApiPath<TournamentId>,
    ApiJson(body): ApiJson<JoinBody>,
) -> ApiResult<Json<JoinOutcome>> {
    let outcome = state
        .services
        .tournaments
        .join(JoinRequest {
            tournament_id,
            user_id: body.user_id,
        })
        .await?;
    Ok(Json(outcome))
}

/// Mark a full tournament Finished without paying prizes.
pub async fn end_tournament(
    State(state): State<AppState>,
    ApiPath(tournament_id): ApiPath<TournamentId>,
) -> ApiResult<Json<Tournament>> {
    Ok(Json(state.services.tournaments.end(tournament_id).await?))
}

/// Settle a tournament by key (administrative).
pub async fn finalize_tournament(
    State(state): State<AppState>,
    request_id: RequestId,
    ApiJson(body): ApiJson<FinalizeBody>,
) -> ApiResult<Json<Settlement>> {
    let settlement = state.services.tournaments.finalize(&body.key).await?;
    tracing::info!(
        request_id = %request_id.as_str(),
        key = %body.key,
        awards = settlement.awards.len(),
        "Administrative finalize completed"
    );
    Ok(Json(settlement))
}
