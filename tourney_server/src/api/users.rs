//! User API handlers.
//!
//! # Examples
//!
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/users \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "ada", "money": 1000, "level": 1}'
//!
//! curl -X POST http://localhost:8080/api/v1/users/1/level-up
//! ```

use axum::{Json, extract::State, http::StatusCode};
use tourney::models::{CreateUserRequest, UpdateUserRequest, User, UserId};

use super::AppState;
use super::errors::ApiResult;
use super::extract::{ApiJson, ApiPath};

/// List every user.
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.services.users.list().await?))
}

/// Create a user. The score is derived from level and money.
///
/// # Errors
///
/// - `400 Bad Request`: malformed body, empty name, money outside
///   `0..=2^52`, level outside `0..=100`
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.services.users.create(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.services.users.get(user_id).await?))
}

/// Partially update a user.
pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.services.users.update(user_id, request).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
) -> ApiResult<StatusCode> {
    state.services.users.delete(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Buy one level.
///
/// # Errors
///
/// - `402 Payment Required`: money below `100 + level * 50`
/// - `400 Bad Request`: already at the maximum level
pub async fn level_up(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.services.users.level_up(user_id).await?))
}
