//! HTTP API for the tournament platform.
//!
//! # Modules
//!
//! - [`users`]: user CRUD and level-up
//! - [`tournaments`]: tournament CRUD, join, end and finalize
//! - [`leaderboard`]: global ranking and per-tournament/per-user views
//! - [`errors`]: mapping of service errors to status codes
//! - [`extract`]: body, path and query extractors rejecting with the error body
//! - [`request_id`]: request correlation and HTTP metrics
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use tourney::Services;
//! use tourney::tournament::TournamentRules;
//! use tourney_server::api::{AppState, create_router};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState::new(Services::in_memory(TournamentRules::default()));
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively. In production, configure appropriate
//! origins, methods, and headers.

pub mod errors;
pub mod extract;
pub mod leaderboard;
pub mod request_id;
pub mod tournaments;
pub mod users;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::json;
use tourney::Services;
use tower_http::cors::CorsLayer;

use errors::ApiResult;
use request_id::RequestId;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET    /health                                        - Store and cache health
/// GET    /api/v1/users                                  - List users
/// POST   /api/v1/users                                  - Create user
/// GET    /api/v1/users/{id}                             - Get user
/// PATCH  /api/v1/users/{id}                             - Update user
/// DELETE /api/v1/users/{id}                             - Delete user
/// POST   /api/v1/users/{id}/level-up                    - Level up
/// GET    /api/v1/tournaments                            - List tournaments
/// POST   /api/v1/tournaments                            - Create tournament
/// GET    /api/v1/tournaments/ongoing                    - List ongoing tournaments
/// GET    /api/v1/tournaments/{id}                       - Get tournament
/// PATCH  /api/v1/tournaments/{id}                       - Update tournament
/// DELETE /api/v1/tournaments/{id}                       - Delete tournament
/// POST   /api/v1/tournaments/{id}/join                  - Join tournament
/// POST   /api/v1/tournaments/{id}/end                   - End tournament
/// GET    /api/v1/leaderboard?start=&stop=               - Global ranking window
/// GET    /api/v1/leaderboard/tournaments/{id}?start=&stop= - Live tournament ranking
/// GET    /api/v1/leaderboard/tournaments/{id}/active    - Active rows of a tournament
/// GET    /api/v1/leaderboard/tournaments/{id}/finished  - Final standings
/// GET    /api/v1/leaderboard/users/{id}/active          - Active rows of a user
/// POST   /api/v1/admin/finalize                         - Finalize by key
/// POST   /api/v1/admin/wipe                             - Truncate everything
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    let user_routes = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{user_id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{user_id}/level-up", post(users::level_up));

    let tournament_routes = Router::new()
        .route(
            "/tournaments",
            get(tournaments::list_tournaments).post(tournaments::create_tournament),
        )
        .route("/tournaments/ongoing", get(tournaments::list_ongoing))
        .route(
            "/tournaments/{tournament_id}",
            get(tournaments::get_tournament)
                .patch(tournaments::update_tournament)
                .delete(tournaments::delete_tournament),
        )
        .route(
            "/tournaments/{tournament_id}/join",
            post(tournaments::join_tournament),
        )
        .route(
            "/tournaments/{tournament_id}/end",
            post(tournaments::end_tournament),
        );

    let leaderboard_routes = Router::new()
        .route("/leaderboard", get(leaderboard::active))
        .route(
            "/leaderboard/tournaments/{tournament_id}",
            get(leaderboard::tournament_ranking),
        )
        .route(
            "/leaderboard/tournaments/{tournament_id}/active",
            get(leaderboard::active_by_tournament),
        )
        .route(
            "/leaderboard/tournaments/{tournament_id}/finished",
            get(leaderboard::finished_by_tournament),
        )
        .route(
            "/leaderboard/users/{user_id}/active",
            get(leaderboard::active_by_user),
        );

    let admin_routes = Router::new()
        .route("/admin/finalize", post(tournaments::finalize_tournament))
        .route("/admin/wipe", post(wipe));

    Router::new()
        .merge(user_routes)
        .merge(tournament_routes)
        .merge(leaderboard_routes)
        .merge(admin_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` if store and cache are reachable, `503 Service
/// Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"1.0.0","store":{"status":"up"},"cache":{"status":"up"},...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.services.maintenance.health().await;
    let healthy = report.is_healthy();

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": report.store,
        "cache": report.cache,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}

/// Truncate every table and clear the cache.
async fn wipe(State(state): State<AppState>, request_id: RequestId) -> ApiResult<StatusCode> {
    state.services.maintenance.wipe().await?;
    tracing::warn!(request_id = %request_id.as_str(), "Administrative wipe completed");
    Ok(StatusCode::NO_CONTENT)
}
