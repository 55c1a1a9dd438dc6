//! Integration tests for the HTTP API on in-memory backends.

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tourney::Services;
use tourney::cache::MemoryRankedCache;
use tourney::store::MemoryStore;
use tourney::tournament::TournamentRules;
use tourney_server::api::{AppState, create_router, request_id::REQUEST_ID_HEADER};
use tower::ServiceExt;

fn app_with(rules: TournamentRules) -> (Router, Arc<MemoryRankedCache>) {
    let cache = Arc::new(MemoryRankedCache::new());
    let services = Services::new(Arc::new(MemoryStore::new()), cache.clone(), rules);
    (create_router(AppState::new(services)), cache)
}

fn app() -> Router {
    app_with(TournamentRules::default()).0
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_user(app: &Router, name: &str, money: i64, level: i32) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/users",
        Some(json!({ "name": name, "money": money, "level": level })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

async fn create_tournament(app: &Router, name: &str, prize: i64) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/tournaments",
        Some(json!({ "name": name, "prize": prize })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_ok() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"]["status"], "up");
}

#[tokio::test]
async fn test_health_reports_cache_outage() {
    let (app, cache) = app_with(TournamentRules::default());
    cache.set_unavailable(true);
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["cache"]["status"], "down");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = app();
    let request = Request::builder()
        .uri("/health")
        .header(REQUEST_ID_HEADER, "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "abc-123");
}

#[tokio::test]
async fn test_user_crud_and_level_up() {
    let app = app();
    let id = create_user(&app, "ada", 1000, 1).await;

    let (status, body) = send(&app, Method::GET, &format!("/api/v1/users/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 1100);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/users/{id}/level-up"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["money"], 850);
    assert_eq!(body["level"], 2);
    assert_eq!(body["score"], 1050);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/users/{id}"),
        Some(json!({ "name": "ada lovelace" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "ada lovelace");

    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/users/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, &format!("/api/v1/users/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_validation_errors_are_400() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/tournaments",
        Some(json!({ "name": "", "prize": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, _) = send(&app, Method::GET, "/api/v1/leaderboard?start=5&stop=1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_join_flow_and_error_statuses() {
    let app = app();
    let tournament = create_tournament(&app, "spring", 1000).await;
    let rich = create_user(&app, "rich", 500, 0).await;
    let poor = create_user(&app, "poor", 10, 0).await;
    let join_uri = format!("/api/v1/tournaments/{tournament}/join");

    let (status, body) = send(&app, Method::POST, &join_uri, Some(json!({ "user_id": rich }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["money"], 450);
    assert!(body["settlement"].is_null());

    let (status, body) = send(&app, Method::POST, &join_uri, Some(json!({ "user_id": rich }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let (status, body) = send(&app, Method::POST, &join_uri, Some(json!({ "user_id": poor }))).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["kind"], "insufficient_funds");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/tournaments/{tournament}/end"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::GET, "/api/v1/leaderboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["user_id"], rich);
    assert_eq!(body[0]["rank"], 1);
}

#[tokio::test]
async fn test_full_tournament_settles() {
    let (app, _) = app_with(TournamentRules {
        entry_fee: 50,
        capacity: 4,
    });
    let tournament = create_tournament(&app, "cup", 1000).await;
    let join_uri = format!("/api/v1/tournaments/{tournament}/join");

    let mut last = Value::Null;
    for (i, money) in [400, 300, 200, 100].into_iter().enumerate() {
        let user = create_user(&app, &format!("p{i}"), money, 0).await;
        let (status, body) =
            send(&app, Method::POST, &join_uri, Some(json!({ "user_id": user }))).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        last = body;
    }

    assert_eq!(last["tournament"]["status"], "finished");
    let payouts: Vec<i64> = last["settlement"]["awards"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["payout"].as_i64().unwrap())
        .collect();
    assert_eq!(payouts, vec![500, 250, 125, 62]);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/leaderboard/tournaments/{tournament}/finished"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 4);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/leaderboard/tournaments/{tournament}/active"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/admin/finalize",
        Some(json!({ "key": "leaderboard:cup" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "tournament is not active");
}

#[tokio::test]
async fn test_cache_drift_is_503_but_committed() {
    let (app, cache) = app_with(TournamentRules::default());
    let tournament = create_tournament(&app, "spring", 1000).await;
    let user = create_user(&app, "ada", 500, 0).await;

    cache.set_unavailable(true);
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/tournaments/{tournament}/join"),
        Some(json!({ "user_id": user })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "cache");

    let (_, body) = send(&app, Method::GET, &format!("/api/v1/users/{user}"), None).await;
    assert_eq!(body["money"], 450);
}

#[tokio::test]
async fn test_status_updates_and_ongoing_listing() {
    let app = app();
    let tournament = create_tournament(&app, "spring", 1000).await;
    let uri = format!("/api/v1/tournaments/{tournament}");

    let (status, body) = send(&app, Method::PATCH, &uri, Some(json!({ "status": "ongoing" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ongoing");

    let (_, body) = send(&app, Method::GET, "/api/v1/tournaments/ongoing", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({ "status": "planned" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(&app, Method::GET, "/api/v1/tournaments", None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_wipe() {
    let app = app();
    create_user(&app, "ada", 100, 0).await;

    let (status, _) = send(&app, Method::POST, "/api/v1/admin/wipe", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, Method::GET, "/api/v1/users", None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_requests_use_error_body() {
    let app = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/users")
        .header("content-type", "application/json")
        .body(Body::from("{\"name\": \"ada\""))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["kind"], "validation");
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/users",
        Some(json!({ "name": "ada" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, body) = send(&app, Method::GET, "/api/v1/users/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, body) = send(&app, Method::GET, "/api/v1/leaderboard?start=x", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_oversized_money_is_400() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/users",
        Some(json!({ "name": "whale", "money": i64::MAX, "level": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_tournament_ranking_tracks_level_up() {
    let app = app();
    let tournament = create_tournament(&app, "spring", 1000).await;
    let user = create_user(&app, "ada", 1000, 1).await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/tournaments/{tournament}/join"),
        Some(json!({ "user_id": user })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/users/{user}/level-up"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/leaderboard/tournaments/{tournament}?start=0&stop=4"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["user_id"], user);
    assert_eq!(body[0]["score"], 1000);

    let (status, _) = send(&app, Method::GET, "/api/v1/leaderboard/tournaments/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
