//! Integration tests for the HTTP API.
//!
//! The router is driven in-process with `oneshot` over the in-memory backend.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bracket_engine::tournament::TournamentManager;
use bracket_server::api::{AppState, create_router, request_id::REQUEST_ID_HEADER};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

fn test_app() -> axum::Router {
    let state = AppState {
        tournament_manager: Arc::new(TournamentManager::in_memory().with_shuffle_seed(17)),
        pool: None,
    };
    create_router(state)
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
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
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn create(app: &axum::Router, body: Value) -> i64 {
    let (status, json) = send(app, "POST", "/api/v1/tournaments", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["tournament_id"].as_i64().unwrap()
}

async fn join(app: &axum::Router, id: i64, participant: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        &format!("/api/v1/tournaments/{id}/join"),
        Some(json!({"participant_id": participant})),
    )
    .await
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = test_app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["storage"], "memory");
}

#[tokio::test]
async fn test_request_id_echoed() {
    let app = test_app();
    let request = Request::builder()
        .uri("/health")
        .header(REQUEST_ID_HEADER, "trace-42")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-42");
}

// ============================================================================
// Tournament Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_full_tournament_over_http() {
    let app = test_app();
    let id = create(
        &app,
        json!({
            "title": "HTTP Cup",
            "entry_fee": "10",
            "prize_percentage": 80,
            "max_participants": 4
        }),
    )
    .await;

    let (status, json) = send(&app, "GET", &format!("/api/v1/tournaments/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "upcoming");
    let pool: Decimal = json["prize_pool"].as_str().unwrap().parse().unwrap();
    assert_eq!(pool, Decimal::from(32));

    for name in ["ana", "ben", "cai", "dev"] {
        let (status, json) = join(&app, id, name).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["success"], true);
    }

    let (status, json) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/start"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["match_ids"].as_array().unwrap().len(), 3);

    let mut completed = false;
    for _ in 0..3 {
        let (_, matches) = send(&app, "GET", &format!("/api/v1/tournaments/{id}/matches"), None).await;
        let ready = matches
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["winner"].is_null() && !m["player1"].is_null() && !m["player2"].is_null())
            .unwrap()
            .clone();

        let (status, json) = send(
            &app,
            "POST",
            &format!("/api/v1/matches/{}/score", ready["id"]),
            Some(json!({"score1": 2, "score2": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["winner"], ready["player1"]);
        completed = json["tournament_completed"].as_bool().unwrap();
    }
    assert!(completed);

    let (_, json) = send(&app, "GET", &format!("/api/v1/tournaments/{id}"), None).await;
    assert_eq!(json["status"], "paid");

    let (status, results) = send(&app, "GET", &format!("/api/v1/tournaments/{id}/results"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_duplicate_join_conflict() {
    let app = test_app();
    let id = create(
        &app,
        json!({"title": "Dup", "entry_fee": "1", "max_participants": 2}),
    )
    .await;

    assert_eq!(join(&app, id, "same").await.0, StatusCode::OK);
    let (status, json) = join(&app, id, "same").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Participant already registered");

    let (_, roster) = send(&app, "GET", &format!("/api/v1/tournaments/{id}/roster"), None).await;
    assert_eq!(roster.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let app = test_app();
    let (status, json) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(json!({"title": "Odd", "entry_fee": "1", "max_participants": 6})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(json!({
            "title": "Split",
            "entry_fee": "1",
            "max_participants": 4,
            "placement_split": {"first": 50, "second": 30, "third": 10}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for body in [
        json!({"title": "Huge", "entry_fee": "1", "max_participants": 1_099_511_627_776_u64}),
        json!({"title": "Rich", "entry_fee": "79228162514264337593543950335", "max_participants": 16}),
    ] {
        let (status, json) = send(&app, "POST", "/api/v1/tournaments", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{json}");
    }

    // Server still up, nothing stored.
    let (status, list) = send(&app, "GET", "/api/v1/tournaments", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_tied_score_and_unknown_match() {
    let app = test_app();
    let id = create(&app, json!({"title": "Tie", "entry_fee": "1", "max_participants": 2})).await;
    join(&app, id, "x").await;
    join(&app, id, "y").await;
    let (_, started) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/start"), None).await;
    let match_id = started["match_ids"][0].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/matches/{match_id}/score"),
        Some(json!({"score1": 1, "score2": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/matches/9999/score",
        Some(json!({"score1": 1, "score2": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_twice_conflict() {
    let app = test_app();
    let id = create(&app, json!({"title": "Twice", "entry_fee": "1", "max_participants": 2})).await;
    join(&app, id, "x").await;
    join(&app, id, "y").await;

    let uri = format!("/api/v1/tournaments/{id}/start");
    assert_eq!(send(&app, "POST", &uri, None).await.0, StatusCode::OK);
    assert_eq!(send(&app, "POST", &uri, None).await.0, StatusCode::CONFLICT);

    let (_, matches) = send(&app, "GET", &format!("/api/v1/tournaments/{id}/matches"), None).await;
    assert_eq!(matches.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_leave_cancel_and_filter() {
    let app = test_app();
    let id = create(&app, json!({"title": "Leave", "entry_fee": "1", "max_participants": 4})).await;
    join(&app, id, "x").await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/leave"),
        Some(json!({"participant_id": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, cancelled) = send(&app, "GET", "/api/v1/tournaments?status=cancelled", None).await;
    assert_eq!(cancelled.as_array().unwrap().len(), 1);
    let (_, upcoming) = send(&app, "GET", "/api/v1/tournaments?status=upcoming", None).await;
    assert!(upcoming.as_array().unwrap().is_empty());

    let (status, _) = send(&app, "GET", "/api/v1/tournaments/777", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
