//! HTTP API for the tournament server.
//!
//! # Modules
//!
//! - [`tournaments`]: Tournament lifecycle, registration and queries
//! - [`matches`]: Score reporting
//! - [`request_id`]: Request correlation middleware
//! - [`error`]: Engine error to HTTP status mapping
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health
//! POST /api/v1/tournaments                       Create tournament
//! GET  /api/v1/tournaments[?status=...]          List tournaments
//! GET  /api/v1/tournaments/{id}                  Details and prize pool
//! POST /api/v1/tournaments/{id}/join             Register participant
//! POST /api/v1/tournaments/{id}/leave            Unregister participant
//! POST /api/v1/tournaments/{id}/start            Build bracket
//! POST /api/v1/tournaments/{id}/cancel           Cancel upcoming tournament
//! GET  /api/v1/tournaments/{id}/roster
//! GET  /api/v1/tournaments/{id}/matches
//! GET  /api/v1/tournaments/{id}/results
//! POST /api/v1/matches/{id}/score                Report score
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bracket_engine::tournament::TournamentManager;
//! use bracket_server::api::{AppState, create_router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState {
//!     tournament_manager: Arc::new(TournamentManager::in_memory()),
//!     pool: None,
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:7878").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod error;
pub mod matches;
pub mod request_id;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use bracket_engine::tournament::TournamentManager;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub tournament_manager: Arc<TournamentManager>,
    /// Present when tournaments are stored in PostgreSQL
    pub pool: Option<Arc<PgPool>>,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/tournaments",
            get(tournaments::list_tournaments).post(tournaments::create_tournament),
        )
        .route("/tournaments/{tournament_id}", get(tournaments::get_tournament))
        .route("/tournaments/{tournament_id}/join", post(tournaments::join_tournament))
        .route("/tournaments/{tournament_id}/leave", post(tournaments::leave_tournament))
        .route("/tournaments/{tournament_id}/start", post(tournaments::start_tournament))
        .route("/tournaments/{tournament_id}/cancel", post(tournaments::cancel_tournament))
        .route("/tournaments/{tournament_id}/roster", get(tournaments::get_roster))
        .route("/tournaments/{tournament_id}/matches", get(tournaments::get_matches))
        .route("/tournaments/{tournament_id}/results", get(tournaments::get_results))
        .route("/matches/{match_id}/score", post(matches::report_score))
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when storage is reachable, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:7878/health
/// # {"status":"healthy","storage":"postgres","database":true,"timestamp":"2026-05-02T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (storage, db_healthy) = match &state.pool {
        Some(pool) => (
            "postgres",
            sqlx::query("SELECT 1").fetch_one(pool.as_ref()).await.is_ok(),
        ),
        None => ("memory", true),
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage,
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
