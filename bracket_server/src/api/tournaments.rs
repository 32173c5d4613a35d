//! Tournament API handlers.
//!
//! This module provides HTTP REST endpoints for tournament operations including:
//! - Creating and listing tournaments
//! - Registering and unregistering participants
//! - Starting and cancelling tournaments
//! - Reading rosters, brackets and placement results
//!
//! # Examples
//!
//! Create a tournament:
//! ```bash
//! curl -X POST http://localhost:7878/api/v1/tournaments \
//!   -H "Content-Type: application/json" \
//!   -d '{"title": "Friday Cup", "entry_fee": "10", "max_participants": 8}'
//! ```
//!
//! Join it:
//! ```bash
//! curl -X POST http://localhost:7878/api/v1/tournaments/1/join \
//!   -H "Content-Type: application/json" \
//!   -d '{"participant_id": "0xabc", "kind": "player"}'
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use bracket_engine::tournament::{
    Match, Participant, ParticipantKind, PlacementResult, PlacementSplit, RosterEntry,
    Tournament, TournamentConfig, TournamentFormat, TournamentId, TournamentStatus,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AppState, error::ApiError};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct CreateTournamentRequest {
    pub title: String,
    #[serde(default)]
    pub game: String,
    #[serde(default)]
    pub platform: String,
    pub entry_fee: Decimal,
    #[serde(default = "default_prize_percentage")]
    pub prize_percentage: u8,
    #[serde(default)]
    pub placement_split: PlacementSplit,
    #[serde(default)]
    pub rules: String,
    pub start_time: Option<DateTime<Utc>>,
    pub max_participants: usize,
    #[serde(default = "default_format")]
    pub format: TournamentFormat,
    #[serde(default)]
    pub winner_take_all: bool,
    pub currency: Option<String>,
    #[serde(default)]
    pub team_mode: bool,
    #[serde(default)]
    pub host_id: String,
}

fn default_prize_percentage() -> u8 {
    100
}

fn default_format() -> TournamentFormat {
    TournamentFormat::Bracket
}

impl From<CreateTournamentRequest> for TournamentConfig {
    fn from(req: CreateTournamentRequest) -> Self {
        let mut config =
            TournamentConfig::single_elimination(req.title, req.max_participants, req.entry_fee)
                .with_prize_percentage(req.prize_percentage)
                .with_format(req.format)
                .hosted_by(req.host_id);
        config.game = req.game;
        config.platform = req.platform;
        config.placement_split = req.placement_split;
        config.rules = req.rules;
        config.winner_take_all = req.winner_take_all;
        config.team_mode = req.team_mode;
        if let Some(start_time) = req.start_time {
            config.start_time = start_time;
        }
        if let Some(currency) = req.currency {
            config.currency = currency;
        }
        config
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub success: bool,
    pub message: String,
    pub tournament_id: TournamentId,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<TournamentStatus>,
}

#[derive(Debug, Serialize)]
pub struct TournamentResponse {
    #[serde(flatten)]
    pub tournament: Tournament,
    pub prize_pool: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub participant_id: String,
    #[serde(default = "default_kind")]
    pub kind: ParticipantKind,
}

fn default_kind() -> ParticipantKind {
    ParticipantKind::Player
}

#[derive(Debug, Deserialize)]
pub struct LeaveRequest {
    pub participant_id: String,
}

#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub success: bool,
    pub message: String,
    pub tournament_id: TournamentId,
    pub participant_id: String,
}

#[derive(Debug, Serialize)]
pub struct LifecycleResponse {
    pub success: bool,
    pub message: String,
    pub tournament_id: TournamentId,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub match_ids: Vec<i64>,
}

/// Create a tournament.
///
/// # Errors
///
/// - `400 Bad Request`: Configuration violates a tournament invariant
pub async fn create_tournament(
    State(state): State<AppState>,
    Json(request): Json<CreateTournamentRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let config = TournamentConfig::from(request);
    let title = config.title.clone();

    let tournament_id = state
        .tournament_manager
        .create_tournament(config)
        .await
        .map_err(|e| ApiError::from_engine("create_tournament", e))?;

    metrics::tournaments_created_total();
    logging::log_tournament_event("created", tournament_id, &title);

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            success: true,
            message: format!("Created tournament '{title}'"),
            tournament_id,
        }),
    ))
}

/// List tournaments, optionally filtered with `?status=upcoming`.
pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Tournament>>, ApiError> {
    state
        .tournament_manager
        .list_tournaments(query.status)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_engine("list_tournaments", e))
}

/// Tournament details including its prize pool.
///
/// # Errors
///
/// - `404 Not Found`: Tournament doesn't exist
pub async fn get_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<TournamentResponse>, ApiError> {
    let manager = &state.tournament_manager;
    let tournament = manager
        .get_tournament(tournament_id)
        .await
        .map_err(|e| ApiError::from_engine("get_tournament", e))?;
    let prize_pool = manager
        .prize_pool(tournament_id)
        .await
        .map_err(|e| ApiError::from_engine("get_tournament", e))?;

    Ok(Json(TournamentResponse {
        tournament,
        prize_pool,
    }))
}

/// Register a player or team.
///
/// # Errors
///
/// - `400 Bad Request`: Participant kind does not match the tournament mode
/// - `404 Not Found`: Tournament doesn't exist
/// - `409 Conflict`: Already registered, roster full, or registration closed
pub async fn join_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    let participant = Participant::new(request.kind, request.participant_id);

    let entry: RosterEntry = state
        .tournament_manager
        .join(tournament_id, participant)
        .await
        .map_err(|e| ApiError::from_engine("join", e))?;

    metrics::participants_joined_total();

    Ok(Json(RegistrationResponse {
        success: true,
        message: "Registered".to_string(),
        tournament_id,
        participant_id: entry.participant.id().to_string(),
    }))
}

/// Unregister before the tournament starts.
pub async fn leave_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<LeaveRequest>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    state
        .tournament_manager
        .leave(tournament_id, &request.participant_id)
        .await
        .map_err(|e| ApiError::from_engine("leave", e))?;

    Ok(Json(RegistrationResponse {
        success: true,
        message: "Unregistered".to_string(),
        tournament_id,
        participant_id: request.participant_id,
    }))
}

/// Build the bracket and start the tournament.
///
/// # Errors
///
/// - `400 Bad Request`: Roster size not allowed by the format
/// - `409 Conflict`: Already started, or fewer than two participants
pub async fn start_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<LifecycleResponse>, ApiError> {
    let matches = state
        .tournament_manager
        .start_tournament(tournament_id)
        .await
        .map_err(|e| ApiError::from_engine("start_tournament", e))?;

    metrics::tournaments_started_total();
    logging::log_tournament_event(
        "started",
        tournament_id,
        &format!("{} matches created", matches.len()),
    );

    Ok(Json(LifecycleResponse {
        success: true,
        message: "Tournament started".to_string(),
        tournament_id,
        match_ids: matches.iter().map(|m| m.id).collect(),
    }))
}

pub async fn cancel_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<LifecycleResponse>, ApiError> {
    state
        .tournament_manager
        .cancel_tournament(tournament_id)
        .await
        .map_err(|e| ApiError::from_engine("cancel_tournament", e))?;

    logging::log_tournament_event("cancelled", tournament_id, "cancelled by host");

    Ok(Json(LifecycleResponse {
        success: true,
        message: "Tournament cancelled".to_string(),
        tournament_id,
        match_ids: Vec::new(),
    }))
}

pub async fn get_roster(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<RosterEntry>>, ApiError> {
    state
        .tournament_manager
        .get_roster(tournament_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_engine("get_roster", e))
}

/// Bracket ordered by round, then match order.
pub async fn get_matches(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<Match>>, ApiError> {
    state
        .tournament_manager
        .get_bracket(tournament_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_engine("get_matches", e))
}

pub async fn get_results(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<PlacementResult>>, ApiError> {
    state
        .tournament_manager
        .get_results(tournament_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_engine("get_results", e))
}
