//! Match score reporting.

use axum::{
    Json,
    extract::{Path, State},
};
use bracket_engine::tournament::MatchId;
use serde::{Deserialize, Serialize};

use super::{AppState, error::ApiError, request_id::RequestId};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct ReportScoreRequest {
    pub score1: i64,
    pub score2: i64,
}

#[derive(Debug, Serialize)]
pub struct ReportScoreResponse {
    pub success: bool,
    pub message: String,
    pub match_id: MatchId,
    pub winner: String,
    /// Match the winner advanced into, absent for the final
    pub next_match_id: Option<MatchId>,
    pub tournament_completed: bool,
}

/// Report a match score.
///
/// The higher score wins and moves into the next round. Reporting the final
/// completes the tournament and records placement results.
///
/// # Errors
///
/// - `400 Bad Request`: Tied score
/// - `404 Not Found`: Match doesn't exist
/// - `409 Conflict`: Match already decided or still missing a participant
pub async fn report_score(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(match_id): Path<MatchId>,
    Json(request): Json<ReportScoreRequest>,
) -> Result<Json<ReportScoreResponse>, ApiError> {
    let outcome = state
        .tournament_manager
        .report_score(match_id, request.score1, request.score2)
        .await
        .map_err(|e| ApiError::from_engine("report_score", e))?;

    metrics::scores_reported_total();
    if outcome.completed {
        metrics::tournaments_settled_total();
    }
    tracing::info!(
        request_id = %request_id.as_str(),
        match_id = match_id,
        winner = %outcome.winner,
        completed = outcome.completed,
        "Score reported"
    );

    let message = if outcome.completed {
        format!("{} wins the tournament", outcome.winner)
    } else {
        format!("{} advances", outcome.winner)
    };

    Ok(Json(ReportScoreResponse {
        success: true,
        message,
        match_id,
        winner: outcome.winner,
        next_match_id: outcome.advanced_to,
        tournament_completed: outcome.completed,
    }))
}
