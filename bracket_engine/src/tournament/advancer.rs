//! Score reporting and winner propagation.
//!
//! The destination of a winner is a closed-form function of the source
//! position: round `r + 1`, order `ceil(order / 2)`, slot one for odd orders
//! and slot two for even ones.

use chrono::{DateTime, Utc};

use super::errors::{TournamentError, TournamentResult};
use super::models::{
    Match, MatchId, MatchKey, ParticipantId, PlacementResult, Slot, TournamentId,
};

/// Winner placement into a downstream match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAssignment {
    pub key: MatchKey,
    pub slot: Slot,
    pub participant: ParticipantId,
}

/// Everything a single score report changes, committed as one unit
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub tournament_id: TournamentId,
    pub match_id: MatchId,
    pub score1: i64,
    pub score2: i64,
    pub winner: ParticipantId,
    pub reported_at: DateTime<Utc>,
    /// Set unless this was the final
    pub advance: Option<SlotAssignment>,
    /// Set when this was the final
    pub settlement: Option<Vec<PlacementResult>>,
}

impl MatchOutcome {
    pub fn is_final(&self) -> bool {
        self.advance.is_none()
    }
}

/// Decide a match from its two scores
///
/// # Errors
///
/// * `TournamentError::TiedScore` - Both scores are equal
/// * `TournamentError::MatchAlreadyDecided` - A winner is already recorded
/// * `TournamentError::MatchNotReady` - A slot is still empty
pub fn decide(m: &Match, score1: i64, score2: i64) -> TournamentResult<ParticipantId> {
    if score1 == score2 {
        return Err(TournamentError::TiedScore(score1));
    }
    if m.is_decided() {
        return Err(TournamentError::MatchAlreadyDecided(m.id));
    }
    let (Some(player1), Some(player2)) = (&m.player1, &m.player2) else {
        return Err(TournamentError::MatchNotReady(m.id));
    };

    Ok(if score1 > score2 {
        player1.clone()
    } else {
        player2.clone()
    })
}

/// Build the outcome of a report against `m`
///
/// `total_rounds` is the round count of the built bracket; a match in that
/// round is the final and yields no [`SlotAssignment`].
pub fn resolve(
    m: &Match,
    score1: i64,
    score2: i64,
    total_rounds: u32,
) -> TournamentResult<MatchOutcome> {
    let winner = decide(m, score1, score2)?;

    let key = m.key();
    let advance = (key.round < total_rounds).then(|| SlotAssignment {
        key: key.next(),
        slot: key.slot_in_next(),
        participant: winner.clone(),
    });

    Ok(MatchOutcome {
        tournament_id: m.tournament_id,
        match_id: m.id,
        score1,
        score2,
        winner,
        reported_at: Utc::now(),
        advance,
        settlement: None,
    })
}

/// Apply a decided outcome to an in-memory copy of the match
pub fn apply_result(m: &mut Match, outcome: &MatchOutcome) {
    m.score1 = Some(outcome.score1);
    m.score2 = Some(outcome.score2);
    m.winner = Some(outcome.winner.clone());
    m.reported_at = Some(outcome.reported_at);
}
