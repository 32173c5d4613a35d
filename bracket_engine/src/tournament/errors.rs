//! Tournament error types.

use thiserror::Error;

use super::models::{
    MatchId, ParticipantId, ParticipantKind, TournamentFormat, TournamentId, TournamentStatus,
};

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Participant {participant_id} is not registered for tournament {tournament_id}")]
    ParticipantNotFound {
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    },

    #[error("Participant already registered")]
    AlreadyRegistered,

    #[error("Tournament is full")]
    TournamentFull,

    #[error("Tournament accepts {expected} entries, got a {submitted}")]
    WrongMode {
        expected: ParticipantKind,
        submitted: ParticipantKind,
    },

    #[error("Invalid participant count {count} for {format} format")]
    InvalidParticipantCount {
        count: usize,
        format: TournamentFormat,
    },

    #[error("Tied score {0}:{0}, a match needs a winner")]
    TiedScore(i64),

    #[error("Placement percentages must sum to 100, got {0}")]
    InvalidPlacementSplit(u16),

    #[error("Invalid tournament configuration: {0}")]
    InvalidConfig(String),

    #[error("Prize pool exceeds the representable range")]
    PrizePoolOverflow,

    #[error("Tournament not in correct state: expected {expected}, got {actual}")]
    InvalidState {
        expected: TournamentStatus,
        actual: TournamentStatus,
    },

    #[error("Insufficient participants: need {needed}, have {current}")]
    InsufficientParticipants { needed: usize, current: usize },

    #[error("Match {0} is still waiting for participants")]
    MatchNotReady(MatchId),

    #[error("Match {0} already has a winner")]
    MatchAlreadyDecided(MatchId),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure category reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input violates a tournament or match invariant
    Validation,
    /// Operation not allowed in the tournament's current state
    State,
    /// Referenced tournament, match or participant does not exist
    NotFound,
    /// Storage failed; nothing was applied
    Persistence,
}

impl TournamentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::InvalidPlacementSplit(_)
            | TournamentError::InvalidConfig(_)
            | TournamentError::PrizePoolOverflow
            | TournamentError::TiedScore(_)
            | TournamentError::InvalidParticipantCount { .. }
            | TournamentError::WrongMode { .. } => ErrorKind::Validation,
            TournamentError::TournamentFull
            | TournamentError::AlreadyRegistered
            | TournamentError::InvalidState { .. }
            | TournamentError::InsufficientParticipants { .. }
            | TournamentError::MatchNotReady(_)
            | TournamentError::MatchAlreadyDecided(_) => ErrorKind::State,
            TournamentError::TournamentNotFound(_)
            | TournamentError::MatchNotFound(_)
            | TournamentError::ParticipantNotFound { .. } => ErrorKind::NotFound,
            TournamentError::CorruptRecord(_)
            | TournamentError::Database(_)
            | TournamentError::Serialization(_) => ErrorKind::Persistence,
        }
    }

    /// Get a client-safe error message
    ///
    /// Storage errors are replaced by a generic message so SQL details and
    /// record contents never reach the caller.
    pub fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Persistence => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
