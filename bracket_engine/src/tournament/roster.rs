//! Participant registration rules.

use super::errors::{TournamentError, TournamentResult};
use super::models::{Participant, RosterEntry, Tournament, TournamentStatus};

/// Registered participants of one tournament, capped at its capacity
#[derive(Debug, Clone, Default)]
pub struct Roster {
    capacity: usize,
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.participant.id() == participant_id)
    }

    /// Entries in registration order
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Append an entry after the duplicate and capacity checks
    ///
    /// # Errors
    ///
    /// * `TournamentError::AlreadyRegistered` - Participant already present
    /// * `TournamentError::TournamentFull` - Capacity reached
    pub fn admit(&mut self, entry: RosterEntry) -> TournamentResult<&RosterEntry> {
        if self.contains(entry.participant.id()) {
            return Err(TournamentError::AlreadyRegistered);
        }
        if self.is_full() {
            return Err(TournamentError::TournamentFull);
        }
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn remove(&mut self, participant_id: &str) -> Option<RosterEntry> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.participant.id() == participant_id)?;
        Some(self.entries.remove(idx))
    }
}

/// Registration is only open while the tournament is upcoming
pub fn ensure_open(tournament: &Tournament) -> TournamentResult<()> {
    if tournament.status != TournamentStatus::Upcoming {
        return Err(TournamentError::InvalidState {
            expected: TournamentStatus::Upcoming,
            actual: tournament.status,
        });
    }
    Ok(())
}

/// Team tournaments take teams, everything else takes players
pub fn check_mode(tournament: &Tournament, participant: &Participant) -> TournamentResult<()> {
    let expected = tournament.config.participant_kind();
    if participant.kind() != expected {
        return Err(TournamentError::WrongMode {
            expected,
            submitted: participant.kind(),
        });
    }
    Ok(())
}
