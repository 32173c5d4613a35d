//! Format-specific rules for capacity, roster size and round-one pairing.
//!
//! Each [`TournamentFormat`] maps to a rules type; dispatch goes through
//! `enum_dispatch` so adding a format means adding a variant and an impl.

use enum_dispatch::enum_dispatch;

use super::errors::{TournamentError, TournamentResult};
use super::models::{ParticipantId, TournamentFormat};

/// A round-one pairing; the second slot is empty for a bye
pub type Pairing = (ParticipantId, Option<ParticipantId>);

/// Rules a tournament format enforces while building its bracket
#[enum_dispatch]
pub trait FormatRules {
    /// Check the configured maximum participant count
    fn validate_capacity(&self, max_participants: usize) -> TournamentResult<()>;

    /// Check the roster size at start time
    fn validate_roster(&self, roster_size: usize) -> TournamentResult<()>;

    /// Pair shuffled entrants into round-one matches, in order
    fn pair_round_one(&self, shuffled: Vec<ParticipantId>) -> Vec<Pairing> {
        let mut pairings = Vec::with_capacity(shuffled.len().div_ceil(2));
        let mut entrants = shuffled.into_iter();
        while let Some(first) = entrants.next() {
            pairings.push((first, entrants.next()));
        }
        pairings
    }
}

/// Single-elimination bracket: power-of-two capacity and roster
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleElimination;

impl FormatRules for SingleElimination {
    fn validate_capacity(&self, max_participants: usize) -> TournamentResult<()> {
        if max_participants < 2 || !max_participants.is_power_of_two() {
            return Err(TournamentError::InvalidParticipantCount {
                count: max_participants,
                format: TournamentFormat::Bracket,
            });
        }
        Ok(())
    }

    fn validate_roster(&self, roster_size: usize) -> TournamentResult<()> {
        if !roster_size.is_power_of_two() {
            return Err(TournamentError::InvalidParticipantCount {
                count: roster_size,
                format: TournamentFormat::Bracket,
            });
        }
        Ok(())
    }
}

/// Host-defined format; any roster of two or more is paired
///
/// Round one is padded to the next power of two with byes. Paired matches
/// come first, then one single-entrant match per bye, so every later round
/// is fed by two real matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomFormat;

impl FormatRules for CustomFormat {
    fn validate_capacity(&self, max_participants: usize) -> TournamentResult<()> {
        if max_participants < 2 {
            return Err(TournamentError::InvalidParticipantCount {
                count: max_participants,
                format: TournamentFormat::Custom,
            });
        }
        Ok(())
    }

    fn validate_roster(&self, _roster_size: usize) -> TournamentResult<()> {
        Ok(())
    }

    fn pair_round_one(&self, shuffled: Vec<ParticipantId>) -> Vec<Pairing> {
        let slots = shuffled.len().next_power_of_two();
        let paired = (2 * shuffled.len()).saturating_sub(slots);

        let mut pairings = Vec::with_capacity(slots / 2);
        let mut entrants = shuffled.into_iter();
        for _ in 0..paired / 2 {
            if let Some(first) = entrants.next() {
                pairings.push((first, entrants.next()));
            }
        }
        pairings.extend(entrants.map(|entrant| (entrant, None)));
        pairings
    }
}

/// Rules for each tournament format
#[enum_dispatch(FormatRules)]
#[derive(Debug, Clone, Copy)]
pub enum Rules {
    SingleElimination,
    CustomFormat,
}

impl TournamentFormat {
    pub fn rules(self) -> Rules {
        match self {
            TournamentFormat::Bracket => SingleElimination.into(),
            TournamentFormat::Custom => CustomFormat.into(),
        }
    }
}
