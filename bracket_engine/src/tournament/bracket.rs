//! Bracket construction and the match arena keyed by `(round, match_order)`.

use std::collections::{BTreeMap, HashMap};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use super::errors::{TournamentError, TournamentResult};
use super::format::FormatRules;
use super::models::{
    Match, MatchId, MatchKey, MatchSeed, ParticipantId, RosterEntry, Tournament, TournamentStatus,
};

/// Minimum roster size for any tournament to start
pub const MIN_PARTICIPANTS: usize = 2;

/// Largest capacity a tournament may be created with
pub const MAX_PARTICIPANTS: usize = 4096;

/// Number of rounds needed to reduce `participants` to one winner: `ceil(log2(n))`
pub fn total_rounds(participants: usize) -> u32 {
    if participants <= 1 {
        0
    } else {
        usize::BITS - (participants - 1).leading_zeros()
    }
}

/// Builds the full match set for a tournament from its roster
pub struct BracketBuilder {
    rng: StdRng,
}

impl BracketBuilder {
    /// Builder shuffling with OS entropy
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Builder with a reproducible shuffle
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Shuffle the roster and lay out every round of the bracket
    ///
    /// Round one is seeded from consecutive shuffled entrants (match `k` gets
    /// positions `2k-1` and `2k`). Later rounds are created empty and filled as
    /// earlier matches resolve. A round-one match with a single entrant is a
    /// bye: it is decided up front and its entrant already sits in round two.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidState` - Tournament is not upcoming
    /// * `TournamentError::InsufficientParticipants` - Fewer than two entrants
    /// * `TournamentError::InvalidParticipantCount` - Roster size rejected by the format
    pub fn build(
        &mut self,
        tournament: &Tournament,
        roster: &[RosterEntry],
    ) -> TournamentResult<Vec<MatchSeed>> {
        if tournament.status != TournamentStatus::Upcoming {
            return Err(TournamentError::InvalidState {
                expected: TournamentStatus::Upcoming,
                actual: tournament.status,
            });
        }
        if roster.len() < MIN_PARTICIPANTS {
            return Err(TournamentError::InsufficientParticipants {
                needed: MIN_PARTICIPANTS,
                current: roster.len(),
            });
        }

        let rules = tournament.config.format.rules();
        rules.validate_roster(roster.len())?;

        let mut entrants: Vec<ParticipantId> = roster
            .iter()
            .map(|e| e.participant.id().to_string())
            .collect();
        entrants.shuffle(&mut self.rng);

        let mut seeds: Vec<MatchSeed> = rules
            .pair_round_one(entrants)
            .into_iter()
            .zip(1u32..)
            .map(|((player1, player2), order)| MatchSeed {
                key: MatchKey::new(1, order),
                winner: player2.is_none().then(|| player1.clone()),
                player1: Some(player1),
                player2,
            })
            .collect();

        let rounds = total_rounds(roster.len());
        let mut matches_in_round = seeds.len() as u32;
        for round in 2..=rounds {
            matches_in_round = matches_in_round.div_ceil(2);
            seeds.extend((1..=matches_in_round).map(|order| MatchSeed {
                key: MatchKey::new(round, order),
                player1: None,
                player2: None,
                winner: None,
            }));
        }

        let byes: Vec<(MatchKey, ParticipantId)> = seeds
            .iter()
            .filter_map(|s| s.winner.clone().map(|w| (s.key, w)))
            .collect();
        for (key, entrant) in byes {
            if let Some(next) = seeds.iter_mut().find(|s| s.key == key.next()) {
                next.set_slot(key.slot_in_next(), entrant);
            }
        }

        Ok(seeds)
    }
}

impl Default for BracketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// All matches of one tournament, addressable by id or bracket position
#[derive(Debug, Clone, Default)]
pub struct Bracket {
    matches: BTreeMap<MatchKey, Match>,
    ids: HashMap<MatchId, MatchKey>,
}

impl Bracket {
    pub fn new(matches: impl IntoIterator<Item = Match>) -> Self {
        let mut bracket = Self::default();
        for m in matches {
            bracket.insert(m);
        }
        bracket
    }

    pub fn insert(&mut self, m: Match) {
        self.ids.insert(m.id, m.key());
        self.matches.insert(m.key(), m);
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn get(&self, key: MatchKey) -> Option<&Match> {
        self.matches.get(&key)
    }

    pub fn get_mut(&mut self, key: MatchKey) -> Option<&mut Match> {
        self.matches.get_mut(&key)
    }

    pub fn by_id(&self, id: MatchId) -> Option<&Match> {
        self.ids.get(&id).and_then(|key| self.matches.get(key))
    }

    pub fn by_id_mut(&mut self, id: MatchId) -> Option<&mut Match> {
        let key = *self.ids.get(&id)?;
        self.matches.get_mut(&key)
    }

    /// Matches ordered by `(round, match_order)`
    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.matches.values()
    }

    /// Matches of a single round, in order
    pub fn round(&self, round: u32) -> impl Iterator<Item = &Match> {
        self.matches
            .range(MatchKey::new(round, 0)..=MatchKey::new(round, u32::MAX))
            .map(|(_, m)| m)
    }

    /// Highest round present
    pub fn rounds(&self) -> u32 {
        self.matches.keys().next_back().map_or(0, |k| k.round)
    }

    pub fn into_matches(self) -> Vec<Match> {
        self.matches.into_values().collect()
    }
}
