//! In-memory `TournamentRepository`.
//!
//! All state sits behind one `RwLock`; each trait method takes the write lock
//! for its whole duration, which makes every method a single atomic unit.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::repository::TournamentRepository;
use crate::tournament::{
    Bracket, Match, MatchId, MatchKey, MatchOutcome, MatchSeed, Participant, PlacementResult,
    Roster, RosterEntry, Tournament, TournamentConfig, TournamentError, TournamentId,
    TournamentResult, TournamentStatus, roster,
};

#[derive(Default)]
struct MemoryState {
    next_tournament_id: TournamentId,
    next_match_id: MatchId,
    tournaments: HashMap<TournamentId, Tournament>,
    rosters: HashMap<TournamentId, Roster>,
    brackets: HashMap<TournamentId, Bracket>,
    match_owners: HashMap<MatchId, TournamentId>,
    results: HashMap<TournamentId, Vec<PlacementResult>>,
}

impl MemoryState {
    fn tournament(&self, id: TournamentId) -> TournamentResult<&Tournament> {
        self.tournaments
            .get(&id)
            .ok_or(TournamentError::TournamentNotFound(id))
    }

    fn tournament_mut(&mut self, id: TournamentId) -> TournamentResult<&mut Tournament> {
        self.tournaments
            .get_mut(&id)
            .ok_or(TournamentError::TournamentNotFound(id))
    }

    fn settle(&mut self, id: TournamentId, results: &[PlacementResult]) -> TournamentResult<bool> {
        let tournament = self.tournament_mut(id)?;
        if tournament.status != TournamentStatus::InProgress {
            return Ok(false);
        }
        tournament.status = TournamentStatus::Completed;
        tournament.finished_at = Some(Utc::now());
        self.results.entry(id).or_default().extend_from_slice(results);
        Ok(true)
    }
}

/// Tournament storage kept in process memory
#[derive(Default)]
pub struct MemoryTournamentRepository {
    state: RwLock<MemoryState>,
}

impl MemoryTournamentRepository {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                next_tournament_id: 1,
                next_match_id: 1,
                ..MemoryState::default()
            }),
        }
    }
}

#[async_trait]
impl TournamentRepository for MemoryTournamentRepository {
    async fn insert_tournament(&self, config: &TournamentConfig) -> TournamentResult<Tournament> {
        let mut state = self.state.write().await;
        let id = state.next_tournament_id.max(1);
        state.next_tournament_id = id + 1;

        let tournament = Tournament {
            id,
            config: config.clone(),
            status: TournamentStatus::Upcoming,
            registered_count: 0,
            total_rounds: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        };
        state
            .rosters
            .insert(id, Roster::new(config.max_participants));
        state.tournaments.insert(id, tournament.clone());

        Ok(tournament)
    }

    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        Ok(self.state.read().await.tournaments.get(&id).cloned())
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        let state = self.state.read().await;
        let mut tournaments: Vec<Tournament> = state
            .tournaments
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        tournaments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tournaments)
    }

    async fn list_roster(&self, id: TournamentId) -> TournamentResult<Vec<RosterEntry>> {
        let state = self.state.read().await;
        Ok(state
            .rosters
            .get(&id)
            .map(|r| r.entries().to_vec())
            .unwrap_or_default())
    }

    async fn insert_roster_entry(
        &self,
        id: TournamentId,
        participant: &Participant,
    ) -> TournamentResult<RosterEntry> {
        let mut state = self.state.write().await;
        roster::ensure_open(state.tournament(id)?)?;

        let entry = RosterEntry {
            tournament_id: id,
            participant: participant.clone(),
            registered_at: Utc::now(),
        };
        let entry = state
            .rosters
            .entry(id)
            .or_default()
            .admit(entry)?
            .clone();

        state.tournament_mut(id)?.registered_count += 1;
        Ok(entry)
    }

    async fn delete_roster_entry(
        &self,
        id: TournamentId,
        participant_id: &str,
    ) -> TournamentResult<()> {
        let mut state = self.state.write().await;
        roster::ensure_open(state.tournament(id)?)?;

        state
            .rosters
            .get_mut(&id)
            .and_then(|r| r.remove(participant_id))
            .ok_or_else(|| TournamentError::ParticipantNotFound {
                tournament_id: id,
                participant_id: participant_id.to_string(),
            })?;

        let tournament = state.tournament_mut(id)?;
        tournament.registered_count = tournament.registered_count.saturating_sub(1);
        Ok(())
    }

    async fn insert_bracket(
        &self,
        id: TournamentId,
        seeds: &[MatchSeed],
    ) -> TournamentResult<Vec<Match>> {
        let mut state = self.state.write().await;
        let status = state.tournament(id)?.status;
        if status != TournamentStatus::Upcoming {
            return Err(TournamentError::InvalidState {
                expected: TournamentStatus::Upcoming,
                actual: status,
            });
        }

        let first_id = state.next_match_id.max(1);
        let matches: Vec<Match> = seeds
            .iter()
            .zip(first_id..)
            .map(|(seed, match_id)| Match {
                id: match_id,
                tournament_id: id,
                round: seed.key.round,
                match_order: seed.key.match_order,
                player1: seed.player1.clone(),
                player2: seed.player2.clone(),
                winner: seed.winner.clone(),
                score1: None,
                score2: None,
                reported_at: None,
            })
            .collect();

        state.next_match_id = first_id + matches.len() as MatchId;
        for m in &matches {
            state.match_owners.insert(m.id, id);
        }
        state.brackets.insert(id, Bracket::new(matches.iter().cloned()));

        let tournament = state.tournament_mut(id)?;
        tournament.status = TournamentStatus::InProgress;
        tournament.total_rounds = seeds.iter().map(|s| s.key.round).max();
        tournament.started_at = Some(Utc::now());

        Ok(matches)
    }

    async fn find_match(&self, match_id: MatchId) -> TournamentResult<Option<Match>> {
        let state = self.state.read().await;
        Ok(state
            .match_owners
            .get(&match_id)
            .and_then(|t| state.brackets.get(t))
            .and_then(|b| b.by_id(match_id))
            .cloned())
    }

    async fn find_match_at(
        &self,
        id: TournamentId,
        key: MatchKey,
    ) -> TournamentResult<Option<Match>> {
        let state = self.state.read().await;
        Ok(state.brackets.get(&id).and_then(|b| b.get(key)).cloned())
    }

    async fn list_matches(&self, id: TournamentId) -> TournamentResult<Vec<Match>> {
        let state = self.state.read().await;
        Ok(state
            .brackets
            .get(&id)
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn commit_outcome(&self, outcome: &MatchOutcome) -> TournamentResult<bool> {
        let mut state = self.state.write().await;
        let id = outcome.tournament_id;

        let status = state.tournament(id)?.status;
        if status != TournamentStatus::InProgress {
            return Err(TournamentError::InvalidState {
                expected: TournamentStatus::InProgress,
                actual: status,
            });
        }

        let bracket = state
            .brackets
            .get_mut(&id)
            .ok_or(TournamentError::MatchNotFound(outcome.match_id))?;

        // Validate both writes before applying either.
        let decided = bracket
            .by_id(outcome.match_id)
            .ok_or(TournamentError::MatchNotFound(outcome.match_id))?
            .is_decided();
        if decided {
            return Err(TournamentError::MatchAlreadyDecided(outcome.match_id));
        }
        if let Some(advance) = &outcome.advance {
            if bracket.get(advance.key).is_none() {
                return Err(TournamentError::CorruptRecord(format!(
                    "tournament {id} has no match at {}",
                    advance.key
                )));
            }
        }

        if let Some(m) = bracket.by_id_mut(outcome.match_id) {
            crate::tournament::advancer::apply_result(m, outcome);
        }
        if let Some(advance) = &outcome.advance {
            if let Some(next) = bracket.get_mut(advance.key) {
                next.set_slot(advance.slot, advance.participant.clone());
            }
        }

        match &outcome.settlement {
            Some(results) => state.settle(id, results),
            None => Ok(false),
        }
    }

    async fn record_results(
        &self,
        id: TournamentId,
        results: &[PlacementResult],
    ) -> TournamentResult<bool> {
        self.state.write().await.settle(id, results)
    }

    async fn mark_paid(&self, id: TournamentId) -> TournamentResult<bool> {
        let mut state = self.state.write().await;
        let tournament = state.tournament_mut(id)?;
        if tournament.status != TournamentStatus::Completed {
            return Ok(false);
        }
        tournament.status = TournamentStatus::Paid;
        Ok(true)
    }

    async fn list_results(&self, id: TournamentId) -> TournamentResult<Vec<PlacementResult>> {
        let state = self.state.read().await;
        Ok(state.results.get(&id).cloned().unwrap_or_default())
    }

    async fn cancel_tournament(&self, id: TournamentId) -> TournamentResult<()> {
        let mut state = self.state.write().await;
        let tournament = state.tournament_mut(id)?;
        if tournament.status != TournamentStatus::Upcoming {
            return Err(TournamentError::InvalidState {
                expected: TournamentStatus::Upcoming,
                actual: tournament.status,
            });
        }
        tournament.status = TournamentStatus::Cancelled;
        tournament.finished_at = Some(Utc::now());
        Ok(())
    }
}
