//! Tournament manager: lifecycle orchestration over a `TournamentRepository`.
//!
//! Status moves `upcoming → in-progress → completed → paid`, or
//! `upcoming → cancelled`. Operations on one tournament are serialized by a
//! per-tournament lock; each repository call is itself atomic.

use log::{debug, info, warn};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    advancer::{self, MatchOutcome},
    bracket::{Bracket, BracketBuilder},
    errors::{TournamentError, TournamentResult},
    models::{
        Match, MatchId, Participant, PlacementResult, RosterEntry, Tournament, TournamentConfig,
        TournamentId, TournamentStatus,
    },
    prizes::{self, PrizeDistributor},
    roster,
};
use crate::db::{MemoryTournamentRepository, PgTournamentRepository, TournamentRepository};

/// Result of a successful score report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreOutcome {
    pub match_id: MatchId,
    pub winner: String,
    /// Downstream match that received the winner
    pub advanced_to: Option<MatchId>,
    /// Whether this report finished the tournament
    pub completed: bool,
}

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    repo: Arc<dyn TournamentRepository>,
    locks: Arc<Mutex<HashMap<TournamentId, Arc<Mutex<()>>>>>,
    shuffle_seed: Option<u64>,
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(repo: Arc<dyn TournamentRepository>) -> Self {
        Self {
            repo,
            locks: Arc::new(Mutex::new(HashMap::new())),
            shuffle_seed: None,
        }
    }

    /// Manager backed by PostgreSQL
    pub fn postgres(pool: Arc<PgPool>) -> Self {
        Self::new(Arc::new(PgTournamentRepository::new(pool)))
    }

    /// Manager backed by process memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTournamentRepository::new()))
    }

    /// Use a fixed seed for roster shuffling
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    async fn lock(&self, id: TournamentId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Forget the lock of a tournament that reached a terminal status
    ///
    /// Later callers get a fresh lock, which is harmless because every
    /// operation on a paid or cancelled tournament is rejected by status.
    async fn release(&self, id: TournamentId) {
        self.locks.lock().await.remove(&id);
    }

    async fn load(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.repo
            .find_tournament(id)
            .await?
            .ok_or(TournamentError::TournamentNotFound(id))
    }

    /// Create a new tournament after validating its configuration
    pub async fn create_tournament(
        &self,
        config: TournamentConfig,
    ) -> TournamentResult<TournamentId> {
        config.validate()?;
        let tournament = self.repo.insert_tournament(&config).await?;

        info!(
            "Created tournament {} '{}' ({} format, max {} participants)",
            tournament.id,
            tournament.config.title,
            tournament.config.format,
            tournament.config.max_participants
        );
        Ok(tournament.id)
    }

    /// Register a participant
    ///
    /// # Errors
    ///
    /// * `TournamentError::WrongMode` - Team submitted to a player tournament or vice versa
    /// * `TournamentError::AlreadyRegistered` - Participant already on the roster
    /// * `TournamentError::TournamentFull` - Roster at capacity
    /// * `TournamentError::InvalidState` - Tournament no longer upcoming
    pub async fn join(
        &self,
        tournament_id: TournamentId,
        participant: Participant,
    ) -> TournamentResult<RosterEntry> {
        let _guard = self.lock(tournament_id).await;
        let tournament = self.load(tournament_id).await?;

        roster::check_mode(&tournament, &participant)?;
        roster::ensure_open(&tournament)?;

        let entry = self
            .repo
            .insert_roster_entry(tournament_id, &participant)
            .await
            .inspect_err(|e| {
                warn!(
                    "Tournament {tournament_id}: rejected {} {}: {e}",
                    participant.kind(),
                    participant.id()
                );
            })?;

        debug!(
            "Tournament {tournament_id}: registered {} {}",
            participant.kind(),
            participant.id()
        );
        Ok(entry)
    }

    /// Unregister a participant before the tournament starts
    pub async fn leave(
        &self,
        tournament_id: TournamentId,
        participant_id: &str,
    ) -> TournamentResult<()> {
        let _guard = self.lock(tournament_id).await;
        self.repo
            .delete_roster_entry(tournament_id, participant_id)
            .await?;

        debug!("Tournament {tournament_id}: unregistered {participant_id}");
        Ok(())
    }

    /// Start a tournament: shuffle the roster, build the bracket, go in-progress
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidState` - Tournament not upcoming
    /// * `TournamentError::InsufficientParticipants` - Fewer than two entrants
    /// * `TournamentError::InvalidParticipantCount` - Roster size not allowed by the format
    pub async fn start_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        let _guard = self.lock(tournament_id).await;
        let tournament = self.load(tournament_id).await?;
        let entries = self.repo.list_roster(tournament_id).await?;

        let mut builder = match self.shuffle_seed {
            Some(seed) => BracketBuilder::with_seed(seed),
            None => BracketBuilder::new(),
        };
        let seeds = builder.build(&tournament, &entries)?;
        let matches = self.repo.insert_bracket(tournament_id, &seeds).await?;

        info!(
            "Started tournament {tournament_id} with {} participants, {} matches",
            entries.len(),
            matches.len()
        );
        Ok(matches)
    }

    /// Report a match score and move the winner forward
    ///
    /// Reporting the final also writes placement results and moves the
    /// tournament to `completed`, then `paid`.
    ///
    /// # Errors
    ///
    /// * `TournamentError::TiedScore` - Scores are equal
    /// * `TournamentError::MatchNotFound` - Unknown match
    /// * `TournamentError::MatchAlreadyDecided` - Winner already recorded
    /// * `TournamentError::MatchNotReady` - A participant slot is still empty
    /// * `TournamentError::InvalidState` - Tournament not in progress
    pub async fn report_score(
        &self,
        match_id: MatchId,
        score1: i64,
        score2: i64,
    ) -> TournamentResult<ScoreOutcome> {
        if score1 == score2 {
            return Err(TournamentError::TiedScore(score1));
        }

        let tournament_id = self
            .repo
            .find_match(match_id)
            .await?
            .ok_or(TournamentError::MatchNotFound(match_id))?
            .tournament_id;

        let _guard = self.lock(tournament_id).await;
        let tournament = self.load(tournament_id).await?;
        if tournament.status != TournamentStatus::InProgress {
            return Err(TournamentError::InvalidState {
                expected: TournamentStatus::InProgress,
                actual: tournament.status,
            });
        }
        let total_rounds = tournament.total_rounds.ok_or_else(|| {
            TournamentError::CorruptRecord(format!(
                "tournament {tournament_id} is in progress without a bracket"
            ))
        })?;

        // Re-read under the lock; a concurrent report may have decided it.
        let current = self
            .repo
            .find_match(match_id)
            .await?
            .ok_or(TournamentError::MatchNotFound(match_id))?;
        let mut outcome = advancer::resolve(&current, score1, score2, total_rounds)?;

        let advanced_to = match &outcome.advance {
            Some(advance) => {
                let next = self
                    .repo
                    .find_match_at(tournament_id, advance.key)
                    .await?
                    .ok_or_else(|| {
                        TournamentError::CorruptRecord(format!(
                            "tournament {tournament_id} has no match at {}",
                            advance.key
                        ))
                    })?;
                Some(next.id)
            }
            None => {
                let mut bracket = Bracket::new(self.repo.list_matches(tournament_id).await?);
                if let Some(m) = bracket.by_id_mut(match_id) {
                    advancer::apply_result(m, &outcome);
                }
                outcome.settlement = Some(PrizeDistributor::new(&tournament).distribute(&bracket)?);
                None
            }
        };

        let settled = self.repo.commit_outcome(&outcome).await?;
        debug!(
            "Tournament {tournament_id}: match {match_id} ({}) won by {}",
            current.key(),
            outcome.winner
        );

        if settled && self.finish_payout(tournament_id, &outcome).await? {
            self.release(tournament_id).await;
        }

        Ok(ScoreOutcome {
            match_id,
            winner: outcome.winner,
            advanced_to,
            completed: settled,
        })
    }

    async fn finish_payout(
        &self,
        tournament_id: TournamentId,
        outcome: &MatchOutcome,
    ) -> TournamentResult<bool> {
        let rows = outcome.settlement.as_ref().map_or(0, Vec::len);
        info!(
            "Tournament {tournament_id} completed, champion {}, {rows} result rows",
            outcome.winner
        );
        let paid = self.repo.mark_paid(tournament_id).await?;
        if paid {
            info!("Tournament {tournament_id} marked paid");
        }
        Ok(paid)
    }

    /// Settle a tournament whose final is decided
    ///
    /// Recomputes payouts from the stored bracket. Results are written only
    /// while the tournament is still in progress, and `completed` is moved to
    /// `paid`, so repeated calls never duplicate rows.
    ///
    /// Returns whether anything changed.
    pub async fn distribute_prizes(&self, tournament_id: TournamentId) -> TournamentResult<bool> {
        let _guard = self.lock(tournament_id).await;
        let tournament = self.load(tournament_id).await?;

        match tournament.status {
            TournamentStatus::InProgress => {}
            TournamentStatus::Completed => {
                let paid = self.repo.mark_paid(tournament_id).await?;
                if paid {
                    info!("Tournament {tournament_id} marked paid");
                    self.release(tournament_id).await;
                }
                return Ok(paid);
            }
            _ => return Ok(false),
        }

        let bracket = Bracket::new(self.repo.list_matches(tournament_id).await?);
        let final_decided = tournament
            .total_rounds
            .and_then(|rounds| bracket.round(rounds).next())
            .is_some_and(Match::is_decided);
        if !final_decided {
            return Ok(false);
        }

        let results = PrizeDistributor::new(&tournament).distribute(&bracket)?;
        if !self.repo.record_results(tournament_id, &results).await? {
            return Ok(false);
        }
        self.repo.mark_paid(tournament_id).await?;
        self.release(tournament_id).await;

        info!(
            "Tournament {tournament_id} settled, {} result rows",
            results.len()
        );
        Ok(true)
    }

    /// Cancel an upcoming tournament
    pub async fn cancel_tournament(&self, tournament_id: TournamentId) -> TournamentResult<()> {
        let _guard = self.lock(tournament_id).await;
        self.repo.cancel_tournament(tournament_id).await?;
        self.release(tournament_id).await;

        info!("Cancelled tournament {tournament_id}");
        Ok(())
    }

    /// Get tournament information
    pub async fn get_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.load(tournament_id).await
    }

    /// List all tournaments
    pub async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        self.repo.list_tournaments(status).await
    }

    /// Get tournament registrations
    pub async fn get_roster(&self, tournament_id: TournamentId) -> TournamentResult<Vec<RosterEntry>> {
        self.load(tournament_id).await?;
        self.repo.list_roster(tournament_id).await
    }

    /// Matches ordered by round and match order
    pub async fn get_bracket(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        self.load(tournament_id).await?;
        self.repo.list_matches(tournament_id).await
    }

    pub async fn get_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        self.repo
            .find_match(match_id)
            .await?
            .ok_or(TournamentError::MatchNotFound(match_id))
    }

    /// Placement results, empty until the tournament completes
    pub async fn get_results(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<PlacementResult>> {
        self.load(tournament_id).await?;
        self.repo.list_results(tournament_id).await
    }

    pub async fn prize_pool(&self, tournament_id: TournamentId) -> TournamentResult<Decimal> {
        let tournament = self.load(tournament_id).await?;
        prizes::prize_pool(&tournament.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::ParticipantKind;

    fn config(max: usize) -> TournamentConfig {
        TournamentConfig::single_elimination("Unit Cup".to_string(), max, Decimal::from(10))
    }

    async fn started(max: usize) -> (TournamentManager, TournamentId, Vec<Match>) {
        let manager = TournamentManager::in_memory().with_shuffle_seed(11);
        let id = manager.create_tournament(config(max)).await.unwrap();
        for i in 0..max {
            manager
                .join(id, Participant::new(ParticipantKind::Player, format!("p{i}")))
                .await
                .unwrap();
        }
        let matches = manager.start_tournament(id).await.unwrap();
        (manager, id, matches)
    }

    #[tokio::test]
    async fn test_unknown_tournament() {
        let manager = TournamentManager::in_memory();
        assert!(matches!(
            manager.start_tournament(99).await,
            Err(TournamentError::TournamentNotFound(99))
        ));
        assert!(matches!(
            manager.join(99, Participant::Player("x".into())).await,
            Err(TournamentError::TournamentNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_unknown_match() {
        let manager = TournamentManager::in_memory();
        assert!(matches!(
            manager.report_score(5, 1, 0).await,
            Err(TournamentError::MatchNotFound(5))
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_not_stored() {
        let manager = TournamentManager::in_memory();
        let result = manager.create_tournament(config(6)).await;
        assert!(matches!(
            result,
            Err(TournamentError::InvalidParticipantCount { count: 6, .. })
        ));
        assert!(manager.list_tournaments(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_team_into_player_tournament() {
        let manager = TournamentManager::in_memory();
        let id = manager.create_tournament(config(4)).await.unwrap();
        let err = manager
            .join(id, Participant::Team("squad".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::WrongMode { .. }));
        assert!(manager.get_roster(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_winner_propagates_to_next_round() {
        let (manager, id, matches) = started(4).await;
        let first = &matches[0];
        let outcome = manager.report_score(first.id, 3, 1).await.unwrap();

        assert_eq!(Some(&outcome.winner), first.player1.as_ref());
        assert!(!outcome.completed);

        let final_match = manager.get_match(outcome.advanced_to.unwrap()).await.unwrap();
        assert_eq!(final_match.round, 2);
        assert_eq!(final_match.player1, first.player1);
        assert_eq!(final_match.player2, None);
        assert_eq!(
            manager.get_tournament(id).await.unwrap().status,
            TournamentStatus::InProgress
        );
    }

    #[tokio::test]
    async fn test_report_after_completion_rejected() {
        let (manager, id, _) = started(2).await;
        let final_id = manager.get_bracket(id).await.unwrap()[0].id;

        assert!(manager.report_score(final_id, 1, 0).await.unwrap().completed);
        assert!(matches!(
            manager.report_score(final_id, 1, 0).await,
            Err(TournamentError::InvalidState { .. })
        ));
        assert_eq!(manager.get_results(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_distribute_prizes_before_final_is_noop() {
        let (manager, id, _) = started(4).await;
        assert!(!manager.distribute_prizes(id).await.unwrap());
        assert!(manager.get_results(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_only_from_upcoming() {
        let manager = TournamentManager::in_memory();
        let id = manager.create_tournament(config(4)).await.unwrap();
        manager.cancel_tournament(id).await.unwrap();
        assert_eq!(
            manager.get_tournament(id).await.unwrap().status,
            TournamentStatus::Cancelled
        );
        assert!(matches!(
            manager.join(id, Participant::Player("late".into())).await,
            Err(TournamentError::InvalidState { .. })
        ));

        let (manager, id, _) = started(2).await;
        assert!(matches!(
            manager.cancel_tournament(id).await,
            Err(TournamentError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_locks_dropped_for_finished_tournaments() {
        let (manager, id, matches) = started(2).await;
        assert!(manager.locks.lock().await.contains_key(&id));

        manager.report_score(matches[0].id, 2, 1).await.unwrap();
        assert!(!manager.locks.lock().await.contains_key(&id));

        let cancelled = manager.create_tournament(config(4)).await.unwrap();
        manager
            .join(cancelled, Participant::Player("x".into()))
            .await
            .unwrap();
        assert!(manager.locks.lock().await.contains_key(&cancelled));
        manager.cancel_tournament(cancelled).await.unwrap();
        assert!(manager.locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_huge_capacity_rejected_before_storage() {
        let manager = TournamentManager::in_memory();
        let result = manager.create_tournament(config(1 << 40)).await;
        assert!(matches!(result, Err(TournamentError::InvalidConfig(_))));
        assert!(manager.list_tournaments(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overflowing_fee_rejected_before_storage() {
        let manager = TournamentManager::in_memory();
        let config = TournamentConfig::single_elimination("Rich".to_string(), 16, Decimal::MAX);
        assert!(matches!(
            manager.create_tournament(config).await,
            Err(TournamentError::PrizePoolOverflow)
        ));
        assert!(manager.list_tournaments(None).await.unwrap().is_empty());
    }
}
