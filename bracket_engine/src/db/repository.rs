//! Repository trait for tournament persistence and its PostgreSQL implementation.
//!
//! Every method is one atomic unit: either all of its writes land or none do.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use std::sync::Arc;

use crate::tournament::{
    Match, MatchId, MatchKey, MatchOutcome, MatchSeed, Participant, ParticipantKind,
    PlacementResult, RosterEntry, Slot, Tournament, TournamentConfig, TournamentError,
    TournamentId, TournamentResult, TournamentStatus,
};

/// Persistence operations the tournament engine needs
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Store a new tournament in `upcoming` status
    async fn insert_tournament(&self, config: &TournamentConfig) -> TournamentResult<Tournament>;

    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>>;

    /// List tournaments, newest first
    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>>;

    /// Roster in registration order
    async fn list_roster(&self, id: TournamentId) -> TournamentResult<Vec<RosterEntry>>;

    /// Register a participant
    ///
    /// Status, uniqueness and capacity are checked in the same unit as the
    /// insert, so concurrent joiners can never overfill the roster.
    async fn insert_roster_entry(
        &self,
        id: TournamentId,
        participant: &Participant,
    ) -> TournamentResult<RosterEntry>;

    /// Unregister a participant from an upcoming tournament
    async fn delete_roster_entry(
        &self,
        id: TournamentId,
        participant_id: &str,
    ) -> TournamentResult<()>;

    /// Insert all matches and move the tournament from `upcoming` to `in-progress`
    async fn insert_bracket(
        &self,
        id: TournamentId,
        seeds: &[MatchSeed],
    ) -> TournamentResult<Vec<Match>>;

    async fn find_match(&self, match_id: MatchId) -> TournamentResult<Option<Match>>;

    /// Single-key lookup by bracket position
    async fn find_match_at(
        &self,
        id: TournamentId,
        key: MatchKey,
    ) -> TournamentResult<Option<Match>>;

    /// Matches ordered by `(round, match_order)`
    async fn list_matches(&self, id: TournamentId) -> TournamentResult<Vec<Match>>;

    /// Record scores and winner, write the winner's downstream slot and, for
    /// the final, the settlement
    ///
    /// Returns whether placement results were written.
    async fn commit_outcome(&self, outcome: &MatchOutcome) -> TournamentResult<bool>;

    /// Write results and move `in-progress` to `completed`
    ///
    /// Returns `false` without writing anything when the tournament is not in
    /// progress (already settled or never started).
    async fn record_results(
        &self,
        id: TournamentId,
        results: &[PlacementResult],
    ) -> TournamentResult<bool>;

    /// Move `completed` to `paid`; `false` if the tournament was not completed
    async fn mark_paid(&self, id: TournamentId) -> TournamentResult<bool>;

    async fn list_results(&self, id: TournamentId) -> TournamentResult<Vec<PlacementResult>>;

    /// Move `upcoming` to `cancelled`
    async fn cancel_tournament(&self, id: TournamentId) -> TournamentResult<()>;
}

/// PostgreSQL implementation of `TournamentRepository`
#[derive(Clone)]
pub struct PgTournamentRepository {
    pool: Arc<PgPool>,
}

impl PgTournamentRepository {
    /// Tables used by this repository
    pub const SCHEMA: &'static str = r#"
        CREATE TABLE IF NOT EXISTS tournaments (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            config JSONB NOT NULL,
            status TEXT NOT NULL DEFAULT 'upcoming',
            max_participants INTEGER NOT NULL,
            registered_count INTEGER NOT NULL DEFAULT 0,
            total_rounds INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT NOW(),
            started_at TIMESTAMP,
            finished_at TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS tournament_registrations (
            tournament_id BIGINT NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
            participant_id TEXT NOT NULL,
            participant_kind TEXT NOT NULL,
            registered_at TIMESTAMP NOT NULL DEFAULT NOW(),
            PRIMARY KEY (tournament_id, participant_id)
        );

        CREATE TABLE IF NOT EXISTS tournament_matches (
            id BIGSERIAL PRIMARY KEY,
            tournament_id BIGINT NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
            round INTEGER NOT NULL,
            match_order INTEGER NOT NULL,
            player1_id TEXT,
            player2_id TEXT,
            winner_id TEXT,
            score1 BIGINT,
            score2 BIGINT,
            reported_at TIMESTAMP,
            UNIQUE (tournament_id, round, match_order),
            CHECK (score1 IS NULL OR score2 IS NULL OR score1 <> score2)
        );

        CREATE TABLE IF NOT EXISTS tournament_results (
            id BIGSERIAL PRIMARY KEY,
            tournament_id BIGINT NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
            participant_id TEXT NOT NULL,
            placement INTEGER NOT NULL,
            prize NUMERIC NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT NOW()
        );
    "#;

    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create the tournament tables if they do not exist
    pub async fn ensure_schema(&self) -> TournamentResult<()> {
        sqlx::raw_sql(Self::SCHEMA).execute(self.pool.as_ref()).await?;
        Ok(())
    }

    /// Lock the tournament row for the rest of the transaction
    async fn lock_tournament(
        tx: &mut Transaction<'_, Postgres>,
        id: TournamentId,
    ) -> TournamentResult<Tournament> {
        let row = sqlx::query(
            r#"
            SELECT id, config, status, registered_count, total_rounds,
                   created_at, started_at, finished_at
            FROM tournaments
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(TournamentError::TournamentNotFound(id))?;

        tournament_from_row(&row)
    }

    async fn settle(
        tx: &mut Transaction<'_, Postgres>,
        id: TournamentId,
        results: &[PlacementResult],
    ) -> TournamentResult<bool> {
        let updated = sqlx::query(
            "UPDATE tournaments SET status = $1, finished_at = NOW() WHERE id = $2 AND status = $3",
        )
        .bind(TournamentStatus::Completed.as_str())
        .bind(id)
        .bind(TournamentStatus::InProgress.as_str())
        .execute(&mut **tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(false);
        }

        for result in results {
            sqlx::query(
                r#"
                INSERT INTO tournament_results (tournament_id, participant_id, placement, prize)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(result.tournament_id)
            .bind(&result.participant_id)
            .bind(result.placement as i32)
            .bind(result.prize)
            .execute(&mut **tx)
            .await?;
        }

        Ok(true)
    }
}

fn tournament_from_row(row: &PgRow) -> TournamentResult<Tournament> {
    let config: TournamentConfig = serde_json::from_value(row.get("config"))?;
    let status: String = row.get("status");
    let registered_count: i32 = row.get("registered_count");

    Ok(Tournament {
        id: row.get("id"),
        config,
        status: status.parse()?,
        registered_count: registered_count as usize,
        total_rounds: row
            .get::<Option<i32>, _>("total_rounds")
            .map(|r| r as u32),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        started_at: row
            .get::<Option<chrono::NaiveDateTime>, _>("started_at")
            .map(|dt| dt.and_utc()),
        finished_at: row
            .get::<Option<chrono::NaiveDateTime>, _>("finished_at")
            .map(|dt| dt.and_utc()),
    })
}

fn match_from_row(row: &PgRow) -> Match {
    Match {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        round: row.get::<i32, _>("round") as u32,
        match_order: row.get::<i32, _>("match_order") as u32,
        player1: row.get("player1_id"),
        player2: row.get("player2_id"),
        winner: row.get("winner_id"),
        score1: row.get("score1"),
        score2: row.get("score2"),
        reported_at: row
            .get::<Option<chrono::NaiveDateTime>, _>("reported_at")
            .map(|dt| dt.and_utc()),
    }
}

fn roster_entry_from_row(row: &PgRow) -> TournamentResult<RosterEntry> {
    let kind: ParticipantKind = row.get::<String, _>("participant_kind").parse()?;
    Ok(RosterEntry {
        tournament_id: row.get("tournament_id"),
        participant: Participant::new(kind, row.get::<String, _>("participant_id")),
        registered_at: row
            .get::<chrono::NaiveDateTime, _>("registered_at")
            .and_utc(),
    })
}

const MATCH_COLUMNS: &str = "id, tournament_id, round, match_order, player1_id, player2_id, \
                             winner_id, score1, score2, reported_at";

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn insert_tournament(&self, config: &TournamentConfig) -> TournamentResult<Tournament> {
        let config_json = serde_json::to_value(config)?;

        let row = sqlx::query(
            r#"
            INSERT INTO tournaments (title, config, status, max_participants)
            VALUES ($1, $2, $3, $4)
            RETURNING id, config, status, registered_count, total_rounds,
                      created_at, started_at, finished_at
            "#,
        )
        .bind(&config.title)
        .bind(config_json)
        .bind(TournamentStatus::Upcoming.as_str())
        .bind(config.max_participants as i32)
        .fetch_one(self.pool.as_ref())
        .await?;

        tournament_from_row(&row)
    }

    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        let row = sqlx::query(
            r#"
            SELECT id, config, status, registered_count, total_rounds,
                   created_at, started_at, finished_at
            FROM tournaments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        let rows = sqlx::query(
            r#"
            SELECT id, config, status, registered_count, total_rounds,
                   created_at, started_at, finished_at
            FROM tournaments
            WHERE $1::TEXT IS NULL OR status = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(tournament_from_row).collect()
    }

    async fn list_roster(&self, id: TournamentId) -> TournamentResult<Vec<RosterEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT tournament_id, participant_id, participant_kind, registered_at
            FROM tournament_registrations
            WHERE tournament_id = $1
            ORDER BY registered_at, participant_id
            "#,
        )
        .bind(id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(roster_entry_from_row).collect()
    }

    async fn insert_roster_entry(
        &self,
        id: TournamentId,
        participant: &Participant,
    ) -> TournamentResult<RosterEntry> {
        let mut tx = self.pool.begin().await?;

        let tournament = Self::lock_tournament(&mut tx, id).await?;
        crate::tournament::roster::ensure_open(&tournament)?;

        let existing = sqlx::query(
            "SELECT 1 FROM tournament_registrations WHERE tournament_id = $1 AND participant_id = $2",
        )
        .bind(id)
        .bind(participant.id())
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_some() {
            return Err(TournamentError::AlreadyRegistered);
        }
        if tournament.registered_count >= tournament.config.max_participants {
            return Err(TournamentError::TournamentFull);
        }

        let row = sqlx::query(
            r#"
            INSERT INTO tournament_registrations (tournament_id, participant_id, participant_kind)
            VALUES ($1, $2, $3)
            RETURNING tournament_id, participant_id, participant_kind, registered_at
            "#,
        )
        .bind(id)
        .bind(participant.id())
        .bind(participant.kind().as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                TournamentError::AlreadyRegistered
            }
            other => TournamentError::Database(other),
        })?;

        sqlx::query("UPDATE tournaments SET registered_count = registered_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let entry = roster_entry_from_row(&row)?;
        tx.commit().await?;

        Ok(entry)
    }

    async fn delete_roster_entry(
        &self,
        id: TournamentId,
        participant_id: &str,
    ) -> TournamentResult<()> {
        let mut tx = self.pool.begin().await?;

        let tournament = Self::lock_tournament(&mut tx, id).await?;
        crate::tournament::roster::ensure_open(&tournament)?;

        let result = sqlx::query(
            "DELETE FROM tournament_registrations WHERE tournament_id = $1 AND participant_id = $2",
        )
        .bind(id)
        .bind(participant_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TournamentError::ParticipantNotFound {
                tournament_id: id,
                participant_id: participant_id.to_string(),
            });
        }

        sqlx::query("UPDATE tournaments SET registered_count = registered_count - 1 WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_bracket(
        &self,
        id: TournamentId,
        seeds: &[MatchSeed],
    ) -> TournamentResult<Vec<Match>> {
        let mut tx = self.pool.begin().await?;

        let tournament = Self::lock_tournament(&mut tx, id).await?;
        if tournament.status != TournamentStatus::Upcoming {
            return Err(TournamentError::InvalidState {
                expected: TournamentStatus::Upcoming,
                actual: tournament.status,
            });
        }

        let mut matches = Vec::with_capacity(seeds.len());
        for seed in seeds {
            let row = sqlx::query(&format!(
                r#"
                INSERT INTO tournament_matches (tournament_id, round, match_order, player1_id, player2_id, winner_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {MATCH_COLUMNS}
                "#
            ))
            .bind(id)
            .bind(seed.key.round as i32)
            .bind(seed.key.match_order as i32)
            .bind(&seed.player1)
            .bind(&seed.player2)
            .bind(&seed.winner)
            .fetch_one(&mut *tx)
            .await?;
            matches.push(match_from_row(&row));
        }

        let rounds = seeds.iter().map(|s| s.key.round).max().unwrap_or(0);
        sqlx::query(
            "UPDATE tournaments SET status = $1, total_rounds = $2, started_at = NOW() WHERE id = $3",
        )
        .bind(TournamentStatus::InProgress.as_str())
        .bind(rounds as i32)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(matches)
    }

    async fn find_match(&self, match_id: MatchId) -> TournamentResult<Option<Match>> {
        let row = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM tournament_matches WHERE id = $1"
        ))
        .bind(match_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.as_ref().map(match_from_row))
    }

    async fn find_match_at(
        &self,
        id: TournamentId,
        key: MatchKey,
    ) -> TournamentResult<Option<Match>> {
        let row = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM tournament_matches \
             WHERE tournament_id = $1 AND round = $2 AND match_order = $3"
        ))
        .bind(id)
        .bind(key.round as i32)
        .bind(key.match_order as i32)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.as_ref().map(match_from_row))
    }

    async fn list_matches(&self, id: TournamentId) -> TournamentResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM tournament_matches \
             WHERE tournament_id = $1 ORDER BY round, match_order"
        ))
        .bind(id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(match_from_row).collect())
    }

    async fn commit_outcome(&self, outcome: &MatchOutcome) -> TournamentResult<bool> {
        let mut tx = self.pool.begin().await?;

        let tournament = Self::lock_tournament(&mut tx, outcome.tournament_id).await?;
        if tournament.status != TournamentStatus::InProgress {
            return Err(TournamentError::InvalidState {
                expected: TournamentStatus::InProgress,
                actual: tournament.status,
            });
        }

        let updated = sqlx::query(
            r#"
            UPDATE tournament_matches
            SET score1 = $1, score2 = $2, winner_id = $3, reported_at = $4
            WHERE id = $5 AND winner_id IS NULL
            "#,
        )
        .bind(outcome.score1)
        .bind(outcome.score2)
        .bind(&outcome.winner)
        .bind(outcome.reported_at.naive_utc())
        .bind(outcome.match_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(TournamentError::MatchAlreadyDecided(outcome.match_id));
        }

        if let Some(advance) = &outcome.advance {
            // Only the winner's own column is written; the sibling slot is untouched.
            let query = match advance.slot {
                Slot::One => {
                    "UPDATE tournament_matches SET player1_id = $1 \
                     WHERE tournament_id = $2 AND round = $3 AND match_order = $4"
                }
                Slot::Two => {
                    "UPDATE tournament_matches SET player2_id = $1 \
                     WHERE tournament_id = $2 AND round = $3 AND match_order = $4"
                }
            };
            let written = sqlx::query(query)
                .bind(&advance.participant)
                .bind(outcome.tournament_id)
                .bind(advance.key.round as i32)
                .bind(advance.key.match_order as i32)
                .execute(&mut *tx)
                .await?;

            if written.rows_affected() == 0 {
                return Err(TournamentError::CorruptRecord(format!(
                    "tournament {} has no match at {}",
                    outcome.tournament_id, advance.key
                )));
            }
        }

        let settled = match &outcome.settlement {
            Some(results) => Self::settle(&mut tx, outcome.tournament_id, results).await?,
            None => false,
        };

        tx.commit().await?;
        Ok(settled)
    }

    async fn record_results(
        &self,
        id: TournamentId,
        results: &[PlacementResult],
    ) -> TournamentResult<bool> {
        let mut tx = self.pool.begin().await?;
        Self::lock_tournament(&mut tx, id).await?;
        let settled = Self::settle(&mut tx, id, results).await?;
        tx.commit().await?;
        Ok(settled)
    }

    async fn mark_paid(&self, id: TournamentId) -> TournamentResult<bool> {
        let updated = sqlx::query("UPDATE tournaments SET status = $1 WHERE id = $2 AND status = $3")
            .bind(TournamentStatus::Paid.as_str())
            .bind(id)
            .bind(TournamentStatus::Completed.as_str())
            .execute(self.pool.as_ref())
            .await?;

        Ok(updated.rows_affected() == 1)
    }

    async fn list_results(&self, id: TournamentId) -> TournamentResult<Vec<PlacementResult>> {
        let rows = sqlx::query(
            r#"
            SELECT tournament_id, participant_id, placement, prize
            FROM tournament_results
            WHERE tournament_id = $1
            ORDER BY placement, id
            "#,
        )
        .bind(id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .iter()
            .map(|row| PlacementResult {
                tournament_id: row.get("tournament_id"),
                participant_id: row.get("participant_id"),
                placement: row.get::<i32, _>("placement") as u32,
                prize: row.get("prize"),
            })
            .collect())
    }

    async fn cancel_tournament(&self, id: TournamentId) -> TournamentResult<()> {
        let mut tx = self.pool.begin().await?;

        let tournament = Self::lock_tournament(&mut tx, id).await?;
        if tournament.status != TournamentStatus::Upcoming {
            return Err(TournamentError::InvalidState {
                expected: TournamentStatus::Upcoming,
                actual: tournament.status,
            });
        }

        sqlx::query("UPDATE tournaments SET status = $1, finished_at = NOW() WHERE id = $2")
            .bind(TournamentStatus::Cancelled.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
