//! Tournament data models: configuration, participants, matches and payouts.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bracket::MAX_PARTICIPANTS;
use super::errors::{TournamentError, TournamentResult};
use super::format::FormatRules;
use super::prizes;

/// Tournament ID type
pub type TournamentId = i64;

/// Match ID type
pub type MatchId = i64;

/// Opaque participant identifier (wallet-style address or team identifier)
pub type ParticipantId = String;

/// Tournament lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Accepting registrations
    Upcoming,
    /// Bracket built, matches being played
    InProgress,
    /// Final match resolved and results recorded
    Completed,
    /// Payouts handed off for settlement
    Paid,
    /// Cancelled before start
    Cancelled,
}

impl TournamentStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Upcoming => "upcoming",
            TournamentStatus::InProgress => "in_progress",
            TournamentStatus::Completed => "completed",
            TournamentStatus::Paid => "paid",
            TournamentStatus::Cancelled => "cancelled",
        }
    }

    /// Whether placement results have already been written
    pub fn is_settled(&self) -> bool {
        matches!(self, TournamentStatus::Completed | TournamentStatus::Paid)
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentStatus {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(TournamentStatus::Upcoming),
            "in_progress" => Ok(TournamentStatus::InProgress),
            "completed" => Ok(TournamentStatus::Completed),
            "paid" => Ok(TournamentStatus::Paid),
            "cancelled" => Ok(TournamentStatus::Cancelled),
            other => Err(TournamentError::CorruptRecord(format!(
                "unknown tournament status '{other}'"
            ))),
        }
    }
}

/// Tournament format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    /// Single-elimination bracket
    Bracket,
    /// Host-defined format; pairs like a bracket but accepts any roster size
    Custom,
}

impl fmt::Display for TournamentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TournamentFormat::Bracket => f.write_str("bracket"),
            TournamentFormat::Custom => f.write_str("custom"),
        }
    }
}

/// Kind of entity that registers for a tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    Player,
    Team,
}

impl ParticipantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantKind::Player => "player",
            ParticipantKind::Team => "team",
        }
    }
}

impl fmt::Display for ParticipantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantKind {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player" => Ok(ParticipantKind::Player),
            "team" => Ok(ParticipantKind::Team),
            other => Err(TournamentError::CorruptRecord(format!(
                "unknown participant kind '{other}'"
            ))),
        }
    }
}

/// A registered entrant: either a single player or a team
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Participant {
    Player(ParticipantId),
    Team(ParticipantId),
}

impl Participant {
    /// Build a participant from its kind and identifier
    pub fn new(kind: ParticipantKind, id: impl Into<ParticipantId>) -> Self {
        match kind {
            ParticipantKind::Player => Participant::Player(id.into()),
            ParticipantKind::Team => Participant::Team(id.into()),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Participant::Player(id) | Participant::Team(id) => id,
        }
    }

    pub fn kind(&self) -> ParticipantKind {
        match self {
            Participant::Player(_) => ParticipantKind::Player,
            Participant::Team(_) => ParticipantKind::Team,
        }
    }
}

/// Share of the prize pool (in percent) for the top three placements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementSplit {
    pub first: u8,
    pub second: u8,
    pub third: u8,
}

impl PlacementSplit {
    pub fn new(first: u8, second: u8, third: u8) -> Self {
        Self {
            first,
            second,
            third,
        }
    }

    /// Sum of all three shares
    pub fn total(&self) -> u16 {
        u16::from(self.first) + u16::from(self.second) + u16::from(self.third)
    }
}

impl Default for PlacementSplit {
    fn default() -> Self {
        Self::new(60, 30, 10)
    }
}

/// Tournament configuration supplied by the host at creation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Display title
    pub title: String,
    /// Game label
    pub game: String,
    /// Platform label
    pub platform: String,
    /// Entry fee paid by each participant
    pub entry_fee: Decimal,
    /// Percentage of collected fees that goes into the prize pool (1-100)
    pub prize_percentage: u8,
    /// Placement shares, ignored when `winner_take_all` is set
    pub placement_split: PlacementSplit,
    /// Free-form rules text
    pub rules: String,
    /// Scheduled start time
    pub start_time: DateTime<Utc>,
    /// Maximum number of participants
    pub max_participants: usize,
    pub format: TournamentFormat,
    /// Champion receives the whole pool
    pub winner_take_all: bool,
    /// Currency selector for entry fee and payouts
    pub currency: String,
    /// Teams register instead of players
    pub team_mode: bool,
    /// Host identifier
    pub host_id: String,
}

impl TournamentConfig {
    /// Create a single-elimination configuration with a 60/30/10 split
    pub fn single_elimination(title: String, max_participants: usize, entry_fee: Decimal) -> Self {
        Self {
            title,
            game: String::new(),
            platform: String::new(),
            entry_fee,
            prize_percentage: 100,
            placement_split: PlacementSplit::default(),
            rules: String::new(),
            start_time: Utc::now(),
            max_participants,
            format: TournamentFormat::Bracket,
            winner_take_all: false,
            currency: "ETH".to_string(),
            team_mode: false,
            host_id: String::new(),
        }
    }

    pub fn with_prize_percentage(mut self, prize_percentage: u8) -> Self {
        self.prize_percentage = prize_percentage;
        self
    }

    pub fn with_split(mut self, first: u8, second: u8, third: u8) -> Self {
        self.placement_split = PlacementSplit::new(first, second, third);
        self
    }

    pub fn winner_take_all(mut self) -> Self {
        self.winner_take_all = true;
        self
    }

    pub fn teams(mut self) -> Self {
        self.team_mode = true;
        self
    }

    pub fn with_format(mut self, format: TournamentFormat) -> Self {
        self.format = format;
        self
    }

    pub fn hosted_by(mut self, host_id: impl Into<String>) -> Self {
        self.host_id = host_id.into();
        self
    }

    /// Kind of participant accepted by this tournament
    pub fn participant_kind(&self) -> ParticipantKind {
        if self.team_mode {
            ParticipantKind::Team
        } else {
            ParticipantKind::Player
        }
    }

    /// Check every creation-time invariant
    pub fn validate(&self) -> TournamentResult<()> {
        if self.title.trim().is_empty() {
            return Err(TournamentError::InvalidConfig(
                "title must not be empty".to_string(),
            ));
        }
        if self.entry_fee.is_sign_negative() {
            return Err(TournamentError::InvalidConfig(format!(
                "entry fee must be non-negative, got {}",
                self.entry_fee
            )));
        }
        if !(1..=100).contains(&self.prize_percentage) {
            return Err(TournamentError::InvalidConfig(format!(
                "prize percentage must be within 1-100, got {}",
                self.prize_percentage
            )));
        }

        let split = self.placement_split;
        if [split.first, split.second, split.third]
            .iter()
            .any(|pct| *pct > 100)
        {
            return Err(TournamentError::InvalidConfig(
                "placement percentages must be within 0-100".to_string(),
            ));
        }
        if !self.winner_take_all && split.total() != 100 {
            return Err(TournamentError::InvalidPlacementSplit(split.total()));
        }

        if self.max_participants > MAX_PARTICIPANTS {
            return Err(TournamentError::InvalidConfig(format!(
                "at most {MAX_PARTICIPANTS} participants allowed, got {}",
                self.max_participants
            )));
        }
        self.format.rules().validate_capacity(self.max_participants)?;

        // Every share is at most `entry_fee * max_participants * 100`.
        prizes::collected_fees(self)
            .and_then(|fees| fees.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or(TournamentError::PrizePoolOverflow)?;
        Ok(())
    }
}

/// Tournament record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub config: TournamentConfig,
    pub status: TournamentStatus,
    /// Explicitly maintained roster size
    pub registered_count: usize,
    /// Number of rounds in the built bracket (None until started)
    pub total_rounds: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Roster entry: a participant registered for a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub tournament_id: TournamentId,
    pub participant: Participant,
    pub registered_at: DateTime<Utc>,
}

/// Position of a match in the bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchKey {
    /// 1-based round number
    pub round: u32,
    /// 1-based position within the round
    pub match_order: u32,
}

impl MatchKey {
    pub fn new(round: u32, match_order: u32) -> Self {
        Self { round, match_order }
    }

    /// Match fed by this match's winner
    pub fn next(&self) -> MatchKey {
        MatchKey {
            round: self.round + 1,
            match_order: self.match_order.div_ceil(2),
        }
    }

    /// Slot the winner occupies in [`MatchKey::next`]
    pub fn slot_in_next(&self) -> Slot {
        if self.match_order % 2 == 1 {
            Slot::One
        } else {
            Slot::Two
        }
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}M{}", self.round, self.match_order)
    }
}

/// Participant slot within a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    One,
    Two,
}

/// Match record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round: u32,
    pub match_order: u32,
    pub player1: Option<ParticipantId>,
    pub player2: Option<ParticipantId>,
    pub winner: Option<ParticipantId>,
    pub score1: Option<i64>,
    pub score2: Option<i64>,
    pub reported_at: Option<DateTime<Utc>>,
}

impl Match {
    pub fn key(&self) -> MatchKey {
        MatchKey::new(self.round, self.match_order)
    }

    pub fn slot(&self, slot: Slot) -> Option<&ParticipantId> {
        match slot {
            Slot::One => self.player1.as_ref(),
            Slot::Two => self.player2.as_ref(),
        }
    }

    pub fn set_slot(&mut self, slot: Slot, participant: ParticipantId) {
        match slot {
            Slot::One => self.player1 = Some(participant),
            Slot::Two => self.player2 = Some(participant),
        }
    }

    pub fn is_decided(&self) -> bool {
        self.winner.is_some()
    }

    /// The participant that did not win, once decided
    pub fn loser(&self) -> Option<&ParticipantId> {
        let winner = self.winner.as_ref()?;
        [self.player1.as_ref(), self.player2.as_ref()]
            .into_iter()
            .flatten()
            .find(|p| *p != winner)
    }
}

/// A match to be created by the bracket builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSeed {
    pub key: MatchKey,
    pub player1: Option<ParticipantId>,
    pub player2: Option<ParticipantId>,
    /// Set for a round-one bye, whose only entrant advances unplayed
    pub winner: Option<ParticipantId>,
}

impl MatchSeed {
    pub fn set_slot(&mut self, slot: Slot, participant: ParticipantId) {
        match slot {
            Slot::One => self.player1 = Some(participant),
            Slot::Two => self.player2 = Some(participant),
        }
    }
}

/// Placement payout row written at tournament completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementResult {
    pub tournament_id: TournamentId,
    pub participant_id: ParticipantId,
    /// 1-based finishing place; shared places produce several rows
    pub placement: u32,
    pub prize: Decimal,
}
