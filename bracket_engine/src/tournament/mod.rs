//! Tournament module for single-elimination brackets.
//!
//! This module provides tournament management functionality including:
//! - Tournament creation and configuration
//! - Player and team registration
//! - Bracket construction from a shuffled roster
//! - Score reporting and winner propagation
//! - Prize pool calculation and placement payouts
//!
//! ## Example
//!
//! ```no_run
//! use bracket_engine::tournament::{Participant, TournamentConfig, TournamentManager};
//! use rust_decimal::Decimal;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TournamentManager::in_memory();
//!
//!     // 4-player bracket with a 10 ETH entry fee
//!     let config = TournamentConfig::single_elimination(
//!         "Friday Cup".to_string(),
//!         4,
//!         Decimal::from(10),
//!     );
//!     let tournament_id = manager.create_tournament(config).await?;
//!
//!     for name in ["ana", "ben", "cai", "dev"] {
//!         manager.join(tournament_id, Participant::Player(name.to_string())).await?;
//!     }
//!     let matches = manager.start_tournament(tournament_id).await?;
//!     println!("Round 1 has {} matches", matches.iter().filter(|m| m.round == 1).count());
//!
//!     Ok(())
//! }
//! ```

pub mod advancer;
pub mod bracket;
pub mod errors;
pub mod format;
pub mod manager;
pub mod models;
pub mod prizes;
pub mod roster;

pub use advancer::{MatchOutcome, SlotAssignment};
pub use bracket::{Bracket, BracketBuilder, MAX_PARTICIPANTS, MIN_PARTICIPANTS, total_rounds};
pub use errors::{ErrorKind, TournamentError, TournamentResult};
pub use format::{CustomFormat, FormatRules, Pairing, Rules, SingleElimination};
pub use manager::{ScoreOutcome, TournamentManager};
pub use models::{
    Match, MatchId, MatchKey, MatchSeed, Participant, ParticipantId, ParticipantKind,
    PlacementResult, PlacementSplit, RosterEntry, Slot, Tournament, TournamentConfig,
    TournamentFormat, TournamentId, TournamentStatus,
};
pub use prizes::{PrizeDistributor, prize_pool};
pub use roster::Roster;
