//! # Bracket Engine
//!
//! A single-elimination tournament engine for hosted competitive events.
//!
//! A tournament moves through a fixed lifecycle:
//!
//! - **Upcoming**: Accepting registrations up to `max_participants`
//! - **InProgress**: Bracket built, scores being reported
//! - **Completed**: Final decided, placement results recorded
//! - **Paid**: Payouts released
//! - **Cancelled**: Abandoned before it started
//!
//! ## Core Modules
//!
//! - [`tournament`]: Roster, bracket construction, score propagation and payouts
//! - [`db`]: Storage backends behind the `TournamentRepository` trait
//!
//! ## Example
//!
//! ```
//! use bracket_engine::{MatchKey, total_rounds};
//!
//! assert_eq!(total_rounds(8), 3);
//! // Winner of round 1, match 3 plays round 2, match 2
//! assert_eq!(MatchKey::new(1, 3).next(), MatchKey::new(2, 2));
//! ```

/// Persistence for tournaments, rosters, matches and results.
pub mod db;

/// Tournament lifecycle, bracket and payout logic.
pub mod tournament;
pub use tournament::{
    Match, MatchKey, Participant, PlacementResult, Tournament, TournamentConfig,
    TournamentError, TournamentManager, TournamentResult, TournamentStatus, total_rounds,
};
