//! Prize pool computation and placement payouts.

use log::warn;
use rust_decimal::Decimal;

use super::bracket::Bracket;
use super::errors::{TournamentError, TournamentResult};
use super::models::{Match, PlacementResult, Tournament, TournamentConfig};

fn percent(value: Decimal, pct: u8) -> TournamentResult<Decimal> {
    value
        .checked_mul(Decimal::from(pct))
        .map(|v| v / Decimal::ONE_HUNDRED)
        .ok_or(TournamentError::PrizePoolOverflow)
}

/// `entry_fee * max_participants`, `None` on overflow
pub(crate) fn collected_fees(config: &TournamentConfig) -> Option<Decimal> {
    config
        .entry_fee
        .checked_mul(Decimal::from(config.max_participants as u64))
}

/// `entry_fee * max_participants * prize_percentage / 100`
///
/// # Errors
///
/// * `TournamentError::PrizePoolOverflow` - The product does not fit a `Decimal`
pub fn prize_pool(config: &TournamentConfig) -> TournamentResult<Decimal> {
    let fees = collected_fees(config).ok_or(TournamentError::PrizePoolOverflow)?;
    percent(fees, config.prize_percentage)
}

/// Computes placement payouts from a decided final
pub struct PrizeDistributor<'a> {
    tournament: &'a Tournament,
}

impl<'a> PrizeDistributor<'a> {
    pub fn new(tournament: &'a Tournament) -> Self {
        Self { tournament }
    }

    pub fn prize_pool(&self) -> TournamentResult<Decimal> {
        prize_pool(&self.tournament.config)
    }

    /// Payout rows for every rewarded placement
    ///
    /// `bracket` must contain the decided final. Third place is shared equally
    /// by the losers of decided semifinals; when none can be resolved no
    /// third-place rows are produced. Placements whose share is zero are
    /// skipped, in winner-take-all mode too.
    pub fn distribute(&self, bracket: &Bracket) -> TournamentResult<Vec<PlacementResult>> {
        let config = &self.tournament.config;
        let pool = self.prize_pool()?;
        let rounds = bracket.rounds();

        let Some(final_match) = bracket.round(rounds).find(|m| m.is_decided()) else {
            return Ok(Vec::new());
        };
        let Some(champion) = final_match.winner.clone() else {
            return Ok(Vec::new());
        };

        let mut results = Vec::with_capacity(4);
        if config.winner_take_all {
            results.push(self.row(champion, 1, pool));
        } else {
            let split = config.placement_split;
            results.push(self.row(champion, 1, percent(pool, split.first)?));

            if config.max_participants > 2 {
                if let Some(runner_up) = final_match.loser() {
                    results.push(self.row(runner_up.clone(), 2, percent(pool, split.second)?));
                }
            }

            if config.max_participants >= 4 {
                let losers = semifinal_losers(bracket, rounds);
                if losers.is_empty() {
                    warn!(
                        "Tournament {}: no resolvable semifinal losers, third place not awarded",
                        self.tournament.id
                    );
                } else {
                    let share = percent(pool, split.third)? / Decimal::from(losers.len() as u64);
                    results.extend(losers.into_iter().map(|p| self.row(p, 3, share)));
                }
            }
        }

        results.retain(|r| !r.prize.is_zero());
        Ok(results)
    }

    fn row(&self, participant_id: String, placement: u32, prize: Decimal) -> PlacementResult {
        PlacementResult {
            tournament_id: self.tournament.id,
            participant_id,
            placement,
            prize,
        }
    }
}

fn semifinal_losers(bracket: &Bracket, rounds: u32) -> Vec<String> {
    if rounds < 2 {
        return Vec::new();
    }
    bracket
        .round(rounds - 1)
        .filter(|m| m.is_decided())
        .filter_map(Match::loser)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::{TournamentStatus, TournamentConfig};
    use chrono::Utc;

    fn tournament(config: TournamentConfig) -> Tournament {
        Tournament {
            id: 42,
            config,
            status: TournamentStatus::InProgress,
            registered_count: 0,
            total_rounds: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    fn decided(id: i64, round: u32, order: u32, winner: &str, loser: &str) -> Match {
        Match {
            id,
            tournament_id: 42,
            round,
            match_order: order,
            player1: Some(winner.to_string()),
            player2: Some(loser.to_string()),
            winner: Some(winner.to_string()),
            score1: Some(2),
            score2: Some(1),
            reported_at: None,
        }
    }

    fn four_player_bracket() -> Bracket {
        Bracket::new([
            decided(1, 1, 1, "a", "b"),
            decided(2, 1, 2, "c", "d"),
            decided(3, 2, 1, "a", "c"),
        ])
    }

    #[test]
    fn test_prize_pool() {
        let config = TournamentConfig::single_elimination("x".into(), 8, Decimal::from(10))
            .with_prize_percentage(80);
        assert_eq!(prize_pool(&config).unwrap(), Decimal::from(64));
    }

    #[test]
    fn test_winner_take_all_single_row() {
        let config = TournamentConfig::single_elimination("x".into(), 4, Decimal::from(5))
            .with_prize_percentage(50)
            .winner_take_all();
        let t = tournament(config);
        let results = PrizeDistributor::new(&t).distribute(&four_player_bracket()).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].participant_id, "a");
        assert_eq!(results[0].placement, 1);
        assert_eq!(results[0].prize, Decimal::from(10));
    }

    #[test]
    fn test_split_with_two_semifinal_losers() {
        let config = TournamentConfig::single_elimination("x".into(), 4, Decimal::from(25));
        let t = tournament(config);
        let results = PrizeDistributor::new(&t).distribute(&four_player_bracket()).unwrap();

        let by_place = |p: u32| -> Vec<(&str, Decimal)> {
            results
                .iter()
                .filter(|r| r.placement == p)
                .map(|r| (r.participant_id.as_str(), r.prize))
                .collect()
        };
        assert_eq!(by_place(1), vec![("a", Decimal::from(60))]);
        assert_eq!(by_place(2), vec![("c", Decimal::from(30))]);
        assert_eq!(by_place(3), vec![("b", Decimal::from(5)), ("d", Decimal::from(5))]);
    }

    #[test]
    fn test_two_player_tournament_pays_only_first() {
        let config = TournamentConfig::single_elimination("x".into(), 2, Decimal::from(10));
        let t = tournament(config);
        let bracket = Bracket::new([decided(1, 1, 1, "a", "b")]);
        let results = PrizeDistributor::new(&t).distribute(&bracket).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].prize, Decimal::from(12));
    }

    #[test]
    fn test_unresolved_semifinals_award_no_third_place() {
        let config = TournamentConfig::single_elimination("x".into(), 4, Decimal::from(25));
        let t = tournament(config);
        let mut semi = decided(2, 1, 2, "c", "d");
        semi.winner = None;
        let bracket = Bracket::new([
            decided(1, 1, 1, "a", "b"),
            semi,
            decided(3, 2, 1, "a", "c"),
        ]);

        let results = PrizeDistributor::new(&t).distribute(&bracket).unwrap();
        let third: Vec<_> = results.iter().filter(|r| r.placement == 3).collect();
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].participant_id, "b");
        assert_eq!(third[0].prize, Decimal::from(10));
    }

    #[test]
    fn test_zero_share_placement_skipped() {
        let config = TournamentConfig::single_elimination("x".into(), 4, Decimal::from(25))
            .with_split(70, 30, 0);
        let t = tournament(config);
        let results = PrizeDistributor::new(&t).distribute(&four_player_bracket()).unwrap();
        assert!(results.iter().all(|r| r.placement < 3));
    }

    #[test]
    fn test_undecided_final_pays_nothing() {
        let config = TournamentConfig::single_elimination("x".into(), 2, Decimal::from(10));
        let t = tournament(config);
        let mut final_match = decided(1, 1, 1, "a", "b");
        final_match.winner = None;
        let results = PrizeDistributor::new(&t).distribute(&Bracket::new([final_match])).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_free_tournament_pays_no_rows_in_either_mode() {
        let split = TournamentConfig::single_elimination("x".into(), 4, Decimal::ZERO);
        let t = tournament(split.clone());
        let results = PrizeDistributor::new(&t).distribute(&four_player_bracket()).unwrap();
        assert!(results.is_empty());

        let t = tournament(split.winner_take_all());
        let results = PrizeDistributor::new(&t).distribute(&four_player_bracket()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_overflowing_pool_is_an_error() {
        let mut config = TournamentConfig::single_elimination("x".into(), 16, Decimal::ONE);
        config.entry_fee = Decimal::MAX;
        assert!(matches!(
            prize_pool(&config),
            Err(TournamentError::PrizePoolOverflow)
        ));

        let t = tournament(config);
        assert!(matches!(
            PrizeDistributor::new(&t).distribute(&four_player_bracket()),
            Err(TournamentError::PrizePoolOverflow)
        ));
    }
}
