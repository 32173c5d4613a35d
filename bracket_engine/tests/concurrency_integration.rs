//! Concurrent access tests.
//!
//! Registration and score reporting race from many tasks at once; the roster
//! must never overfill and no report may be lost or applied twice.

use bracket_engine::tournament::{
    Participant, TournamentConfig, TournamentError, TournamentManager, TournamentStatus,
};
use rust_decimal::Decimal;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_never_overfill() {
    let manager = Arc::new(TournamentManager::in_memory());
    let config = TournamentConfig::single_elimination("Rush".to_string(), 8, Decimal::ONE);
    let id = manager.create_tournament(config).await.unwrap();

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.join(id, Participant::Player(format!("p{i}"))).await })
        })
        .collect();

    let mut admitted = 0;
    let mut full = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(TournamentError::TournamentFull) => full += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(admitted, 8);
    assert_eq!(full, 24);
    assert_eq!(manager.get_roster(id).await.unwrap().len(), 8);
    assert_eq!(manager.get_tournament(id).await.unwrap().registered_count, 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_join() {
    let manager = Arc::new(TournamentManager::in_memory());
    let config = TournamentConfig::single_elimination("Echo".to_string(), 4, Decimal::ONE);
    let id = manager.create_tournament(config).await.unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.join(id, Participant::Player("same".into())).await })
        })
        .collect();

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(e) => assert!(matches!(e, TournamentError::AlreadyRegistered)),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(manager.get_roster(id).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sibling_reports_fill_both_slots() {
    let manager = Arc::new(TournamentManager::in_memory().with_shuffle_seed(4));
    let config = TournamentConfig::single_elimination("Siblings".to_string(), 8, Decimal::ONE);
    let id = manager.create_tournament(config).await.unwrap();
    for i in 0..8 {
        manager.join(id, Participant::Player(format!("p{i}"))).await.unwrap();
    }
    let matches = manager.start_tournament(id).await.unwrap();

    let round_one: Vec<_> = matches.iter().filter(|m| m.round == 1).cloned().collect();
    let handles: Vec<_> = round_one
        .iter()
        .map(|m| {
            let manager = Arc::clone(&manager);
            let match_id = m.id;
            tokio::spawn(async move { manager.report_score(match_id, 3, 0).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let bracket = manager.get_bracket(id).await.unwrap();
    let round_two: Vec<_> = bracket.iter().filter(|m| m.round == 2).collect();
    assert_eq!(round_two.len(), 2);
    for (i, m) in round_two.iter().enumerate() {
        assert_eq!(m.player1, round_one[2 * i].player1);
        assert_eq!(m.player2, round_one[2 * i + 1].player1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_final_reports_settle_once() {
    let manager = Arc::new(TournamentManager::in_memory().with_shuffle_seed(8));
    let config = TournamentConfig::single_elimination("Photo Finish".to_string(), 2, Decimal::TEN);
    let id = manager.create_tournament(config).await.unwrap();
    manager.join(id, Participant::Player("x".into())).await.unwrap();
    manager.join(id, Participant::Player("y".into())).await.unwrap();
    let final_id = manager.start_tournament(id).await.unwrap()[0].id;

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.report_score(final_id, i + 1, 0).await })
        })
        .collect();

    let mut completed = 0;
    for handle in handles {
        if let Ok(outcome) = handle.await.unwrap() {
            assert!(outcome.completed);
            completed += 1;
        }
    }

    assert_eq!(completed, 1);
    assert_eq!(manager.get_results(id).await.unwrap().len(), 1);
    assert_eq!(
        manager.get_tournament(id).await.unwrap().status,
        TournamentStatus::Paid
    );
}
