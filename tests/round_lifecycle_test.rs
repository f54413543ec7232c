//! Crash and blackjack rounds across requests, timeouts and sweeps

use casino_engine::{
    BlackjackAction, CasinoEngine, CasinoError, GameData, GameType, InMemoryRepository,
    ManualClock, RoundSnapshot, RoundUpdate, ValidationError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Far enough past the start that every crash point has been reached
const PAST_MAX_CRASH_MS: i64 = 600_000;

struct Table {
    engine: CasinoEngine,
    repo: Arc<InMemoryRepository>,
    clock: Arc<ManualClock>,
}

fn dec(value: i64) -> Decimal {
    Decimal::new(value, 0)
}

fn table(balance: i64, seed: u8) -> Table {
    let repo = Arc::new(InMemoryRepository::new().with_user("alice", dec(balance)));
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let engine = CasinoEngine::builder()
        .with_repository(repo.clone())
        .with_clock(clock.clone())
        .with_seed([seed; 32])
        .build()
        .expect("engine should build with defaults");
    Table {
        engine,
        repo,
        clock,
    }
}

fn round_id(update: &RoundUpdate) -> Uuid {
    match update.snapshot() {
        Some(RoundSnapshot::Crash(view)) => view.round_id,
        Some(RoundSnapshot::Blackjack(view)) => view.round_id,
        None => panic!("round settled immediately: {:?}", update),
    }
}

/// A table whose fresh crash round has not crashed at its first instant
async fn table_with_live_crash(balance: i64, amount: i64) -> (Table, Uuid) {
    for seed in 0..=u8::MAX {
        let t = table(balance, seed);
        let update = t.engine.start_crash("alice", dec(amount), None).await.unwrap();
        let id = round_id(&update);
        if let RoundUpdate::InProgress { .. } = t.engine.crash_status("alice", id).await.unwrap() {
            return (t, id);
        }
    }
    panic!("no seed produced a live crash round");
}

/// A table whose opening blackjack hand is not a natural
async fn table_with_live_hand(balance: i64, amount: i64) -> (Table, Uuid) {
    for seed in 0..=u8::MAX {
        let t = table(balance, seed);
        let update = t.engine.start_blackjack("alice", dec(amount)).await.unwrap();
        if let Some(RoundSnapshot::Blackjack(view)) = update.snapshot() {
            let id = view.round_id;
            return (t, id);
        }
    }
    panic!("no seed dealt a live blackjack hand");
}

#[tokio::test]
async fn test_crash_start_hides_crash_point() {
    let t = table(100, 1);
    let update = t.engine.start_crash("alice", dec(10), None).await.unwrap();

    let json = serde_json::to_value(&update).unwrap();
    assert!(!json.to_string().contains("crash_point"));
    assert_eq!(t.engine.balance("alice").await.unwrap(), dec(90));
}

#[tokio::test]
async fn test_crash_cashout_respects_crash_point() {
    for seed in 0..30u8 {
        let t = table(100, seed);
        let update = t.engine.start_crash("alice", dec(10), None).await.unwrap();
        let id = round_id(&update);

        t.clock.advance_ms(8_000);
        match t.engine.cashout_crash("alice", id).await {
            Ok(receipt) => {
                let GameData::Crash {
                    crash_point,
                    cashout_multiplier: Some(at),
                    ..
                } = receipt.transaction.metadata
                else {
                    panic!("cash-out recorded without a multiplier");
                };
                assert!(at < crash_point);
                assert_eq!(receipt.transaction.payout, dec(10) * at);
                assert_eq!(receipt.balance, dec(90) + dec(10) * at);
            }
            Err(CasinoError::RoundAlreadyCrashed { crash_point }) => {
                let current = t.engine.tables().crash.multiplier_at(8_000);
                assert!(crash_point <= current);
                assert_eq!(t.engine.balance("alice").await.unwrap(), dec(90));
            }
            Err(e) => panic!("unexpected cash-out error: {}", e),
        }
        assert_eq!(t.repo.transaction_count(), 1);
    }
}

#[tokio::test]
async fn test_crash_cashout_after_crash_is_rejected() {
    let t = table(100, 4);
    let update = t.engine.start_crash("alice", dec(10), None).await.unwrap();
    let id = round_id(&update);

    t.clock.advance_ms(PAST_MAX_CRASH_MS);
    assert!(matches!(
        t.engine.cashout_crash("alice", id).await,
        Err(CasinoError::RoundAlreadyCrashed { .. })
    ));
    // a second attempt sees the settled loss, not a fresh settlement
    assert!(matches!(
        t.engine.cashout_crash("alice", id).await,
        Err(CasinoError::RoundAlreadyCrashed { .. })
    ));
    assert_eq!(t.engine.balance("alice").await.unwrap(), dec(90));
    assert_eq!(t.repo.transaction_count(), 1);
}

#[tokio::test]
async fn test_second_crash_round_is_rejected_while_first_is_live() {
    let (t, _) = table_with_live_crash(100, 10).await;

    assert!(matches!(
        t.engine.start_crash("alice", dec(10), None).await,
        Err(CasinoError::RoundAlreadyActive {
            game_type: GameType::Crash
        })
    ));
    assert_eq!(t.engine.balance("alice").await.unwrap(), dec(90));
}

#[tokio::test]
async fn test_abandoned_crash_round_settles_on_status_query() {
    let (t, id) = table_with_live_crash(100, 10).await;

    t.clock.advance_ms(PAST_MAX_CRASH_MS);
    let status = t.engine.crash_status("alice", id).await.unwrap();
    let receipt = status.receipt().expect("crashed round should be settled");
    assert_eq!(receipt.transaction.payout, Decimal::ZERO);
    assert_eq!(receipt.transaction.round_id, Some(id));

    // settled rounds keep answering with the same receipt
    let again = t.engine.crash_status("alice", id).await.unwrap();
    assert_eq!(again.receipt().unwrap().transaction.id, receipt.transaction.id);
    assert_eq!(t.repo.transaction_count(), 1);

    // and the slot is free again
    assert!(t.engine.start_crash("alice", dec(10), None).await.is_ok());
}

#[tokio::test]
async fn test_abandoned_crash_round_settles_on_sweep() {
    let (t, _) = table_with_live_crash(100, 10).await;

    assert_eq!(t.engine.sweep_expired_rounds().await.unwrap(), 0);
    t.clock.advance_ms(PAST_MAX_CRASH_MS);
    assert_eq!(t.engine.sweep_expired_rounds().await.unwrap(), 1);
    assert_eq!(t.engine.sweep_expired_rounds().await.unwrap(), 0);

    assert!(t
        .engine
        .active_round("alice", GameType::Crash)
        .await
        .unwrap()
        .is_none());
    assert_eq!(t.engine.balance("alice").await.unwrap(), dec(90));
    assert_eq!(t.repo.transaction_count(), 1);
}

#[tokio::test]
async fn test_active_round_settles_abandoned_round() {
    let (t, _) = table_with_live_crash(100, 10).await;

    assert!(matches!(
        t.engine.active_round("alice", GameType::Crash).await.unwrap(),
        Some(RoundSnapshot::Crash(_))
    ));
    t.clock.advance_ms(PAST_MAX_CRASH_MS);
    assert!(t
        .engine
        .active_round("alice", GameType::Crash)
        .await
        .unwrap()
        .is_none());
    assert_eq!(t.repo.transaction_count(), 1);
}

#[tokio::test]
async fn test_auto_cashout_pays_target_when_below_crash_point() {
    for seed in 0..30u8 {
        let t = table(100, seed);
        let auto = Decimal::new(150, 2);
        let update = t
            .engine
            .start_crash("alice", dec(10), Some(auto))
            .await
            .unwrap();
        let id = round_id(&update);

        t.clock.advance_ms(PAST_MAX_CRASH_MS);
        let status = t.engine.crash_status("alice", id).await.unwrap();
        let tx = &status.receipt().expect("round should be settled").transaction;
        let GameData::Crash {
            crash_point,
            cashout_multiplier,
            ..
        } = tx.metadata
        else {
            panic!("crash round recorded foreign metadata");
        };

        if auto < crash_point {
            assert_eq!(cashout_multiplier, Some(auto));
            assert_eq!(tx.payout, Decimal::new(1500, 2));
        } else {
            assert_eq!(cashout_multiplier, None);
            assert_eq!(tx.payout, Decimal::ZERO);
        }
    }
}

#[tokio::test]
async fn test_auto_cashout_below_minimum_is_rejected() {
    let t = table(100, 1);
    assert!(matches!(
        t.engine
            .start_crash("alice", dec(10), Some(Decimal::ONE))
            .await,
        Err(CasinoError::Validation(ValidationError::AutoCashoutTooLow { .. }))
    ));
    assert_eq!(t.engine.balance("alice").await.unwrap(), dec(100));
}

#[tokio::test]
async fn test_auto_cashout_off_the_multiplier_grid_is_rejected() {
    let t = table(100, 1);
    assert!(matches!(
        t.engine
            .start_crash("alice", dec(10), Some(Decimal::new(1015, 3)))
            .await,
        Err(CasinoError::Validation(ValidationError::AutoCashoutTooPrecise(_)))
    ));
    assert!(matches!(
        t.engine
            .start_crash("alice", dec(10), Some(dec(20_000)))
            .await,
        Err(CasinoError::Validation(ValidationError::AutoCashoutTooHigh { .. }))
    ));
    assert_eq!(t.engine.balance("alice").await.unwrap(), dec(100));
    assert!(t
        .engine
        .active_round("alice", GameType::Crash)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_cashout_of_unknown_round() {
    let t = table(100, 1);
    assert!(matches!(
        t.engine.cashout_crash("alice", Uuid::new_v4()).await,
        Err(CasinoError::RoundNotFound(_))
    ));
}

#[tokio::test]
async fn test_other_users_round_is_not_found() {
    let (t, id) = table_with_live_crash(100, 10).await;
    t.repo.create_user("bob", dec(100));

    assert!(matches!(
        t.engine.cashout_crash("bob", id).await,
        Err(CasinoError::RoundNotFound(_))
    ));
}

#[tokio::test]
async fn test_blackjack_hand_plays_to_settlement() {
    for seed in 0..30u8 {
        let t = table(1000, seed);
        let mut update = t.engine.start_blackjack("alice", dec(10)).await.unwrap();

        let receipt = loop {
            let (id, total) = match &update {
                RoundUpdate::Settled { receipt } => break receipt.clone(),
                RoundUpdate::InProgress {
                    round: RoundSnapshot::Blackjack(view),
                } => (view.round_id, view.player_total),
                other => panic!("unexpected update: {:?}", other),
            };
            assert!(total <= 21);
            let action = if total < 17 {
                BlackjackAction::Hit
            } else {
                BlackjackAction::Stand
            };
            update = t
                .engine
                .blackjack_action("alice", id, action)
                .await
                .unwrap();
        };

        let tx = receipt.transaction;
        assert_eq!(tx.game_type, GameType::Blackjack);
        assert_eq!(tx.amount, dec(10));
        assert_eq!(tx.payout, tx.amount * tx.multiplier);
        assert_eq!(receipt.balance, dec(990) + tx.payout);
        assert_eq!(t.repo.transaction_count(), 1);
        assert!(t
            .engine
            .active_round("alice", GameType::Blackjack)
            .await
            .unwrap()
            .is_none());
    }
}

#[tokio::test]
async fn test_blackjack_double_without_funds_keeps_round_open() {
    let (t, id) = table_with_live_hand(10, 10).await;

    assert!(matches!(
        t.engine
            .blackjack_action("alice", id, BlackjackAction::Double)
            .await,
        Err(CasinoError::InsufficientFunds { .. })
    ));
    assert_eq!(t.engine.balance("alice").await.unwrap(), Decimal::ZERO);
    assert!(matches!(
        t.engine.blackjack_status("alice", id).await.unwrap(),
        RoundUpdate::InProgress { .. }
    ));

    // the hand can still be finished
    let update = t
        .engine
        .blackjack_action("alice", id, BlackjackAction::Stand)
        .await
        .unwrap();
    assert!(update.receipt().is_some());
}

#[tokio::test]
async fn test_blackjack_double_doubles_the_wager() {
    let (t, id) = table_with_live_hand(100, 10).await;

    let update = t
        .engine
        .blackjack_action("alice", id, BlackjackAction::Double)
        .await
        .unwrap();
    let receipt = update.receipt().expect("double always ends the hand");
    assert_eq!(receipt.transaction.amount, dec(20));
    assert_eq!(receipt.balance, dec(80) + receipt.transaction.payout);
    assert!(matches!(
        receipt.transaction.metadata,
        GameData::Blackjack { doubled: true, .. }
    ));
}

#[tokio::test]
async fn test_action_on_settled_hand_is_rejected() {
    let (t, id) = table_with_live_hand(100, 10).await;

    t.engine
        .blackjack_action("alice", id, BlackjackAction::Stand)
        .await
        .unwrap();
    assert!(matches!(
        t.engine
            .blackjack_action("alice", id, BlackjackAction::Hit)
            .await,
        Err(CasinoError::RoundAlreadyResolved(_))
    ));
    assert_eq!(t.repo.transaction_count(), 1);
}

#[tokio::test]
async fn test_idle_blackjack_hand_is_auto_stood() {
    let (t, id) = table_with_live_hand(100, 10).await;
    let ttl = t.engine.config().blackjack.round_ttl_secs as i64;

    t.clock.advance_ms(ttl * 1000);
    assert!(matches!(
        t.engine.blackjack_status("alice", id).await.unwrap(),
        RoundUpdate::InProgress { .. }
    ));

    t.clock.advance_ms(1000);
    let status = t.engine.blackjack_status("alice", id).await.unwrap();
    let receipt = status.receipt().expect("idle hand should be stood");
    assert_eq!(receipt.transaction.round_id, Some(id));
    assert_eq!(t.repo.transaction_count(), 1);
}

#[tokio::test]
async fn test_action_on_idle_hand_returns_the_auto_stand() {
    let (t, id) = table_with_live_hand(100, 10).await;
    let ttl = t.engine.config().blackjack.round_ttl_secs as i64;

    t.clock.advance_ms((ttl + 1) * 1000);
    let update = t
        .engine
        .blackjack_action("alice", id, BlackjackAction::Hit)
        .await
        .unwrap();
    let receipt = update.receipt().expect("idle hand should be settled");
    assert_eq!(receipt.transaction.round_id, Some(id));
    assert_eq!(receipt.transaction.amount, dec(10));
    assert_eq!(receipt.balance, dec(90) + receipt.transaction.payout);
    assert_eq!(t.repo.transaction_count(), 1);

    // the hit was never applied; later actions see the settled hand
    assert!(matches!(
        t.engine
            .blackjack_action("alice", id, BlackjackAction::Stand)
            .await,
        Err(CasinoError::RoundAlreadyResolved(_))
    ));
}
