//! End-to-end engine test: a full round with live subscribers, a manual
//! cash-out, an auto-cashout, and a losing bet, driven entirely through the
//! public API.

use aviator_engine::{Engine, EngineConfig, InMemoryWallet, WalletLedger};
use aviator_types::{CrashRangeConfig, Event, GameError, Phase};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn full_round_settles_every_bet_exactly_once() {
    let wallet = Arc::new(InMemoryWallet::new());
    wallet.deposit("auto", dec!(1000.00));
    wallet.deposit("manual", dec!(1000.00));
    wallet.deposit("loser", dec!(1000.00));

    let engine = Arc::new(Engine::new(
        EngineConfig::default(),
        CrashRangeConfig::default(),
        wallet.clone(),
        None,
    ));
    let mut events = engine.subscribe();

    engine.stage_crash_override(dec!(2.50)).unwrap();
    let t0 = Instant::now();
    engine.tick(t0);

    let auto_bet = engine
        .place_bet("auto", 1, dec!(1000.00), Some(dec!(2.0)))
        .unwrap();
    let manual_bet = engine.place_bet("manual", 1, dec!(200.00), None).unwrap();
    let losing_bet = engine.place_bet("loser", 1, dec!(300.00), None).unwrap();
    assert_eq!(auto_bet.round_id, 1);

    // A second bet from the same user is rejected while the first stands.
    assert_eq!(
        engine.place_bet("manual", 1, dec!(50.00), None),
        Err(GameError::DuplicateBet)
    );

    let t1 = t0 + Duration::from_millis(5_000);
    engine.tick(t1);
    assert_eq!(engine.snapshot().unwrap().phase, Phase::Running);

    // Drive the round to the crash, cashing "manual" out at 1.50 once the
    // ticker has confirmed that value.
    let mut manual_receipt = None;
    let mut crashed = false;
    for _ in 0..400 {
        let tick = engine.tick(t1);
        for event in &tick.events {
            if let Event::MultiplierTick { multiplier, .. } = event {
                if *multiplier >= dec!(1.50) && manual_receipt.is_none() {
                    manual_receipt =
                        Some(engine.cash_out("manual", manual_bet.bet_id, dec!(1.50)).unwrap());
                }
            }
            if matches!(event, Event::RoundCrashed { .. }) {
                crashed = true;
            }
        }
        if crashed {
            break;
        }
    }
    assert!(crashed, "round never crashed");

    let manual_receipt = manual_receipt.expect("manual cash-out never fired");
    assert_eq!(manual_receipt.win_amount, dec!(300.00));
    assert_eq!(wallet.balance("manual"), Some(dec!(1100.00)));

    // Auto bet swept at its threshold, loser finalized at the crash.
    assert_eq!(wallet.balance("auto"), Some(dec!(2000.00)));
    assert_eq!(wallet.balance("loser"), Some(dec!(700.00)));
    assert_eq!(
        engine.cash_out("loser", losing_bet.bet_id, dec!(1.10)),
        Err(GameError::AlreadyResolved)
    );

    // Replay the broadcast stream: ordering and information hiding.
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    assert!(matches!(collected.first(), Some(Event::BettingOpen { .. })));
    assert!(matches!(collected.last(), Some(Event::RoundCrashed { .. })));

    let mut last_tick = dec!(0);
    let mut saw_crash = false;
    for event in &collected {
        let json = serde_json::to_string(event).unwrap();
        match event {
            Event::MultiplierTick { multiplier, .. } => {
                assert!(!saw_crash, "tick published after the crash event");
                assert!(*multiplier > last_tick, "ticks must increase");
                assert!(*multiplier < dec!(2.50), "tick at or past the crash value");
                assert!(!json.contains("crash_multiplier"));
                last_tick = *multiplier;
            }
            Event::RoundCrashed {
                crash_multiplier, ..
            } => {
                assert_eq!(*crash_multiplier, dec!(2.50));
                saw_crash = true;
            }
            _ => assert!(!json.contains("crash_multiplier")),
        }
    }
    assert!(saw_crash);

    // Every wallet mutation is on the audit log: 3 deposits, 3 debits,
    // 2 credits.
    assert_eq!(wallet.audit_log().len(), 8);
}
