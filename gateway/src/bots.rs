//! Synthetic bot actors: a seeded fleet that bets and cashes out through
//! the same engine operations as human traffic, driven by the broadcast
//! events it subscribes to like any other client.

use aviator_engine::{Engine, InMemoryWallet, WalletLedger};
use aviator_types::{BetId, Event, RoundId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::BotConfig;

pub fn spawn_bots(engine: Arc<Engine>, wallet: Arc<InMemoryWallet>, config: BotConfig) {
    if config.count == 0 {
        return;
    }
    tokio::spawn(run_bots(engine, wallet, config));
}

async fn run_bots(engine: Arc<Engine>, wallet: Arc<InMemoryWallet>, config: BotConfig) {
    let mut events = engine.subscribe();
    let mut fleet = BotFleet::new(engine, wallet, config);
    info!(count = fleet.config.count, "bot fleet started");

    loop {
        match events.recv().await {
            Ok(Event::BettingOpen { round_id, .. }) => fleet.on_betting_open(round_id),
            Ok(Event::MultiplierTick { multiplier, .. }) => fleet.on_tick(multiplier),
            Ok(Event::RoundCrashed { .. }) => fleet.plans.clear(),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "bot fleet lagged behind the broadcast stream");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// A manual-cashout intent: cash this bet out once the ticker confirms the
/// target.
struct ManualPlan {
    bet_id: BetId,
    target: Decimal,
}

struct BotFleet {
    engine: Arc<Engine>,
    wallet: Arc<InMemoryWallet>,
    config: BotConfig,
    rng: StdRng,
    plans: HashMap<String, ManualPlan>,
}

impl BotFleet {
    fn new(engine: Arc<Engine>, wallet: Arc<InMemoryWallet>, config: BotConfig) -> Self {
        for index in 0..config.count {
            wallet.deposit(&bot_id(index), config.balance);
        }
        let seed = config.seed;
        Self {
            engine,
            wallet,
            config,
            rng: StdRng::seed_from_u64(seed),
            plans: HashMap::new(),
        }
    }

    fn on_betting_open(&mut self, round_id: RoundId) {
        self.plans.clear();
        for index in 0..self.config.count {
            let bot = bot_id(index);
            if self.rng.gen_range(0..100) >= self.config.bet_chance_pct {
                continue;
            }

            // Top the bot back up once it can no longer cover a max bet.
            let floor = Decimal::from(self.config.bet_max);
            if self.wallet.balance(&bot).unwrap_or(Decimal::ZERO) < floor {
                self.wallet.deposit(&bot, self.config.balance);
            }

            let amount = Decimal::from(if self.config.bet_min >= self.config.bet_max {
                self.config.bet_min
            } else {
                self.rng.gen_range(self.config.bet_min..=self.config.bet_max)
            });

            if self.rng.gen_range(0..100) < self.config.auto_share_pct {
                let threshold = Decimal::new(self.rng.gen_range(110..=500), 2);
                if let Err(err) = self.engine.place_bet(&bot, round_id, amount, Some(threshold)) {
                    debug!(bot, ?err, "bot auto bet rejected");
                }
            } else {
                let target = Decimal::new(self.rng.gen_range(110..=400), 2);
                match self.engine.place_bet(&bot, round_id, amount, None) {
                    Ok(receipt) => {
                        self.plans.insert(
                            bot,
                            ManualPlan {
                                bet_id: receipt.bet_id,
                                target,
                            },
                        );
                    }
                    Err(err) => debug!(bot, ?err, "bot manual bet rejected"),
                }
            }
        }
    }

    fn on_tick(&mut self, multiplier: Decimal) {
        let due: Vec<String> = self
            .plans
            .iter()
            .filter(|(_, plan)| plan.target <= multiplier)
            .map(|(bot, _)| bot.clone())
            .collect();
        for bot in due {
            let Some(plan) = self.plans.remove(&bot) else {
                continue;
            };
            match self.engine.cash_out(&bot, plan.bet_id, plan.target) {
                Ok(receipt) => debug!(bot, win = %receipt.win_amount, "bot cashed out"),
                // Beaten by the crash or by the sweeper; nothing to undo.
                Err(err) => debug!(bot, ?err, "bot cash-out rejected"),
            }
        }
    }
}

fn bot_id(index: usize) -> String {
    format!("bot-{index:03}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use aviator_engine::EngineConfig;
    use aviator_types::CrashRangeConfig;
    use rust_decimal_macros::dec;
    use std::time::{Duration, Instant};

    fn always_betting_config(count: usize, auto_share_pct: u8) -> BotConfig {
        BotConfig {
            count,
            balance: dec!(10000),
            bet_min: 10,
            bet_max: 50,
            bet_chance_pct: 100,
            auto_share_pct,
            seed: 42,
        }
    }

    fn test_fleet(
        count: usize,
        auto_share_pct: u8,
    ) -> (BotFleet, Arc<Engine>, Arc<InMemoryWallet>) {
        let wallet = Arc::new(InMemoryWallet::new());
        let engine = Arc::new(Engine::new(
            EngineConfig::default(),
            CrashRangeConfig::default(),
            wallet.clone(),
            None,
        ));
        let fleet = BotFleet::new(
            engine.clone(),
            wallet.clone(),
            always_betting_config(count, auto_share_pct),
        );
        (fleet, engine, wallet)
    }

    #[test]
    fn fleet_funds_bots_up_front() {
        let (_fleet, _engine, wallet) = test_fleet(3, 50);
        for index in 0..3 {
            assert_eq!(wallet.balance(&bot_id(index)), Some(dec!(10000)));
        }
    }

    #[test]
    fn every_bot_bets_when_chance_is_certain() {
        let (mut fleet, engine, _wallet) = test_fleet(5, 50);
        engine.stage_crash_override(dec!(50.00)).unwrap();
        engine.tick(Instant::now());

        fleet.on_betting_open(1);
        assert_eq!(engine.counters().bets_placed, 5);
        // A second betting window cannot double-bet an unresolved round:
        // the engine rejects the duplicates and the fleet carries on.
        fleet.on_betting_open(1);
        assert_eq!(engine.counters().bets_placed, 5);
    }

    #[test]
    fn manual_plans_fire_once_the_ticker_reaches_the_target() {
        // auto share 0: every bot is a manual bettor with a plan.
        let (mut fleet, engine, _wallet) = test_fleet(6, 0);
        engine.stage_crash_override(dec!(50.00)).unwrap();
        let t0 = Instant::now();
        engine.tick(t0);
        fleet.on_betting_open(1);
        assert_eq!(fleet.plans.len(), 6);

        engine.tick(t0 + Duration::from_millis(5_000));
        // All targets sit below 4.01; a confirmed tick above them releases
        // every plan.
        fleet.on_tick(dec!(4.01));
        assert!(fleet.plans.is_empty());
        assert_eq!(engine.counters().manual_cashouts, 6);
    }
}
