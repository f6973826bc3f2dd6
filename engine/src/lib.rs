//! Authoritative round engine for the crash game: one clock task advancing
//! a single active round through betting, running, and crashed phases while
//! concurrent command handlers place bets and cash out against the shared
//! ledger.
//!
//! All round and bet mutation happens under one state mutex that is never
//! held across an await, so every "check then write" sequence is a single
//! critical section. The clock is the sole writer of phase and multiplier;
//! everything else observes read-only snapshots.

use aviator_types::{Bet, CrashRangeConfig, GameError, RoundSnapshot};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

mod backoff;
mod clock;
mod generator;
mod hub;
mod ledger;
mod round;
mod store;
mod wallet;

pub use clock::Tick;
pub use generator::CrashSource;
pub use hub::{BroadcastHub, HubSnapshot};
pub use ledger::{BetReceipt, CashOutReceipt};
pub use round::pace;
pub use store::{ArchivedRound, RoundArchive};
pub use wallet::{InMemoryWallet, WalletEntry, WalletLedger};

use round::ActiveRound;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// How long betting stays open after a round is created.
    pub betting_window_ms: u64,
    /// Pause between a crash and the next round's betting window.
    pub intermission_ms: u64,
    /// How many recent crash values to keep for connect-time history.
    pub history_len: usize,
    /// Broadcast channel capacity; slow subscribers lag past this.
    pub hub_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            betting_window_ms: 5_000,
            intermission_ms: 5_000,
            history_len: 12,
            hub_capacity: 1_024,
        }
    }
}

pub(crate) struct EngineState {
    pub active: Option<ActiveRound>,
    pub next_round_id: u64,
    pub next_bet_id: u64,
    pub recent_crashes: VecDeque<Decimal>,
}

#[derive(Default)]
struct EngineCounters {
    ticks: AtomicU64,
    rounds_opened: AtomicU64,
    rounds_crashed: AtomicU64,
    bets_placed: AtomicU64,
    manual_cashouts: AtomicU64,
    auto_cashouts: AtomicU64,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct EngineCountersSnapshot {
    pub ticks: u64,
    pub rounds_opened: u64,
    pub rounds_crashed: u64,
    pub bets_placed: u64,
    pub manual_cashouts: u64,
    pub auto_cashouts: u64,
}

pub struct Engine {
    config: EngineConfig,
    state: Mutex<EngineState>,
    wallet: Arc<dyn WalletLedger>,
    source: CrashSource,
    hub: BroadcastHub,
    archive: Option<RoundArchive>,
    clock_started: AtomicBool,
    counters: EngineCounters,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        ranges: CrashRangeConfig,
        wallet: Arc<dyn WalletLedger>,
        archive: Option<RoundArchive>,
    ) -> Self {
        let hub = BroadcastHub::new(config.hub_capacity);
        Self {
            config,
            state: Mutex::new(EngineState {
                active: None,
                next_round_id: 1,
                next_bet_id: 1,
                recent_crashes: VecDeque::new(),
            }),
            wallet,
            source: CrashSource::new(ranges),
            hub,
            archive,
            clock_started: AtomicBool::new(false),
            counters: EngineCounters::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<aviator_types::Event> {
        self.hub.subscribe()
    }

    /// Seeds the recent-crash history, e.g. from the archive at startup.
    /// Values are expected newest first.
    pub fn seed_history(&self, crashes: Vec<Decimal>) {
        let mut state = self.state();
        state.recent_crashes = crashes.into_iter().take(self.config.history_len).collect();
    }

    /// Read-only view of the active round, if any. Never exposes the
    /// hidden crash multiplier.
    pub fn snapshot(&self) -> Option<RoundSnapshot> {
        let state = self.state();
        state
            .active
            .as_ref()
            .map(|round| round.snapshot(Instant::now()))
    }

    /// Most recent crash values, newest first.
    pub fn recent_crashes(&self) -> Vec<Decimal> {
        self.state().recent_crashes.iter().copied().collect()
    }

    /// The caller's unresolved bet on the active round, if any.
    pub fn pending_bet_for(&self, user_id: &str) -> Option<Bet> {
        let state = self.state();
        state
            .active
            .as_ref()
            .and_then(|round| round.pending_bet_for(user_id))
            .cloned()
    }

    /// Stages a single-use crash override for the next round. Returns the
    /// previously staged value when one was replaced.
    pub fn stage_crash_override(&self, value: Decimal) -> Result<Option<Decimal>, GameError> {
        if value <= Decimal::ONE {
            return Err(GameError::InvalidMultiplier);
        }
        Ok(self.source.stage_override(value))
    }

    pub fn counters(&self) -> EngineCountersSnapshot {
        EngineCountersSnapshot {
            ticks: self.counters.ticks.load(Ordering::Relaxed),
            rounds_opened: self.counters.rounds_opened.load(Ordering::Relaxed),
            rounds_crashed: self.counters.rounds_crashed.load(Ordering::Relaxed),
            bets_placed: self.counters.bets_placed.load(Ordering::Relaxed),
            manual_cashouts: self.counters.manual_cashouts.load(Ordering::Relaxed),
            auto_cashouts: self.counters.auto_cashouts.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, EngineState> {
        // Recover from poisoning: a panicked tick must not wedge the game.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
