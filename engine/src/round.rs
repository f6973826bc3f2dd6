//! Active-round state owned by the engine. All mutation happens under the
//! engine state mutex, driven by the clock; everything else sees read-only
//! snapshots.

use aviator_types::{Bet, BetId, Phase, Round, RoundId, RoundSnapshot, UserId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Multiplier increment and tick interval for the current value. The climb
/// accelerates in bands: slow near 1x, fast above 20x.
pub fn pace(multiplier: Decimal) -> (Decimal, Duration) {
    if multiplier < dec!(2.0) {
        (dec!(0.01), Duration::from_millis(100))
    } else if multiplier < dec!(5.0) {
        (dec!(0.02), Duration::from_millis(80))
    } else if multiplier < dec!(20.0) {
        (dec!(0.05), Duration::from_millis(60))
    } else {
        (dec!(0.10), Duration::from_millis(40))
    }
}

pub(crate) struct ActiveRound {
    pub id: RoundId,
    pub created_at_ms: u64,
    pub phase: Phase,
    pub crash_multiplier: Decimal,
    pub current_multiplier: Decimal,
    pub sequence: u64,
    pub betting_window_ms: u64,
    pub betting_ends_at: Instant,
    pub crashed_at: Option<Instant>,
    pub ended_at_ms: Option<u64>,
    pub bets: HashMap<BetId, Bet>,
    pub bet_by_user: HashMap<UserId, BetId>,
}

impl ActiveRound {
    pub fn open(id: RoundId, crash_multiplier: Decimal, betting_window_ms: u64, now: Instant) -> Self {
        Self {
            id,
            created_at_ms: aviator_types::now_ms(),
            phase: Phase::Betting,
            crash_multiplier,
            current_multiplier: Decimal::ONE,
            sequence: 0,
            betting_window_ms,
            betting_ends_at: now + Duration::from_millis(betting_window_ms),
            crashed_at: None,
            ended_at_ms: None,
            bets: HashMap::new(),
            bet_by_user: HashMap::new(),
        }
    }

    pub fn snapshot(&self, now: Instant) -> RoundSnapshot {
        let betting_remaining_ms = match self.phase {
            Phase::Betting => Some(
                self.betting_ends_at
                    .saturating_duration_since(now)
                    .as_millis() as u64,
            ),
            _ => None,
        };
        RoundSnapshot {
            round_id: self.id,
            phase: self.phase,
            current_multiplier: self.current_multiplier,
            betting_remaining_ms,
        }
    }

    /// The persistent record of this round; only meaningful once crashed.
    pub fn record(&self) -> Round {
        Round {
            id: self.id,
            created_at_ms: self.created_at_ms,
            phase: self.phase,
            crash_multiplier: self.crash_multiplier,
            current_multiplier: self.current_multiplier,
            betting_window_ms: self.betting_window_ms,
            ended_at_ms: self.ended_at_ms,
        }
    }

    pub fn pending_bet_for(&self, user_id: &str) -> Option<&Bet> {
        let bet_id = self.bet_by_user.get(user_id)?;
        let bet = self.bets.get(bet_id)?;
        bet.is_pending().then_some(bet)
    }
}
