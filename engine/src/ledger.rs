//! Bet placement, cash-out, and the per-tick auto-cashout sweep.
//!
//! Every operation here is one critical section under the engine state
//! mutex: no suspension point separates the state check from the wallet
//! mutation and the resolve-write, which closes the double-bet and
//! double-cashout races.

use aviator_types::{
    now_ms, round2, win_payout, Bet, BetId, BetOutcome, Event, GameError, Phase, RoundId,
};
use rust_decimal::Decimal;
use std::sync::atomic::Ordering;
use tracing::warn;

use crate::round::ActiveRound;
use crate::{Engine, EngineState};

/// Outcome of a successful bet placement.
#[derive(Clone, Debug, PartialEq)]
pub struct BetReceipt {
    pub bet_id: BetId,
    pub round_id: RoundId,
    pub new_balance: Decimal,
}

/// Outcome of a successful cash-out.
#[derive(Clone, Debug, PartialEq)]
pub struct CashOutReceipt {
    pub win_amount: Decimal,
    pub multiplier: Decimal,
    pub new_balance: Decimal,
}

impl Engine {
    /// Places a bet for `user_id` on the active round. The wallet debit and
    /// the bet insert are one atomic unit; the debit happens only after
    /// every validation has passed.
    pub fn place_bet(
        &self,
        user_id: &str,
        round_id: RoundId,
        amount: Decimal,
        auto_cashout_threshold: Option<Decimal>,
    ) -> Result<BetReceipt, GameError> {
        let amount = round2(amount);
        if amount <= Decimal::ZERO {
            return Err(GameError::InvalidAmount);
        }
        if let Some(threshold) = auto_cashout_threshold {
            if threshold <= Decimal::ONE {
                return Err(GameError::InvalidThreshold);
            }
        }

        let mut guard = self.state();
        let EngineState {
            active,
            next_bet_id,
            ..
        } = &mut *guard;
        let Some(round) = active.as_mut() else {
            return Err(GameError::RoundNotBetting);
        };
        if round.id != round_id || round.phase != Phase::Betting {
            return Err(GameError::RoundNotBetting);
        }
        if round.bet_by_user.contains_key(user_id) {
            return Err(GameError::DuplicateBet);
        }

        let reason = format!("bet on round {}", round.id);
        let new_balance = self.wallet.debit(user_id, amount, &reason)?;

        let bet_id = *next_bet_id;
        *next_bet_id += 1;
        round.bets.insert(
            bet_id,
            Bet {
                id: bet_id,
                round_id: round.id,
                user_id: user_id.to_string(),
                amount,
                auto_cashout_threshold,
                cash_out_multiplier: None,
                outcome: BetOutcome::Pending,
                created_at_ms: now_ms(),
            },
        );
        round.bet_by_user.insert(user_id.to_string(), bet_id);
        self.counters.bets_placed.fetch_add(1, Ordering::Relaxed);
        self.hub.publish(Event::BetPlaced {
            round_id: round.id,
            user_id: user_id.to_string(),
            amount,
        });

        Ok(BetReceipt {
            bet_id,
            round_id: round.id,
            new_balance,
        })
    }

    /// Cashes out a pending bet at `multiplier`. The server-side crash value
    /// is the sole source of truth: a request at or past it is too late, no
    /// matter what the client display showed. Exactly one of any number of
    /// concurrent attempts succeeds.
    pub fn cash_out(
        &self,
        user_id: &str,
        bet_id: BetId,
        multiplier: Decimal,
    ) -> Result<CashOutReceipt, GameError> {
        let multiplier = round2(multiplier);
        if multiplier < Decimal::ONE {
            return Err(GameError::InvalidMultiplier);
        }

        let mut guard = self.state();
        let Some(round) = guard.active.as_mut() else {
            return Err(GameError::NotFound);
        };
        let round_id = round.id;
        let phase = round.phase;
        let crash_multiplier = round.crash_multiplier;
        let Some(bet) = round.bets.get_mut(&bet_id) else {
            return Err(GameError::NotFound);
        };
        if bet.user_id != user_id {
            return Err(GameError::Forbidden);
        }
        if !bet.is_pending() {
            return Err(GameError::AlreadyResolved);
        }
        match phase {
            Phase::Crashed => return Err(GameError::TooLate),
            Phase::Betting => return Err(GameError::RoundNotRunning),
            Phase::Running => {}
        }
        if multiplier >= crash_multiplier {
            return Err(GameError::TooLate);
        }

        let win_amount = win_payout(bet.amount, multiplier);
        let reason = format!("cash-out at {multiplier}x on round {round_id}");
        // Credit before the resolve-write: a failed credit leaves the bet
        // pending with no partial effect, safe for the caller to retry.
        let new_balance = self.wallet.credit(user_id, win_amount, &reason)?;
        bet.cash_out_multiplier = Some(multiplier);
        bet.outcome = BetOutcome::Won;
        let bet_user = bet.user_id.clone();
        self.counters.manual_cashouts.fetch_add(1, Ordering::Relaxed);
        self.hub.publish(Event::CashOut {
            round_id,
            user_id: bet_user,
            multiplier,
            win_amount,
        });

        Ok(CashOutReceipt {
            win_amount,
            multiplier,
            new_balance,
        })
    }

    /// Resolves every pending bet whose auto-cashout threshold the current
    /// tick value has reached, paying at the threshold. Runs once per
    /// published tick; a bet concurrently resolved by a manual cash-out is
    /// skipped, never double-credited.
    pub(crate) fn sweep_auto_cashouts(&self, round: &mut ActiveRound) -> Vec<Event> {
        let current = round.current_multiplier;
        let due: Vec<BetId> = round
            .bets
            .values()
            .filter(|bet| bet.is_pending())
            .filter(|bet| {
                bet.auto_cashout_threshold
                    .is_some_and(|threshold| threshold <= current)
            })
            .map(|bet| bet.id)
            .collect();

        let mut events = Vec::new();
        for bet_id in due {
            let Some(bet) = round.bets.get_mut(&bet_id) else {
                continue;
            };
            if !bet.is_pending() {
                continue;
            }
            let Some(threshold) = bet.auto_cashout_threshold else {
                continue;
            };
            let win_amount = win_payout(bet.amount, threshold);
            let reason = format!("auto cash-out at {threshold}x on round {}", round.id);
            match self.wallet.credit(&bet.user_id, win_amount, &reason) {
                Ok(_) => {
                    bet.cash_out_multiplier = Some(threshold);
                    bet.outcome = BetOutcome::Won;
                    self.counters.auto_cashouts.fetch_add(1, Ordering::Relaxed);
                    let event = Event::CashOut {
                        round_id: round.id,
                        user_id: bet.user_id.clone(),
                        multiplier: threshold,
                        win_amount,
                    };
                    self.hub.publish(event.clone());
                    events.push(event);
                }
                Err(err) => {
                    // Leave the bet pending; the next tick retries.
                    warn!(bet_id, ?err, "auto cash-out credit failed");
                }
            }
        }
        events
    }
}
