use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Monotonically increasing round identifier, assigned by the clock.
pub type RoundId = u64;

/// Monotonically increasing bet identifier, assigned by the ledger.
pub type BetId = u64;

/// Opaque user identifier issued by the account layer. The engine never
/// interprets it beyond equality.
pub type UserId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Betting,
    Running,
    Crashed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Betting => "betting",
            Phase::Running => "running",
            Phase::Crashed => "crashed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetOutcome {
    Pending,
    Won,
    Lost,
}

impl BetOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetOutcome::Pending => "pending",
            BetOutcome::Won => "won",
            BetOutcome::Lost => "lost",
        }
    }
}

/// One play of the crash game, from betting open to crash.
///
/// Deliberately not `Serialize`: `crash_multiplier` must never reach a
/// client before the round crashes, so the only serializable views are
/// [`RoundSnapshot`] and the crash event, which are built field by field.
#[derive(Clone, Debug, PartialEq)]
pub struct Round {
    pub id: RoundId,
    pub created_at_ms: u64,
    pub phase: Phase,
    pub crash_multiplier: Decimal,
    pub current_multiplier: Decimal,
    pub betting_window_ms: u64,
    pub ended_at_ms: Option<u64>,
}

/// A single wager on a round. At most one exists per (user, round).
#[derive(Clone, Debug, PartialEq)]
pub struct Bet {
    pub id: BetId,
    pub round_id: RoundId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub auto_cashout_threshold: Option<Decimal>,
    pub cash_out_multiplier: Option<Decimal>,
    pub outcome: BetOutcome,
    pub created_at_ms: u64,
}

impl Bet {
    pub fn is_pending(&self) -> bool {
        self.outcome == BetOutcome::Pending
    }
}

/// Client-visible view of the active round. Carries the current multiplier
/// and phase but never the crash point.
#[derive(Clone, Debug, Serialize)]
pub struct RoundSnapshot {
    pub round_id: RoundId,
    pub phase: Phase,
    pub current_multiplier: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub betting_remaining_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_strings() {
        assert_eq!(Phase::Betting.as_str(), "betting");
        assert_eq!(Phase::Running.as_str(), "running");
        assert_eq!(Phase::Crashed.as_str(), "crashed");
    }

    #[test]
    fn snapshot_serializes_without_crash_value() {
        let snapshot = RoundSnapshot {
            round_id: 7,
            phase: Phase::Running,
            current_multiplier: Decimal::new(134, 2),
            betting_remaining_ms: None,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"round_id\":7"));
        assert!(!json.contains("crash_multiplier"));
        assert!(!json.contains("betting_remaining_ms"));
    }
}
