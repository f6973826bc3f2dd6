//! Wire messages: inbound commands, per-connection responses, and the
//! broadcast events fanned out to every subscriber.
//!
//! The hidden crash multiplier exists in exactly one outbound shape,
//! [`Event::RoundCrashed`]. Tick and betting events have no such field, so
//! the value cannot leak early by construction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::round::{BetId, RoundId, RoundSnapshot, UserId};

/// Commands a connected client may submit.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    PlaceBet {
        request_id: String,
        round_id: RoundId,
        amount: Decimal,
        #[serde(default)]
        auto_cashout_threshold: Option<Decimal>,
    },
    CashOut {
        request_id: String,
        bet_id: BetId,
        multiplier: Decimal,
    },
    Ping,
}

/// Per-connection replies and connect-time synchronization pushes.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    BetPlaced {
        request_id: String,
        bet_id: BetId,
        round_id: RoundId,
        new_balance: Decimal,
    },
    CashOutOk {
        request_id: String,
        win_amount: Decimal,
        multiplier: Decimal,
        new_balance: Decimal,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        code: &'static str,
        message: String,
    },
    Pong {
        server_time_ms: u64,
    },
    StateSync {
        #[serde(skip_serializing_if = "Option::is_none")]
        round: Option<RoundSnapshot>,
        server_time_ms: u64,
    },
    PastCrashes {
        crashes: Vec<Decimal>,
    },
    YourBet {
        bet_id: BetId,
        round_id: RoundId,
        amount: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        auto_cashout_threshold: Option<Decimal>,
    },
}

/// Events broadcast to every subscriber of the active round.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    BettingOpen {
        round_id: RoundId,
        countdown_ms: u64,
    },
    RoundStarted {
        round_id: RoundId,
    },
    MultiplierTick {
        round_id: RoundId,
        multiplier: Decimal,
        sequence: u64,
    },
    RoundCrashed {
        round_id: RoundId,
        crash_multiplier: Decimal,
    },
    BetPlaced {
        round_id: RoundId,
        user_id: UserId,
        amount: Decimal,
    },
    CashOut {
        round_id: RoundId,
        user_id: UserId,
        multiplier: Decimal,
        win_amount: Decimal,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn place_bet_command_parses() {
        let command: Command = serde_json::from_str(
            r#"{"type":"place_bet","request_id":"r1","round_id":3,"amount":250.0,"auto_cashout_threshold":2.5}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            Command::PlaceBet {
                request_id: "r1".into(),
                round_id: 3,
                amount: dec!(250.0),
                auto_cashout_threshold: Some(dec!(2.5)),
            }
        );
    }

    #[test]
    fn place_bet_threshold_is_optional() {
        let command: Command = serde_json::from_str(
            r#"{"type":"place_bet","request_id":"r2","round_id":3,"amount":10}"#,
        )
        .unwrap();
        match command {
            Command::PlaceBet {
                auto_cashout_threshold,
                ..
            } => assert!(auto_cashout_threshold.is_none()),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cash_out_command_parses() {
        let command: Command = serde_json::from_str(
            r#"{"type":"cash_out","request_id":"r3","bet_id":42,"multiplier":1.8}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            Command::CashOut {
                request_id: "r3".into(),
                bet_id: 42,
                multiplier: dec!(1.8),
            }
        );
    }

    #[test]
    fn only_the_crash_event_reveals_the_crash_multiplier() {
        let pre_crash = [
            Event::BettingOpen {
                round_id: 1,
                countdown_ms: 5000,
            },
            Event::RoundStarted { round_id: 1 },
            Event::MultiplierTick {
                round_id: 1,
                multiplier: dec!(1.53),
                sequence: 53,
            },
            Event::BetPlaced {
                round_id: 1,
                user_id: "u1".into(),
                amount: dec!(100),
            },
            Event::CashOut {
                round_id: 1,
                user_id: "u1".into(),
                multiplier: dec!(1.40),
                win_amount: dec!(140.00),
            },
        ];
        for event in &pre_crash {
            let json = serde_json::to_string(event).unwrap();
            assert!(
                !json.contains("crash_multiplier"),
                "crash value leaked: {json}"
            );
        }

        let crashed = Event::RoundCrashed {
            round_id: 1,
            crash_multiplier: dec!(2.50),
        };
        let json = serde_json::to_string(&crashed).unwrap();
        assert!(json.contains("\"type\":\"round_crashed\""));
        assert!(json.contains("crash_multiplier"));
    }

    #[test]
    fn event_tags_match_the_broadcast_surface() {
        let tick = Event::MultiplierTick {
            round_id: 9,
            multiplier: dec!(1.01),
            sequence: 1,
        };
        let json = serde_json::to_string(&tick).unwrap();
        assert!(json.contains("\"type\":\"multiplier_tick\""));

        let open = Event::BettingOpen {
            round_id: 9,
            countdown_ms: 5000,
        };
        let json = serde_json::to_string(&open).unwrap();
        assert!(json.contains("\"type\":\"betting_open\""));
        assert!(json.contains("countdown_ms"));
    }

    #[test]
    fn error_response_omits_missing_request_id() {
        let error = Response::Error {
            request_id: None,
            code: "INVALID_BET",
            message: "bet amount must be positive".into(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert!(!json.contains("request_id"));
        assert!(json.contains("INVALID_BET"));
    }
}
