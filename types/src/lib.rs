use std::time::{SystemTime, UNIX_EPOCH};

mod config;
mod error;
mod messages;
mod money;
mod round;

pub use config::{ConfigError, CrashRange, CrashRangeConfig};
pub use error::{GameError, WalletError};
pub use messages::{Command, Event, Response};
pub use money::{round2, win_payout};
pub use round::{Bet, BetId, BetOutcome, Phase, Round, RoundId, RoundSnapshot, UserId};

/// Milliseconds since the UNIX epoch, for timestamps on records and wire
/// messages. Scheduling uses `Instant`, never this.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
