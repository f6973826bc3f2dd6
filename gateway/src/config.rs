//! Environment-driven gateway configuration with typed fallbacks.

use aviator_engine::EngineConfig;
use rust_decimal::Decimal;

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub betting_window_ms: u64,
    pub intermission_ms: u64,
    pub history_len: usize,
    pub hub_capacity: usize,
    pub ws_outbound_capacity: usize,
    pub ws_send_timeout_ms: u64,
    pub bots: BotConfig,
}

#[derive(Clone, Debug)]
pub struct BotConfig {
    pub count: usize,
    pub balance: Decimal,
    pub bet_min: u64,
    pub bet_max: u64,
    /// Chance (percent) that a bot bets in a given round.
    pub bet_chance_pct: u8,
    /// Share (percent) of betting bots that use an auto-cashout threshold;
    /// the rest cash out manually at a picked target.
    pub auto_share_pct: u8,
    pub seed: u64,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            betting_window_ms: read_u64("AVIATOR_BETTING_MS", 5_000),
            intermission_ms: read_u64("AVIATOR_INTERMISSION_MS", 5_000),
            history_len: read_usize("AVIATOR_HISTORY_LEN", 12),
            hub_capacity: read_usize("AVIATOR_HUB_CAPACITY", 1_024),
            ws_outbound_capacity: read_usize("AVIATOR_WS_OUTBOUND_CAPACITY", 256),
            ws_send_timeout_ms: read_u64("AVIATOR_WS_SEND_TIMEOUT_MS", 2_000),
            bots: BotConfig::from_env(),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            betting_window_ms: self.betting_window_ms,
            intermission_ms: self.intermission_ms,
            history_len: self.history_len,
            hub_capacity: self.hub_capacity,
        }
    }
}

impl BotConfig {
    fn from_env() -> Self {
        Self {
            count: read_usize("AVIATOR_BOT_COUNT", 0),
            balance: Decimal::from(read_u64("AVIATOR_BOT_BALANCE", 1_000_000)),
            bet_min: read_u64("AVIATOR_BOT_BET_MIN", 10),
            bet_max: read_u64("AVIATOR_BOT_BET_MAX", 200),
            bet_chance_pct: read_u8("AVIATOR_BOT_BET_CHANCE_PCT", 60).min(100),
            auto_share_pct: read_u8("AVIATOR_BOT_AUTO_PCT", 50).min(100),
            seed: read_u64("AVIATOR_BOT_SEED", 42),
        }
    }
}

fn read_u64(key: &str, fallback: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(fallback)
}

fn read_u8(key: &str, fallback: u8) -> u8 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u8>().ok())
        .unwrap_or(fallback)
}

fn read_usize(key: &str, fallback: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(fallback)
}
