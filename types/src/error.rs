//! Error taxonomy for command handling. Every user-facing failure maps to
//! one of these variants; raw internal faults never reach the wire.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GameError {
    /// Malformed amount, rejected before the ledger is touched.
    #[error("bet amount must be positive")]
    InvalidAmount,
    /// Malformed auto-cashout threshold, rejected before the ledger is
    /// touched.
    #[error("auto-cashout threshold must exceed 1.00")]
    InvalidThreshold,
    /// Malformed cash-out multiplier.
    #[error("cash-out multiplier must be at least 1.00")]
    InvalidMultiplier,
    #[error("round is not accepting bets")]
    RoundNotBetting,
    #[error("round is not running")]
    RoundNotRunning,
    #[error("a bet was already placed in this round")]
    DuplicateBet,
    #[error("insufficient balance")]
    InsufficientFunds,
    #[error("bet not found")]
    NotFound,
    #[error("bet belongs to another user")]
    Forbidden,
    #[error("bet is already resolved")]
    AlreadyResolved,
    #[error("too late, the round already crashed")]
    TooLate,
    /// Ledger or persistence unavailable. No partial debit or credit has
    /// occurred; the caller may retry.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl GameError {
    /// Stable wire code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidAmount
            | GameError::InvalidThreshold
            | GameError::InvalidMultiplier => "INVALID_BET",
            GameError::RoundNotBetting => "ROUND_NOT_BETTING",
            GameError::RoundNotRunning => "ROUND_NOT_RUNNING",
            GameError::DuplicateBet => "DUPLICATE_BET",
            GameError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            GameError::NotFound => "NOT_FOUND",
            GameError::Forbidden => "FORBIDDEN",
            GameError::AlreadyResolved => "ALREADY_RESOLVED",
            GameError::TooLate => "TOO_LATE",
            GameError::Unavailable(_) => "UNAVAILABLE",
        }
    }
}

/// Failures surfaced by the wallet ledger collaborator.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("insufficient balance")]
    InsufficientFunds,
    #[error("wallet unavailable: {0}")]
    Unavailable(String),
}

impl From<WalletError> for GameError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::InsufficientFunds => GameError::InsufficientFunds,
            WalletError::Unavailable(reason) => GameError::Unavailable(reason),
        }
    }
}
