//! Wallet ledger collaborator: per-user balances with atomic debit/credit
//! and an append-only audit log.
//!
//! The engine only ever calls these operations from inside its own critical
//! sections, so an implementation must make each call atomic per user but
//! needs no awareness of rounds or bets.

use aviator_types::{now_ms, WalletError};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

pub trait WalletLedger: Send + Sync {
    /// Withdraws `amount` from the user's balance, failing with
    /// `InsufficientFunds` when it does not cover the amount. Returns the
    /// new balance.
    fn debit(&self, user_id: &str, amount: Decimal, reason: &str) -> Result<Decimal, WalletError>;

    /// Adds `amount` to the user's balance. Returns the new balance.
    fn credit(&self, user_id: &str, amount: Decimal, reason: &str) -> Result<Decimal, WalletError>;

    fn balance(&self, user_id: &str) -> Option<Decimal>;
}

/// One audit log entry. Every successful mutation appends exactly one.
#[derive(Clone, Debug, PartialEq)]
pub struct WalletEntry {
    pub user_id: String,
    pub delta: Decimal,
    pub reason: String,
    pub balance_after: Decimal,
    pub at_ms: u64,
}

#[derive(Default)]
struct WalletInner {
    balances: HashMap<String, Decimal>,
    log: Vec<WalletEntry>,
}

/// In-process wallet ledger. All mutations for all users share one lock,
/// which subsumes the per-user serialization the engine requires.
#[derive(Default)]
pub struct InMemoryWallet {
    inner: Mutex<WalletInner>,
}

impl InMemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or tops up an account. Stands in for the external deposit
    /// flow; used to fund bots and tests.
    pub fn deposit(&self, user_id: &str, amount: Decimal) -> Decimal {
        let mut inner = self.lock();
        let balance = inner
            .balances
            .entry(user_id.to_string())
            .or_insert(Decimal::ZERO);
        *balance += amount;
        let balance_after = *balance;
        inner.log.push(WalletEntry {
            user_id: user_id.to_string(),
            delta: amount,
            reason: "deposit".to_string(),
            balance_after,
            at_ms: now_ms(),
        });
        balance_after
    }

    pub fn audit_log(&self) -> Vec<WalletEntry> {
        self.lock().log.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WalletInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl WalletLedger for InMemoryWallet {
    fn debit(&self, user_id: &str, amount: Decimal, reason: &str) -> Result<Decimal, WalletError> {
        let mut inner = self.lock();
        let balance = inner
            .balances
            .get_mut(user_id)
            .ok_or(WalletError::InsufficientFunds)?;
        if *balance < amount {
            return Err(WalletError::InsufficientFunds);
        }
        *balance -= amount;
        let balance_after = *balance;
        inner.log.push(WalletEntry {
            user_id: user_id.to_string(),
            delta: -amount,
            reason: reason.to_string(),
            balance_after,
            at_ms: now_ms(),
        });
        Ok(balance_after)
    }

    fn credit(&self, user_id: &str, amount: Decimal, reason: &str) -> Result<Decimal, WalletError> {
        let mut inner = self.lock();
        let balance = inner
            .balances
            .entry(user_id.to_string())
            .or_insert(Decimal::ZERO);
        *balance += amount;
        let balance_after = *balance;
        inner.log.push(WalletEntry {
            user_id: user_id.to_string(),
            delta: amount,
            reason: reason.to_string(),
            balance_after,
            at_ms: now_ms(),
        });
        Ok(balance_after)
    }

    fn balance(&self, user_id: &str) -> Option<Decimal> {
        self.lock().balances.get(user_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn debit_requires_covering_balance() {
        let wallet = InMemoryWallet::new();
        wallet.deposit("u1", dec!(100.00));

        assert_eq!(
            wallet.debit("u1", dec!(150.00), "bet"),
            Err(WalletError::InsufficientFunds)
        );
        assert_eq!(wallet.debit("u1", dec!(60.00), "bet"), Ok(dec!(40.00)));
        assert_eq!(wallet.balance("u1"), Some(dec!(40.00)));
    }

    #[test]
    fn debit_unknown_user_is_insufficient_funds() {
        let wallet = InMemoryWallet::new();
        assert_eq!(
            wallet.debit("ghost", dec!(1.00), "bet"),
            Err(WalletError::InsufficientFunds)
        );
    }

    #[test]
    fn every_mutation_appends_one_audit_entry() {
        let wallet = InMemoryWallet::new();
        wallet.deposit("u1", dec!(50.00));
        wallet.debit("u1", dec!(20.00), "bet round 1").unwrap();
        wallet.credit("u1", dec!(36.00), "cash-out round 1").unwrap();

        let log = wallet.audit_log();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].delta, dec!(50.00));
        assert_eq!(log[1].delta, dec!(-20.00));
        assert_eq!(log[1].reason, "bet round 1");
        assert_eq!(log[2].balance_after, dec!(66.00));
    }

    #[test]
    fn failed_debit_leaves_no_audit_entry() {
        let wallet = InMemoryWallet::new();
        wallet.deposit("u1", dec!(10.00));
        let before = wallet.audit_log().len();
        let _ = wallet.debit("u1", dec!(11.00), "bet");
        assert_eq!(wallet.audit_log().len(), before);
    }
}
