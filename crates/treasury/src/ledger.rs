//! Token ledger interface for reward payouts
//!
//! The rewards engine never moves balances itself. It asks the external
//! fungible-token ledger, bound to the treasury account, to transfer tokens
//! out and to report holdings.

use anyhow::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tap_types::{AccountId, Amount};

/// A single outgoing payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub to: AccountId,
    pub amount: Amount,
}

/// Why the ledger refused a transfer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("recipient {0} rejected the transfer")]
    Rejected(AccountId),
    #[error("insufficient treasury balance: needed {needed}, available {available}")]
    InsufficientFunds { needed: Amount, available: Amount },
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Interface to the fungible-token ledger, as seen from the treasury account.
pub trait TokenLedger: Send + Sync {
    /// Ticker of the token this ledger moves.
    fn symbol(&self) -> Result<String>;

    /// Balance held by `owner`.
    fn balance_of(&self, owner: &AccountId) -> Result<Amount>;

    /// Move `amount` from the treasury to `to`.
    fn transfer(&mut self, to: &AccountId, amount: Amount) -> Result<(), TransferError>;

    /// Apply every transfer in order, or none of them.
    ///
    /// When any transfer fails, balances must be left exactly as they were
    /// before the call.
    fn transfer_all(&mut self, batch: &[Transfer]) -> Result<(), TransferError>;
}

// -----------------------------------------------------------------------------
// In-memory implementation (local runs and testing)
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryTokenLedger {
    treasury: AccountId,
    symbol: String,
    balances: HashMap<AccountId, Amount>,
    rejecting: HashSet<AccountId>,
}

impl InMemoryTokenLedger {
    pub fn new(treasury: AccountId, symbol: impl Into<String>) -> Self {
        Self {
            treasury,
            symbol: symbol.into(),
            balances: HashMap::new(),
            rejecting: HashSet::new(),
        }
    }

    /// Ledger whose treasury already holds `balance`.
    pub fn with_treasury_balance(
        treasury: AccountId,
        symbol: impl Into<String>,
        balance: Amount,
    ) -> Self {
        let mut ledger = Self::new(treasury.clone(), symbol);
        ledger.balances.insert(treasury, balance);
        ledger
    }

    /// Credit tokens to any account (a deposit from outside the engine).
    pub fn credit(&mut self, account: &AccountId, amount: Amount) {
        let entry = self.balances.entry(account.clone()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Make every future transfer to `account` fail.
    pub fn reject_recipient(&mut self, account: AccountId) {
        self.rejecting.insert(account);
    }

    pub fn accept_recipient(&mut self, account: &AccountId) {
        self.rejecting.remove(account);
    }

    pub fn treasury(&self) -> &AccountId {
        &self.treasury
    }

    fn balance(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn symbol(&self) -> Result<String> {
        Ok(self.symbol.clone())
    }

    fn balance_of(&self, owner: &AccountId) -> Result<Amount> {
        Ok(self.balance(owner))
    }

    fn transfer(&mut self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        if self.rejecting.contains(to) {
            return Err(TransferError::Rejected(to.clone()));
        }
        let available = self.balance(&self.treasury);
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        self.balances.insert(self.treasury.clone(), available - amount);
        self.credit(to, amount);
        Ok(())
    }

    fn transfer_all(&mut self, batch: &[Transfer]) -> Result<(), TransferError> {
        let mut staged = self.clone();
        for t in batch {
            staged.transfer(&t.to, t.amount)?;
        }
        *self = staged;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Mock ledger (failure injection and call inspection)
// -----------------------------------------------------------------------------

/// Shared-handle mock: clones observe and control the same ledger, so a test
/// can keep a handle after moving one into the engine.
#[derive(Debug, Clone)]
pub struct MockTokenLedger {
    inner: Arc<Mutex<MockLedgerState>>,
}

#[derive(Debug)]
struct MockLedgerState {
    ledger: InMemoryTokenLedger,
    committed: Vec<Transfer>,
    attempted: Vec<Transfer>,
    unavailable: bool,
}

impl MockTokenLedger {
    pub fn new(treasury: AccountId, treasury_balance: Amount) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockLedgerState {
                ledger: InMemoryTokenLedger::with_treasury_balance(
                    treasury,
                    tap_types::REWARD_TOKEN_SYMBOL,
                    treasury_balance,
                ),
                committed: Vec::new(),
                attempted: Vec::new(),
                unavailable: false,
            })),
        }
    }

    pub fn set_symbol(&self, symbol: &str) {
        self.inner.lock().ledger.symbol = symbol.to_string();
    }

    /// Deposit into any account, bypassing the treasury.
    pub fn credit(&self, account: &AccountId, amount: Amount) {
        self.inner.lock().ledger.credit(account, amount);
    }

    /// Drain the treasury to zero.
    pub fn drain_treasury(&self) {
        let mut state = self.inner.lock();
        let treasury = state.ledger.treasury.clone();
        state.ledger.balances.insert(treasury, 0);
    }

    pub fn fail_recipient(&self, account: AccountId) {
        self.inner.lock().ledger.reject_recipient(account);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unavailable = unavailable;
    }

    pub fn clear_failures(&self) {
        let mut state = self.inner.lock();
        state.ledger.rejecting.clear();
        state.unavailable = false;
    }

    pub fn balance(&self, account: &AccountId) -> Amount {
        self.inner.lock().ledger.balance(account)
    }

    pub fn treasury_balance(&self) -> Amount {
        let state = self.inner.lock();
        state.ledger.balance(&state.ledger.treasury)
    }

    /// Transfers that actually moved tokens, in order.
    pub fn committed_transfers(&self) -> Vec<Transfer> {
        self.inner.lock().committed.clone()
    }

    /// Every transfer the ledger was asked to make, including rolled-back ones.
    pub fn attempted_transfers(&self) -> Vec<Transfer> {
        self.inner.lock().attempted.clone()
    }
}

impl TokenLedger for MockTokenLedger {
    fn symbol(&self) -> Result<String> {
        self.inner.lock().ledger.symbol()
    }

    fn balance_of(&self, owner: &AccountId) -> Result<Amount> {
        self.inner.lock().ledger.balance_of(owner)
    }

    fn transfer(&mut self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        self.transfer_all(&[Transfer {
            to: to.clone(),
            amount,
        }])
    }

    fn transfer_all(&mut self, batch: &[Transfer]) -> Result<(), TransferError> {
        let mut state = self.inner.lock();
        if state.unavailable {
            return Err(TransferError::Unavailable("mock ledger offline".into()));
        }
        let mut staged = state.ledger.clone();
        for t in batch {
            state.attempted.push(t.clone());
            staged.transfer(&t.to, t.amount)?;
        }
        state.ledger = staged;
        state.committed.extend_from_slice(batch);
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    #[test]
    fn test_in_memory_transfer_moves_balance() {
        let mut ledger = InMemoryTokenLedger::with_treasury_balance(id("treasury"), "TAP", 1000);
        ledger.transfer(&id("alice"), 300).unwrap();
        assert_eq!(ledger.balance_of(&id("treasury")).unwrap(), 700);
        assert_eq!(ledger.balance_of(&id("alice")).unwrap(), 300);
    }

    #[test]
    fn test_insufficient_balance() {
        let mut ledger = InMemoryTokenLedger::with_treasury_balance(id("treasury"), "TAP", 100);
        let err = ledger.transfer(&id("alice"), 101).unwrap_err();
        assert_eq!(
            err,
            TransferError::InsufficientFunds {
                needed: 101,
                available: 100
            }
        );
        assert_eq!(ledger.balance_of(&id("treasury")).unwrap(), 100);
    }

    #[test]
    fn test_transfer_all_is_atomic() {
        let mut ledger = InMemoryTokenLedger::with_treasury_balance(id("treasury"), "TAP", 1000);
        ledger.reject_recipient(id("carol"));
        let batch = vec![
            Transfer { to: id("alice"), amount: 100 },
            Transfer { to: id("bob"), amount: 100 },
            Transfer { to: id("carol"), amount: 100 },
        ];
        assert_eq!(
            ledger.transfer_all(&batch),
            Err(TransferError::Rejected(id("carol")))
        );
        assert_eq!(ledger.balance_of(&id("treasury")).unwrap(), 1000);
        assert_eq!(ledger.balance_of(&id("alice")).unwrap(), 0);

        ledger.accept_recipient(&id("carol"));
        ledger.transfer_all(&batch).unwrap();
        assert_eq!(ledger.balance_of(&id("treasury")).unwrap(), 700);
    }

    #[test]
    fn test_mock_records_attempts_and_commits() {
        let mock = MockTokenLedger::new(id("treasury"), 500);
        let mut handle = mock.clone();
        mock.fail_recipient(id("bob"));

        let batch = vec![
            Transfer { to: id("alice"), amount: 10 },
            Transfer { to: id("bob"), amount: 20 },
        ];
        assert!(handle.transfer_all(&batch).is_err());
        assert_eq!(mock.attempted_transfers().len(), 2);
        assert!(mock.committed_transfers().is_empty());

        mock.clear_failures();
        handle.transfer_all(&batch).unwrap();
        assert_eq!(mock.committed_transfers(), batch);
        assert_eq!(mock.treasury_balance(), 470);
    }

    #[test]
    fn test_mock_unavailable() {
        let mock = MockTokenLedger::new(id("treasury"), 500);
        mock.set_unavailable(true);
        let mut handle = mock.clone();
        assert!(matches!(
            handle.transfer(&id("alice"), 1),
            Err(TransferError::Unavailable(_))
        ));
    }
}
