use crate::ledger::TransferError;
use tap_economics::EmissionError;
use tap_types::{AccountId, InvalidDayIndex};
use thiserror::Error;

/// Errors surfaced by the rewards engine.
///
/// Every failing operation leaves engine state untouched.
#[derive(Debug, Error)]
pub enum RewardsError {
    #[error("caller {caller} is not authorized to {action}")]
    Unauthorized {
        caller: AccountId,
        action: &'static str,
    },

    #[error(transparent)]
    InvalidDayIndex(#[from] InvalidDayIndex),

    #[error("payout batch at position {cursor} failed, retry on a later wager: {source}")]
    TransferFailed {
        cursor: usize,
        #[source]
        source: TransferError,
    },

    #[error("deposit rejected: {0}")]
    DepositRejected(String),

    #[error("the rewards treasury does not accept native currency")]
    NativePaymentRejected,

    #[error("amount overflow while {0}")]
    AmountOverflow(&'static str),

    #[error("inconsistent distribution state: {0}")]
    InconsistentState(String),

    #[error(transparent)]
    Emission(#[from] EmissionError),

    #[error("token ledger query failed: {0}")]
    Ledger(anyhow::Error),

    #[error("batch size oracle failed: {0}")]
    BatchSizeOracle(anyhow::Error),

    #[error("profit sharing trigger failed: {0}")]
    ProfitSharing(anyhow::Error),

    #[error("state persistence failed: {0}")]
    Storage(anyhow::Error),

    /// The ledger accepted a payout batch but the new state could not be
    /// saved. The engine keeps the new state in memory; do not repeat the call.
    #[error("payout batch committed but state persistence failed: {0}")]
    UnsavedPayout(anyhow::Error),

    #[error("summary serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RewardsError {
    /// Whether the same call may succeed later without operator action on the engine.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RewardsError::TransferFailed { .. })
    }
}
