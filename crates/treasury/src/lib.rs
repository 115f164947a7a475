//! TAP Rewards Treasury
//!
//! Tracks wagers per day in a two-slot ledger, sizes a daily reward pool from
//! the treasury balance and pays the closed day out pro rata in resumable,
//! all-or-nothing batches.

pub mod collaborators;
pub mod day_ledger;
pub mod distribution;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod rollover;
pub mod state;
pub mod store;

pub use collaborators::{BatchSizeOracle, FixedBatchSize, ProfitSharing, StaticProfitSharing};
pub use day_ledger::{DailySummary, DayBucket, DayLedger};
pub use distribution::{BatchOutcome, BatchPlan, DistributionPhase, DistributionState, PayoutEvent};
pub use engine::{Collaborators, EngineConfig, EngineStatus, RewardsEngine, WagerReceipt};
pub use errors::RewardsError;
pub use ledger::{InMemoryTokenLedger, MockTokenLedger, TokenLedger, Transfer, TransferError};
pub use rollover::{close_day, RolloverContext, RolloverReport};
pub use state::{CollaboratorAddresses, RewardsState};
pub use store::{MemoryRewardsStore, RewardsStore};
