//! Interfaces to the upstream wager source and downstream profit sharing.

use anyhow::Result;

/// Supplies the payout batch size, queried once per rollover with the number
/// of participants in the closing day.
pub trait BatchSizeOracle: Send + Sync {
    fn batch_size(&self, participant_count: usize) -> Result<usize>;
}

/// Constant batch size regardless of participant count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBatchSize(pub usize);

impl BatchSizeOracle for FixedBatchSize {
    fn batch_size(&self, _participant_count: usize) -> Result<usize> {
        Ok(self.0)
    }
}

/// Downstream profit-sharing process, signalled after every recorded wager.
///
/// Returning `true` also advances a pending reward distribution by one batch.
pub trait ProfitSharing: Send + Sync {
    fn distribute(&mut self) -> Result<bool>;
}

/// Profit sharing stand-in that always answers the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticProfitSharing(pub bool);

impl ProfitSharing for StaticProfitSharing {
    fn distribute(&mut self) -> Result<bool> {
        Ok(self.0)
    }
}
