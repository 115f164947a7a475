//! Resumable batch payout of a closed day.
//!
//! ```text
//!   Idle ──rollover──▶ Armed ──batch──▶ InProgress ──last batch──▶ Idle
//!     ▲                  │                                          ▲
//!     └──── empty day / reserves exhausted ─────────────────────────┘
//! ```
//!
//! ## Key Invariants
//! - A batch is all-or-nothing: transfers go to the ledger as one atomic
//!   batch and counters move only after the ledger accepts it
//! - `pool_remaining` and `wager_remaining` shrink together, so the pool is
//!   exhausted exactly when the last participant is paid
//! - A failed batch is retried from the same cursor with identical amounts

use crate::day_ledger::DayBucket;
use crate::errors::RewardsError;
use crate::ledger::{TokenLedger, Transfer};
use serde::{Deserialize, Serialize};
use tap_economics::ProRataSplitter;
use tap_types::{AccountId, Amount};
use tracing::{debug, info, warn};

/// Checkpointed payout progress for the most recently closed day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionState {
    /// Reward tokens not yet paid for the closed cycle.
    pub pool_remaining: Amount,
    /// Wagers of the closed cycle not yet paid.
    pub wager_remaining: Amount,
    /// Next position in the closed bucket's participant list.
    pub cursor: usize,
    pub batch_size: usize,
    pub complete: bool,
    /// Sticky until a deposit is accepted.
    pub reserves_exhausted: bool,
}

impl Default for DistributionState {
    fn default() -> Self {
        Self {
            pool_remaining: 0,
            wager_remaining: 0,
            cursor: 0,
            batch_size: 0,
            complete: true,
            reserves_exhausted: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionPhase {
    Idle,
    Armed,
    InProgress,
}

/// One committed payout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutEvent {
    pub recipient: AccountId,
    pub amount: Amount,
}

/// What a call to [`DistributionState::advance`] did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOutcome {
    /// Nothing was pending.
    Idle,
    /// Treasury was empty at rollover; the cycle is skipped.
    SkippedExhausted,
    /// Nobody wagered in the closed cycle.
    EmptyCycle,
    Paid {
        payouts: Vec<PayoutEvent>,
        cursor: usize,
        complete: bool,
    },
}

/// Transfers and counters for the next batch, computed without side effects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchPlan {
    pub start: usize,
    pub end: usize,
    pub transfers: Vec<Transfer>,
    pub split: ProRataSplitter,
}

impl DistributionState {
    pub fn phase(&self) -> DistributionPhase {
        if self.complete {
            DistributionPhase::Idle
        } else if self.cursor == 0 {
            DistributionPhase::Armed
        } else {
            DistributionPhase::InProgress
        }
    }

    /// Start paying `pool` across a closed day whose wagers total `wager_total`.
    pub fn arm(&mut self, pool: Amount, wager_total: Amount, batch_size: usize) {
        if !self.complete {
            warn!(
                target: "treasury",
                cursor = self.cursor,
                pool_remaining = self.pool_remaining,
                "previous distribution still pending at rollover, remainder stays in treasury"
            );
        }
        self.pool_remaining = pool;
        self.wager_remaining = wager_total;
        self.batch_size = batch_size;
        self.cursor = 0;
        self.complete = false;
    }

    pub fn mark_exhausted(&mut self) {
        self.reserves_exhausted = true;
    }

    pub fn clear_exhaustion(&mut self) {
        self.reserves_exhausted = false;
    }

    /// Compute the next batch over `bucket` starting at the cursor.
    pub fn plan_batch(&self, bucket: &DayBucket) -> Result<BatchPlan, RewardsError> {
        let count = bucket.len();
        let start = self.cursor.min(count);
        let end = start + self.batch_size.min(count - start);

        let mut split = ProRataSplitter::new(self.pool_remaining, self.wager_remaining);
        let mut transfers = Vec::with_capacity(end - start);
        for participant in &bucket.participants()[start..end] {
            let wagered = bucket.wager_of(participant);
            let due = split.take(wagered).map_err(|e| {
                RewardsError::InconsistentState(format!(
                    "wager of {} at position {}: {}",
                    participant, self.cursor, e
                ))
            })?;
            debug!(target: "treasury", %participant, wagered, due, "reward due");
            transfers.push(Transfer {
                to: participant.clone(),
                amount: due,
            });
        }

        Ok(BatchPlan {
            start,
            end,
            transfers,
            split,
        })
    }

    /// Pay the next batch of `bucket`, the closed day this state was armed for.
    pub fn advance(
        &mut self,
        bucket: &DayBucket,
        ledger: &mut dyn TokenLedger,
    ) -> Result<BatchOutcome, RewardsError> {
        if self.complete {
            return Ok(BatchOutcome::Idle);
        }
        if self.reserves_exhausted {
            self.complete = true;
            return Ok(BatchOutcome::SkippedExhausted);
        }
        if self.wager_remaining == 0 {
            self.cursor = 0;
            self.complete = true;
            return Ok(BatchOutcome::EmptyCycle);
        }

        let plan = self.plan_batch(bucket)?;
        ledger
            .transfer_all(&plan.transfers)
            .map_err(|source| {
                warn!(
                    target: "treasury",
                    cursor = self.cursor,
                    batch = plan.transfers.len(),
                    error = %source,
                    "reward batch failed, nothing committed"
                );
                RewardsError::TransferFailed {
                    cursor: self.cursor,
                    source,
                }
            })?;

        self.pool_remaining = plan.split.pool_remaining;
        self.wager_remaining = plan.split.weight_remaining;
        if plan.end >= bucket.len() {
            if self.pool_remaining != 0 {
                warn!(
                    target: "treasury",
                    stranded = self.pool_remaining,
                    wager_remaining = self.wager_remaining,
                    "distribution finished with unpaid pool"
                );
            }
            self.cursor = 0;
            self.complete = true;
        } else {
            self.cursor = plan.end;
        }

        let paid: Amount = plan.transfers.iter().map(|t| t.amount).sum();
        info!(
            target: "treasury",
            from = plan.start,
            to = plan.end,
            paid,
            pool_remaining = self.pool_remaining,
            complete = self.complete,
            "reward batch paid"
        );

        Ok(BatchOutcome::Paid {
            payouts: plan
                .transfers
                .into_iter()
                .map(|t| PayoutEvent {
                    recipient: t.to,
                    amount: t.amount,
                })
                .collect(),
            cursor: self.cursor,
            complete: self.complete,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MockTokenLedger;

    fn id(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    fn bucket(entries: &[(&str, Amount)]) -> DayBucket {
        let mut b = DayBucket::default();
        for (p, w) in entries {
            b.record(&id(p), *w).unwrap();
        }
        b
    }

    fn armed(pool: Amount, b: &DayBucket, batch: usize) -> DistributionState {
        let mut state = DistributionState::default();
        state.arm(pool, b.total(), batch);
        state
    }

    #[test]
    fn test_phases() {
        let b = bucket(&[("a", 1), ("b", 1), ("c", 1)]);
        let mut state = DistributionState::default();
        assert_eq!(state.phase(), DistributionPhase::Idle);
        state.arm(90, b.total(), 1);
        assert_eq!(state.phase(), DistributionPhase::Armed);

        let mut ledger = MockTokenLedger::new(id("treasury"), 1_000);
        state.advance(&b, &mut ledger).unwrap();
        assert_eq!(state.phase(), DistributionPhase::InProgress);
    }

    #[test]
    fn test_first_batch_pays_floor_share() {
        let b = bucket(&[("a", 400), ("b", 600)]);
        let mut state = armed(1_001, &b, 1);
        let mut ledger = MockTokenLedger::new(id("treasury"), 10_000);

        let outcome = state.advance(&b, &mut ledger).unwrap();
        assert_eq!(
            outcome,
            BatchOutcome::Paid {
                payouts: vec![PayoutEvent { recipient: id("a"), amount: 400 }],
                cursor: 1,
                complete: false,
            }
        );
        assert_eq!(state.pool_remaining, 601);
        assert_eq!(state.wager_remaining, 600);

        state.advance(&b, &mut ledger).unwrap();
        assert!(state.complete);
        assert_eq!(state.cursor, 0);
        assert_eq!(state.pool_remaining, 0);
        assert_eq!(ledger.balance(&id("b")), 601);
    }

    #[test]
    fn test_failed_batch_commits_nothing() {
        let b = bucket(&[("a", 1), ("b", 1), ("c", 1), ("d", 1), ("e", 1)]);
        let mut state = armed(500, &b, 5);
        let ledger = MockTokenLedger::new(id("treasury"), 1_000);
        ledger.fail_recipient(id("c"));
        let mut handle = ledger.clone();

        let before = state.clone();
        let err = state.advance(&b, &mut handle).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(state, before);
        assert!(ledger.committed_transfers().is_empty());
        assert_eq!(ledger.treasury_balance(), 1_000);
    }

    #[test]
    fn test_exhausted_skips_and_completes() {
        let b = bucket(&[("a", 1)]);
        let mut state = armed(10, &b, 1);
        state.mark_exhausted();
        let mut ledger = MockTokenLedger::new(id("treasury"), 10);
        assert_eq!(
            state.advance(&b, &mut ledger).unwrap(),
            BatchOutcome::SkippedExhausted
        );
        assert!(state.complete);
        assert!(ledger.attempted_transfers().is_empty());
    }

    #[test]
    fn test_empty_cycle_completes_without_transfers() {
        let b = DayBucket::default();
        let mut state = armed(10, &b, 3);
        let mut ledger = MockTokenLedger::new(id("treasury"), 10);
        assert_eq!(state.advance(&b, &mut ledger).unwrap(), BatchOutcome::EmptyCycle);
        assert!(state.complete);
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn test_zero_wager_tail_is_paid_nothing() {
        let b = bucket(&[("a", 10), ("b", 0)]);
        let mut state = armed(77, &b, 2);
        let mut ledger = MockTokenLedger::new(id("treasury"), 100);
        state.advance(&b, &mut ledger).unwrap();
        assert!(state.complete);
        assert_eq!(ledger.balance(&id("a")), 77);
        assert_eq!(ledger.balance(&id("b")), 0);
        assert_eq!(ledger.committed_transfers().len(), 2);
    }

    #[test]
    fn test_plan_is_pure() {
        let b = bucket(&[("a", 1), ("b", 2)]);
        let state = armed(30, &b, 10);
        let first = state.plan_batch(&b).unwrap();
        let second = state.plan_batch(&b).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.transfers.iter().map(|t| t.amount).sum::<u128>(), 30);
    }
}
