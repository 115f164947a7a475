//! Day-boundary handling: snapshot the closing day and arm its payout.

use crate::collaborators::BatchSizeOracle;
use crate::day_ledger::DayBucket;
use crate::distribution::DistributionState;
use crate::errors::RewardsError;
use crate::ledger::TokenLedger;
use serde::{Deserialize, Serialize};
use tap_economics::{DailyPool, EmissionParams, EmissionState};
use tap_types::{AccountId, Amount, DayIndex};
use tracing::{info, warn};

/// Collaborators consulted while closing a day.
pub struct RolloverContext<'a> {
    pub ledger: &'a dyn TokenLedger,
    pub treasury: &'a AccountId,
    pub oracle: &'a dyn BatchSizeOracle,
    pub params: &'a EmissionParams,
}

/// What happened when a day closed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverReport {
    pub closed_day: DayIndex,
    pub participants: usize,
    pub wager_total: Amount,
    /// `None` when the treasury is exhausted and the cycle is skipped.
    pub pool: Option<DailyPool>,
    pub batch_size: usize,
}

/// Close `closing` and arm `distribution` to pay it out.
///
/// Once the treasury has been seen empty the flag stays set and no pool is
/// sized until a deposit clears it.
pub fn close_day(
    closed_day: DayIndex,
    closing: &DayBucket,
    distribution: &mut DistributionState,
    emission: &mut EmissionState,
    ctx: &RolloverContext<'_>,
) -> Result<RolloverReport, RewardsError> {
    let mut report = RolloverReport {
        closed_day,
        participants: closing.len(),
        wager_total: closing.total(),
        pool: None,
        batch_size: 0,
    };

    if distribution.reserves_exhausted {
        info!(target: "treasury", %closed_day, "treasury exhausted, skipping distribution");
        return Ok(report);
    }

    let treasury_balance = ctx
        .ledger
        .balance_of(ctx.treasury)
        .map_err(RewardsError::Ledger)?;
    if treasury_balance == 0 {
        warn!(
            target: "treasury",
            %closed_day,
            "treasury empty, rewards suspended until next deposit"
        );
        distribution.mark_exhausted();
        return Ok(report);
    }

    let mut batch_size = ctx
        .oracle
        .batch_size(closing.len())
        .map_err(RewardsError::BatchSizeOracle)?;
    if batch_size == 0 {
        warn!(target: "treasury", "batch size oracle returned 0, using 1");
        batch_size = 1;
    }

    let daily = emission.next_pool(treasury_balance, ctx.params)?;
    distribution.arm(daily.pool, closing.total(), batch_size);

    info!(
        target: "treasury",
        %closed_day,
        participants = closing.len(),
        wager_total = closing.total(),
        pool = daily.pool,
        tier = ?daily.tier,
        batch_size,
        "day closed, distribution armed"
    );

    report.pool = Some(daily);
    report.batch_size = batch_size;
    Ok(report)
}
