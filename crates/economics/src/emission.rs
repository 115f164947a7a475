//! Daily pool sizing.
//!
//! Three tiers, evaluated in order against the treasury balance `B`:
//!
//! 1. `B == high_milestone` → `2·unit + B mod unit` (one-time double release)
//! 2. `B >= medium_milestone` → `unit + B mod unit`
//! 3. otherwise → `min(max(floor, last · 995 / 1000), B)`
//!
//! Tiers 1 and 2 reset the decay base to `unit`; tier 3 makes the pool itself
//! the base for the next day.

use crate::errors::EmissionError;
use crate::params::EmissionParams;
use serde::{Deserialize, Serialize};
use tap_types::{mul_div, Amount};
use tracing::debug;

/// Which branch of the schedule produced a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmissionTier {
    DoubleRelease,
    FullRelease,
    Decay,
}

/// Result of sizing one day's pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPool {
    /// Tokens allocated to the closing cycle.
    pub pool: Amount,
    /// Decay base for the next evaluation of tier 3.
    pub next_base: Amount,
    pub tier: EmissionTier,
}

/// Compute the reward pool for a cycle closing with `treasury_balance` held.
pub fn compute_daily_pool(
    treasury_balance: Amount,
    last_amount: Amount,
    params: &EmissionParams,
) -> Result<DailyPool, EmissionError> {
    params.validate()?;
    let unit = params.daily_unit;

    if treasury_balance == params.high_milestone {
        let pool = unit
            .checked_mul(2)
            .and_then(|double| double.checked_add(treasury_balance % unit))
            .ok_or(EmissionError::CalculationOverflow("double release pool"))?;
        return Ok(DailyPool {
            pool,
            next_base: unit,
            tier: EmissionTier::DoubleRelease,
        });
    }

    if treasury_balance >= params.medium_milestone {
        let pool = unit
            .checked_add(treasury_balance % unit)
            .ok_or(EmissionError::CalculationOverflow("full release pool"))?;
        return Ok(DailyPool {
            pool,
            next_base: unit,
            tier: EmissionTier::FullRelease,
        });
    }

    let (numer, denom) = params.decay_fraction();
    let decayed = mul_div(last_amount, numer as u128, denom as u128)
        .ok_or(EmissionError::CalculationOverflow("decayed pool"))?;
    let pool = decayed.max(params.floor).min(treasury_balance);

    debug!(
        target: "economics",
        treasury_balance,
        last_amount,
        decayed,
        pool,
        "decay tier applied"
    );

    Ok(DailyPool {
        pool,
        next_base: pool,
        tier: EmissionTier::Decay,
    })
}

/// Persistent emission bookkeeping carried across cycles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionState {
    /// Size of the most recently set daily pool's decay base.
    pub last_distribution_amount: Amount,
}

impl EmissionState {
    /// Size today's pool and advance the decay base.
    pub fn next_pool(
        &mut self,
        treasury_balance: Amount,
        params: &EmissionParams,
    ) -> Result<DailyPool, EmissionError> {
        let daily = compute_daily_pool(treasury_balance, self.last_distribution_amount, params)?;
        self.last_distribution_amount = daily.next_base;
        Ok(daily)
    }

    /// The pool the next rollover would set, without advancing any state.
    pub fn preview(
        &self,
        treasury_balance: Amount,
        params: &EmissionParams,
    ) -> Result<DailyPool, EmissionError> {
        compute_daily_pool(treasury_balance, self.last_distribution_amount, params)
    }
}
