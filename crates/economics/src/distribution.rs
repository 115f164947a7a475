//! Pro-rata pool splitting.
//!
//! Each recipient takes `floor(pool_remaining · weight / weight_remaining)` and
//! both remainders shrink by what was taken. The rounding remainder therefore
//! drifts toward later recipients, and the final recipient receives whatever
//! is left, so the pool is always exhausted exactly.

use crate::errors::EmissionError;
use serde::{Deserialize, Serialize};
use tap_types::{mul_div, Amount};

/// Running split of a pool across weights that sum to `weight_remaining`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProRataSplitter {
    pub pool_remaining: Amount,
    pub weight_remaining: Amount,
}

impl ProRataSplitter {
    pub fn new(pool: Amount, total_weight: Amount) -> Self {
        Self {
            pool_remaining: pool,
            weight_remaining: total_weight,
        }
    }

    /// Take the share owed to `weight` and shrink both remainders.
    pub fn take(&mut self, weight: Amount) -> Result<Amount, EmissionError> {
        if weight > self.weight_remaining {
            return Err(EmissionError::WeightExceedsTotal {
                weight,
                total: self.weight_remaining,
            });
        }
        let due = if self.weight_remaining == 0 {
            0
        } else {
            mul_div(self.pool_remaining, weight, self.weight_remaining)
                .ok_or(EmissionError::CalculationOverflow("pro-rata share"))?
        };
        self.pool_remaining -= due;
        self.weight_remaining -= weight;
        Ok(due)
    }

    /// True once every unit of weight has been paid.
    pub fn is_settled(&self) -> bool {
        self.weight_remaining == 0
    }
}

/// One-off share of `pool` for `weight` out of `total_weight`; zero when nothing was wagered.
pub fn pro_rata_share(
    pool: Amount,
    weight: Amount,
    total_weight: Amount,
) -> Result<Amount, EmissionError> {
    if total_weight == 0 {
        return Ok(0);
    }
    mul_div(pool, weight, total_weight).ok_or(EmissionError::CalculationOverflow("expected share"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn remainder_goes_to_last_recipient() {
        let mut split = ProRataSplitter::new(100, 3);
        assert_eq!(split.take(1).unwrap(), 33);
        assert_eq!(split.take(1).unwrap(), 33);
        assert_eq!(split.take(1).unwrap(), 34);
        assert_eq!(split.pool_remaining, 0);
        assert!(split.is_settled());
    }

    #[test]
    fn overdrawn_weight_is_rejected_without_mutation() {
        let mut split = ProRataSplitter::new(100, 10);
        assert!(matches!(
            split.take(11),
            Err(EmissionError::WeightExceedsTotal { weight: 11, total: 10 })
        ));
        assert_eq!(split, ProRataSplitter::new(100, 10));
    }

    #[test]
    fn zero_weight_after_settlement_pays_nothing() {
        let mut split = ProRataSplitter::new(50, 5);
        assert_eq!(split.take(5).unwrap(), 50);
        assert_eq!(split.take(0).unwrap(), 0);
    }

    #[test]
    fn share_of_empty_day_is_zero() {
        assert_eq!(pro_rata_share(1_000, 10, 0).unwrap(), 0);
        assert_eq!(pro_rata_share(1_000, 400, 1_000).unwrap(), 400);
    }

    proptest! {
        #[test]
        fn splitting_conserves_the_pool(
            pool in 0u128..=u64::MAX as u128 * 1_000_000,
            weights in proptest::collection::vec(0u128..=u64::MAX as u128, 1..40),
        ) {
            let total: u128 = weights.iter().sum();
            let mut split = ProRataSplitter::new(pool, total);
            let mut paid = 0u128;
            for w in &weights {
                paid += split.take(*w).unwrap();
            }
            prop_assert!(split.is_settled());
            if total > 0 {
                prop_assert_eq!(paid, pool);
                prop_assert_eq!(split.pool_remaining, 0);
            } else {
                prop_assert_eq!(paid, 0);
            }
        }
    }
}
