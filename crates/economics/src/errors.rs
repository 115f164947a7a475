use tap_types::Amount;
use thiserror::Error;

/// Errors that can occur while sizing or splitting a reward pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmissionError {
    #[error("invalid emission parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("arithmetic overflow while computing {0}")]
    CalculationOverflow(&'static str),

    #[error("share of {weight} out of {total} exceeds the remaining weight")]
    WeightExceedsTotal { weight: Amount, total: Amount },
}
