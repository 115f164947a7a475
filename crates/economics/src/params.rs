use crate::errors::EmissionError;
use serde::{Deserialize, Serialize};
use tap_types::{tap, Amount, DAILY_DISTRIBUTION_UNIT};

/// Parameters of the daily emission schedule.
///
/// Defaults reproduce the production schedule; tests and local runs may
/// scale them down.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionParams {
    /// Treasury balance that triggers the one-time double release (264M TAP).
    /// Deposits are refused once the treasury holds exactly this much.
    pub high_milestone: Amount,
    /// Treasury balance at or above which a full daily unit is released (251M TAP).
    pub medium_milestone: Amount,
    /// Size of one full daily release (1M TAP).
    pub daily_unit: Amount,
    /// Minimum pool once the decay schedule is active (25,000 TAP).
    pub floor: Amount,
    /// Decay multiplier applied to the previous pool, as numer/denom.
    pub decay_numer: u32,
    pub decay_denom: u32,
}

impl Default for EmissionParams {
    fn default() -> Self {
        Self {
            high_milestone: tap(264_000_000),
            medium_milestone: tap(251_000_000),
            daily_unit: DAILY_DISTRIBUTION_UNIT,
            floor: tap(25_000),
            decay_numer: 995,
            decay_denom: 1000,
        }
    }
}

impl EmissionParams {
    /// Reject parameter sets the schedule cannot evaluate.
    pub fn validate(&self) -> Result<(), EmissionError> {
        if self.daily_unit == 0 {
            return Err(EmissionError::InvalidParameter("daily_unit must be non-zero"));
        }
        if self.decay_denom == 0 {
            return Err(EmissionError::InvalidParameter("decay_denom must be non-zero"));
        }
        if self.decay_numer > self.decay_denom {
            return Err(EmissionError::InvalidParameter(
                "decay_numer must not exceed decay_denom",
            ));
        }
        if self.medium_milestone > self.high_milestone {
            return Err(EmissionError::InvalidParameter(
                "medium_milestone must not exceed high_milestone",
            ));
        }
        Ok(())
    }

    /// Decay as a fraction (numer/denom).
    pub fn decay_fraction(&self) -> (u32, u32) {
        (self.decay_numer, self.decay_denom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let p = EmissionParams::default();
        assert!(p.validate().is_ok());
        assert_eq!(p.decay_fraction(), (995, 1000));
    }

    #[test]
    fn inverted_milestones_rejected() {
        let p = EmissionParams {
            medium_milestone: tap(300_000_000),
            ..EmissionParams::default()
        };
        assert!(matches!(
            p.validate(),
            Err(EmissionError::InvalidParameter(_))
        ));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let p: EmissionParams = serde_json::from_str(r#"{"floor": 10}"#).unwrap();
        assert_eq!(p.floor, 10);
        assert_eq!(p.daily_unit, DAILY_DISTRIBUTION_UNIT);
    }
}
