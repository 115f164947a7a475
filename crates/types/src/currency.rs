//! TAP denomination constants.
//!
//! | Name            | Base units |
//! |-----------------|------------|
//! | TAP             | 10¹⁸       |
//! | daily unit      | 10²⁴       |
//!
//! The "daily unit" is the nominal size of one full daily reward release
//! (one million TAP).

/// Amount of reward token in base units.
pub type Amount = u128;

/// Number of decimal places carried by the reward token.
pub const TAP_DECIMALS: u32 = 18;

/// One whole TAP in base units.
pub const TAP: Amount = 1_000_000_000_000_000_000;

/// One full daily distribution (1,000,000 TAP) in base units.
pub const DAILY_DISTRIBUTION_UNIT: Amount = 1_000_000_000_000_000_000_000_000;

/// Symbol the rewards treasury accepts deposits in.
pub const REWARD_TOKEN_SYMBOL: &str = "TAP";

/// Convert whole TAP into base units (saturating).
#[inline]
pub const fn tap(whole: u128) -> Amount {
    whole.saturating_mul(TAP)
}

/// Render an amount as a decimal TAP string without losing precision.
///
/// Trailing zeros of the fractional part are trimmed: `1.5`, `25000`, `0.000000000000000001`.
pub fn format_tap(amount: Amount) -> String {
    let whole = amount / TAP;
    let frac = amount % TAP;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", frac, width = TAP_DECIMALS as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_unit_is_one_million_tap() {
        assert_eq!(DAILY_DISTRIBUTION_UNIT, tap(1_000_000));
    }

    #[test]
    fn format_tap_trims_fraction() {
        assert_eq!(format_tap(0), "0");
        assert_eq!(format_tap(tap(25_000)), "25000");
        assert_eq!(format_tap(TAP + TAP / 2), "1.5");
        assert_eq!(format_tap(1), "0.000000000000000001");
    }
}
