//! Overflow-safe integer helpers for pro-rata arithmetic.

use num_bigint::BigUint;
use num_traits::ToPrimitive;

/// Compute `floor(n * mul / div)` without intermediate overflow.
///
/// The fast path uses native `u128`; when the product overflows it is
/// recomputed with arbitrary precision. Returns `None` when `div == 0` or the
/// quotient itself does not fit in `u128`.
#[inline]
pub fn mul_div(n: u128, mul: u128, div: u128) -> Option<u128> {
    if div == 0 {
        return None;
    }
    match n.checked_mul(mul) {
        Some(product) => Some(product / div),
        None => (BigUint::from(n) * BigUint::from(mul) / BigUint::from(div)).to_u128(),
    }
}
