//! Primitive types shared by the TAP rewards crates.
//!
//! Amounts are integer base units (1 TAP = 10¹⁸ units). No floating point
//! value ever enters reward arithmetic.

pub mod account;
pub mod currency;
pub mod day;
pub mod math;

pub use account::*;
pub use currency::*;
pub use day::*;
pub use math::*;
