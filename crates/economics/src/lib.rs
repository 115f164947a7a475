//! TAP Economics
//!
//! Sizes the daily reward pool from the treasury reserve and provides the
//! pro-rata arithmetic used when paying it out:
//! - Milestone releases while the treasury is near its initial allocation
//! - 0.5% per-day decay with a hard floor afterwards
//! - Pool never exceeds what the treasury holds

pub mod distribution;
pub mod emission;
pub mod errors;
pub mod params;

pub use distribution::*;
pub use emission::*;
pub use errors::*;
pub use params::*;
