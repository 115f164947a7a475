//! Durable engine state.

use crate::day_ledger::DayLedger;
use crate::distribution::DistributionState;
use serde::{Deserialize, Serialize};
use tap_economics::EmissionState;
use tap_types::AccountId;

/// Addresses of the external collaborators, set by the owner.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaboratorAddresses {
    /// Token contract allowed to deliver deposit callbacks.
    pub token: Option<AccountId>,
    /// Wager source allowed to record wagers.
    pub game: Option<AccountId>,
    /// Profit-sharing process signalled on every wager.
    pub dividends: Option<AccountId>,
}

/// Everything the engine must persist across restarts.
///
/// The default value is the freshly installed state: day 0, both buckets
/// empty, no distribution pending, reserves not exhausted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardsState {
    pub ledger: DayLedger,
    pub distribution: DistributionState,
    pub emission: EmissionState,
    pub collaborators: CollaboratorAddresses,
}
