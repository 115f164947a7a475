//! Double-buffered daily wager accounting.
//!
//! Two buckets alternate between "today" (accepting wagers) and "yesterday"
//! (being paid out). A bucket is only cleared when it becomes "today" again,
//! so yesterday's list stays readable for the whole payout.

use crate::errors::RewardsError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tap_types::{AccountId, Amount, DayIndex};

/// Wagers recorded for one cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBucket {
    /// Insertion order, no duplicates. Payouts walk this list.
    participants: Vec<AccountId>,
    wagers: HashMap<AccountId, Amount>,
    total: Amount,
}

impl DayBucket {
    /// Add `amount` to `participant`, appending them on their first wager.
    pub fn record(&mut self, participant: &AccountId, amount: Amount) -> Result<(), RewardsError> {
        let total = self
            .total
            .checked_add(amount)
            .ok_or(RewardsError::AmountOverflow("adding to the daily total"))?;
        match self.wagers.get_mut(participant) {
            Some(wagered) => {
                *wagered = wagered
                    .checked_add(amount)
                    .ok_or(RewardsError::AmountOverflow("adding to a participant wager"))?;
            }
            None => {
                self.participants.push(participant.clone());
                self.wagers.insert(participant.clone(), amount);
            }
        }
        self.total = total;
        Ok(())
    }

    /// Remove every participant and zero the total.
    pub fn clear(&mut self) {
        self.participants.clear();
        self.wagers.clear();
        self.total = 0;
    }

    pub fn wager_of(&self, participant: &AccountId) -> Amount {
        self.wagers.get(participant).copied().unwrap_or(0)
    }

    pub fn participants(&self) -> &[AccountId] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    /// Participant → wager, sorted by participant for stable output.
    pub fn wagers_by_participant(&self) -> BTreeMap<AccountId, Amount> {
        self.participants
            .iter()
            .map(|p| (p.clone(), self.wager_of(p)))
            .collect()
    }

    /// Total equals the sum of wagers and the list matches the map.
    pub fn is_consistent(&self) -> bool {
        let sum = self
            .participants
            .iter()
            .try_fold(0u128, |acc, p| acc.checked_add(self.wager_of(p)));
        sum == Some(self.total) && self.participants.len() == self.wagers.len()
    }
}

/// Both day buckets plus the flag selecting which one is "today".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayLedger {
    current: DayIndex,
    buckets: [DayBucket; 2],
}

impl DayLedger {
    pub fn from_parts(current: DayIndex, even: DayBucket, odd: DayBucket) -> Self {
        Self {
            current,
            buckets: [even, odd],
        }
    }

    pub fn current_day(&self) -> DayIndex {
        self.current
    }

    pub fn bucket(&self, day: DayIndex) -> &DayBucket {
        &self.buckets[day.slot()]
    }

    pub fn today(&self) -> &DayBucket {
        self.bucket(self.current)
    }

    pub fn yesterday(&self) -> &DayBucket {
        self.bucket(self.current.other())
    }

    /// Make `day` the accepting bucket and empty it.
    pub fn begin_day(&mut self, day: DayIndex) {
        self.current = day;
        self.buckets[day.slot()].clear();
    }

    /// Record a wager into today's bucket.
    pub fn record(&mut self, participant: &AccountId, amount: Amount) -> Result<(), RewardsError> {
        self.buckets[self.current.slot()].record(participant, amount)
    }

    pub fn summary(&self) -> DailySummary {
        DailySummary {
            today: self.today().wagers_by_participant(),
            yesterday: self.yesterday().wagers_by_participant(),
        }
    }
}

/// Snapshot of both buckets for external inspection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub today: BTreeMap<AccountId, Amount>,
    pub yesterday: BTreeMap<AccountId, Amount>,
}
