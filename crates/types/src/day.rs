use serde::{Deserialize, Serialize};
use std::fmt;

/// Error returned for a day index outside `{0, 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("day index must be 0 or 1, got {0}")]
pub struct InvalidDayIndex(pub u64);

/// Selector for one of the two double-buffered day buckets.
///
/// The wager source alternates between `0` and `1` each day; the index that
/// is not "today" always names "yesterday".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DayIndex {
    #[default]
    Even,
    Odd,
}

impl DayIndex {
    /// The other bucket.
    pub const fn other(self) -> Self {
        match self {
            DayIndex::Even => DayIndex::Odd,
            DayIndex::Odd => DayIndex::Even,
        }
    }

    /// Array slot of this bucket.
    pub const fn slot(self) -> usize {
        match self {
            DayIndex::Even => 0,
            DayIndex::Odd => 1,
        }
    }

    pub fn from_raw(raw: u64) -> Result<Self, InvalidDayIndex> {
        match raw {
            0 => Ok(DayIndex::Even),
            1 => Ok(DayIndex::Odd),
            other => Err(InvalidDayIndex(other)),
        }
    }
}

impl TryFrom<u8> for DayIndex {
    type Error = InvalidDayIndex;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_raw(value as u64)
    }
}

impl From<DayIndex> for u8 {
    fn from(value: DayIndex) -> Self {
        value.slot() as u8
    }
}

impl fmt::Display for DayIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slot())
    }
}
