//! Sled persistence for the TAP rewards engine.
//!
//! [`SledStorage`] keeps the engine state under a handful of fixed keys in a
//! `rewards` tree and rewrites them together in one batch. [`SledTokenLedger`]
//! is a local reward token ledger over an `accounts` tree, used by the node
//! binary when no external token service is wired in.

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, Tree};
use std::path::Path;
use tap_treasury::{
    CollaboratorAddresses, DayBucket, DayLedger, DistributionState, RewardsState, RewardsStore,
};
use tap_types::{DayIndex, InvalidDayIndex};

mod token_ledger;

pub use token_ledger::SledTokenLedger;

const KEY_DAY_INDEX: &[u8] = b"day_index";
const KEY_BUCKET_EVEN: &[u8] = b"bucket/0";
const KEY_BUCKET_ODD: &[u8] = b"bucket/1";
const KEY_DISTRIBUTION: &[u8] = b"distribution";
const KEY_EMISSION: &[u8] = b"emission";
const KEY_COLLABORATORS: &[u8] = b"collaborators";

/// Storage errors
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Missing key {0} in a partially written state")]
    MissingKey(String),
    #[error("Stored day index is invalid: {0}")]
    DayIndex(#[from] InvalidDayIndex),
    #[error("Corrupt balance record for {0}")]
    CorruptBalance(String),
}

/// Sled-backed [`RewardsStore`].
pub struct SledStorage {
    db: Db,
    rewards: Tree,
}

impl SledStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Temporary database removed on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        let rewards = db.open_tree("rewards")?;
        Ok(Self { db, rewards })
    }

    /// Handle to the underlying database, for opening sibling trees.
    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, key: &[u8]) -> Result<T, StorageError> {
        let raw = self
            .rewards
            .get(key)?
            .ok_or_else(|| StorageError::MissingKey(String::from_utf8_lossy(key).into_owned()))?;
        Ok(serde_json::from_slice(&raw)?)
    }

    fn load_state(&self) -> Result<Option<RewardsState>, StorageError> {
        let Some(raw_day) = self.rewards.get(KEY_DAY_INDEX)? else {
            return Ok(None);
        };
        let day: u8 = serde_json::from_slice(&raw_day)?;
        let current = DayIndex::try_from(day)?;

        let even: DayBucket = self.read(KEY_BUCKET_EVEN)?;
        let odd: DayBucket = self.read(KEY_BUCKET_ODD)?;
        let distribution: DistributionState = self.read(KEY_DISTRIBUTION)?;
        let emission = self.read(KEY_EMISSION)?;
        let collaborators: CollaboratorAddresses = self.read(KEY_COLLABORATORS)?;

        Ok(Some(RewardsState {
            ledger: DayLedger::from_parts(current, even, odd),
            distribution,
            emission,
            collaborators,
        }))
    }

    fn save_state(&self, state: &RewardsState) -> Result<(), StorageError> {
        fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
            Ok(serde_json::to_vec(value)?)
        }

        let ledger = &state.ledger;
        let mut batch = sled::Batch::default();
        batch.insert(KEY_DAY_INDEX, encode(&u8::from(ledger.current_day()))?);
        batch.insert(KEY_BUCKET_EVEN, encode(ledger.bucket(DayIndex::Even))?);
        batch.insert(KEY_BUCKET_ODD, encode(ledger.bucket(DayIndex::Odd))?);
        batch.insert(KEY_DISTRIBUTION, encode(&state.distribution)?);
        batch.insert(KEY_EMISSION, encode(&state.emission)?);
        batch.insert(KEY_COLLABORATORS, encode(&state.collaborators)?);
        self.rewards.apply_batch(batch)?;
        self.db.flush()?;
        Ok(())
    }
}

impl RewardsStore for SledStorage {
    fn load(&self) -> Result<Option<RewardsState>> {
        Ok(self.load_state()?)
    }

    fn save(&self, state: &RewardsState) -> Result<()> {
        self.save_state(state)?;
        tracing::trace!(
            target: "storage",
            day = %state.ledger.current_day(),
            cursor = state.distribution.cursor,
            "rewards state saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tap_types::AccountId;
    use tempfile::TempDir;

    fn id(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    fn sample_state() -> RewardsState {
        let mut state = RewardsState::default();
        state.ledger.record(&id("alice"), 400).unwrap();
        state.ledger.begin_day(DayIndex::Odd);
        state.ledger.record(&id("bob"), u128::MAX / 3).unwrap();
        state.distribution.arm(1_001, 400, 7);
        state.emission.last_distribution_amount = tap_types::DAILY_DISTRIBUTION_UNIT;
        state.collaborators.game = Some(id("game"));
        state
    }

    #[test]
    fn test_fresh_database_has_no_state() {
        let storage = SledStorage::temporary().unwrap();
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");
        let state = sample_state();
        {
            let storage = SledStorage::new(&path).unwrap();
            storage.save(&state).unwrap();
        }
        let storage = SledStorage::new(&path).unwrap();
        assert_eq!(storage.load().unwrap(), Some(state));
    }

    #[test]
    fn test_partial_state_is_an_error() {
        let storage = SledStorage::temporary().unwrap();
        storage.save(&sample_state()).unwrap();
        storage.rewards.remove(KEY_EMISSION).unwrap();
        let err = storage.load_state().unwrap_err();
        assert!(matches!(err, StorageError::MissingKey(ref k) if k == "emission"));
    }

    #[test]
    fn test_invalid_day_index_is_rejected() {
        let storage = SledStorage::temporary().unwrap();
        storage.save(&sample_state()).unwrap();
        storage.rewards.insert(KEY_DAY_INDEX, b"7".to_vec()).unwrap();
        assert!(matches!(
            storage.load_state(),
            Err(StorageError::DayIndex(_))
        ));
    }
}
