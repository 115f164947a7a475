//! Persistence seam for [`RewardsState`].

use crate::state::RewardsState;
use anyhow::Result;
use parking_lot::RwLock;
use std::sync::Arc;

/// Durable key-value home of the engine state.
pub trait RewardsStore: Send + Sync {
    /// Last saved state, or `None` on first start.
    fn load(&self) -> Result<Option<RewardsState>>;

    /// Persist `state` atomically. The engine only adopts a new state after
    /// this returns `Ok`.
    fn save(&self, state: &RewardsState) -> Result<()>;
}

/// In-memory store; clones share the same slot, which lets tests simulate a
/// restart by opening a second engine over a clone.
#[derive(Clone, Default)]
pub struct MemoryRewardsStore {
    slot: Arc<RwLock<Option<RewardsState>>>,
}

impl MemoryRewardsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<RewardsState> {
        self.slot.read().clone()
    }
}

impl RewardsStore for MemoryRewardsStore {
    fn load(&self) -> Result<Option<RewardsState>> {
        Ok(self.slot.read().clone())
    }

    fn save(&self, state: &RewardsState) -> Result<()> {
        *self.slot.write() = Some(state.clone());
        Ok(())
    }
}
