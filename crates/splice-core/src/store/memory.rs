//! Embedded in-memory store backend.
//!
//! One concrete backend satisfying all four store capabilities, the same
//! way a production deployment backs the three narrow database roles with
//! a single bucketed key-value file. Used as the default embedded backend
//! and by every test that does not inject faults.

use super::{
    ConsensusHashStore, ConsensusInfoStore, ExecutionHashStore, RealmStore, StoreError,
};
use crate::types::{ConsensusInfo, Epoch, HeaderHashRecord, Slot};
use ahash::RandomState;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory backend over per-keyspace maps.
///
/// The watermark save uses `fetch_max`, so a regression request is a
/// silent no-op; the engine never issues one.
#[derive(Default)]
pub struct MemoryStore {
    consensus_hashes: DashMap<Slot, HeaderHashRecord, RandomState>,
    execution_hashes: DashMap<Slot, HeaderHashRecord, RandomState>,
    consensus_infos: DashMap<Epoch, ConsensusInfo, RandomState>,
    latest_verified_slot: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn range_of(
        map: &DashMap<Slot, HeaderHashRecord, RandomState>,
        from_slot: Slot,
        limit: u64,
    ) -> Vec<Option<HeaderHashRecord>> {
        let mut batch = Vec::new();

        // Dense to the full window: missing slots hold `None`, including
        // at the tail. The engine's gap fill depends on seeing them.
        for offset in 0..limit {
            let Some(slot) = from_slot.checked_add(offset) else { break };
            batch.push(map.get(&slot).map(|entry| *entry.value()));
        }

        batch
    }
}

#[async_trait]
impl ConsensusHashStore for MemoryStore {
    async fn save(&self, slot: Slot, record: HeaderHashRecord) -> Result<(), StoreError> {
        self.consensus_hashes.insert(slot, record);
        Ok(())
    }

    async fn get(&self, slot: Slot) -> Result<Option<HeaderHashRecord>, StoreError> {
        Ok(self.consensus_hashes.get(&slot).map(|entry| *entry.value()))
    }

    async fn range(
        &self,
        from_slot: Slot,
        limit: u64,
    ) -> Result<Vec<Option<HeaderHashRecord>>, StoreError> {
        Ok(Self::range_of(&self.consensus_hashes, from_slot, limit))
    }
}

#[async_trait]
impl ExecutionHashStore for MemoryStore {
    async fn save(&self, slot: Slot, record: HeaderHashRecord) -> Result<(), StoreError> {
        self.execution_hashes.insert(slot, record);
        Ok(())
    }

    async fn get(&self, slot: Slot) -> Result<Option<HeaderHashRecord>, StoreError> {
        Ok(self.execution_hashes.get(&slot).map(|entry| *entry.value()))
    }

    async fn range(
        &self,
        from_slot: Slot,
        limit: u64,
    ) -> Result<Vec<Option<HeaderHashRecord>>, StoreError> {
        Ok(Self::range_of(&self.execution_hashes, from_slot, limit))
    }
}

#[async_trait]
impl RealmStore for MemoryStore {
    async fn latest_verified_slot(&self) -> Result<Slot, StoreError> {
        Ok(self.latest_verified_slot.load(Ordering::Acquire))
    }

    async fn save_latest_verified_slot(&self, slot: Slot) -> Result<(), StoreError> {
        self.latest_verified_slot.fetch_max(slot, Ordering::AcqRel);
        Ok(())
    }
}

#[async_trait]
impl ConsensusInfoStore for MemoryStore {
    async fn save_consensus_info(&self, info: &ConsensusInfo) -> Result<(), StoreError> {
        self.consensus_infos.insert(info.epoch, info.clone());
        Ok(())
    }

    async fn consensus_infos(&self, from_epoch: Epoch) -> Result<Vec<ConsensusInfo>, StoreError> {
        let mut infos: Vec<ConsensusInfo> = self
            .consensus_infos
            .iter()
            .filter(|entry| *entry.key() >= from_epoch)
            .map(|entry| entry.value().clone())
            .collect();
        infos.sort_by_key(|info| info.epoch);
        Ok(infos)
    }
}
