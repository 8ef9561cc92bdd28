//! Reusable test fixtures: a fault-injecting store wrapper and builders
//! for blocks, headers, and wired engine instances.

use async_trait::async_trait;
use parking_lot::Mutex;
use splice_core::{
    config::SpliceConfig,
    engine::CanonicalizationService,
    store::{
        ConsensusHashStore, ExecutionHashStore, MemoryStore, RealmStore, StoreError,
    },
    types::{ConsensusBlock, ExecutionHeader, Hash, HeaderHashRecord, HeaderInfo, Slot},
};
use std::sync::{atomic::AtomicBool, Arc};
use tokio::sync::{broadcast, mpsc};

/// Installs a compact subscriber honoring `RUST_LOG`. Safe to call from
/// every test; only the first call wins.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .compact()
        .try_init();
}

/// Wraps a [`MemoryStore`] and fails `save` at a chosen slot on a chosen
/// chain, for exercising mid-pass storage failures.
#[derive(Default)]
pub struct FaultInjectingStore {
    inner: MemoryStore,
    fail_consensus_save_at: Mutex<Option<Slot>>,
    fail_execution_save_at: Mutex<Option<Slot>>,
}

impl FaultInjectingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_consensus_save_at(&self, slot: Slot) {
        *self.fail_consensus_save_at.lock() = Some(slot);
    }

    pub fn fail_execution_save_at(&self, slot: Slot) {
        *self.fail_execution_save_at.lock() = Some(slot);
    }

    pub fn clear_faults(&self) {
        *self.fail_consensus_save_at.lock() = None;
        *self.fail_execution_save_at.lock() = None;
    }

    #[must_use]
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl ConsensusHashStore for FaultInjectingStore {
    async fn save(&self, slot: Slot, record: HeaderHashRecord) -> Result<(), StoreError> {
        if *self.fail_consensus_save_at.lock() == Some(slot) {
            return Err(StoreError::Backend(format!("injected consensus failure at slot {slot}")));
        }
        ConsensusHashStore::save(&self.inner, slot, record).await
    }

    async fn get(&self, slot: Slot) -> Result<Option<HeaderHashRecord>, StoreError> {
        ConsensusHashStore::get(&self.inner, slot).await
    }

    async fn range(
        &self,
        from_slot: Slot,
        limit: u64,
    ) -> Result<Vec<Option<HeaderHashRecord>>, StoreError> {
        ConsensusHashStore::range(&self.inner, from_slot, limit).await
    }
}

#[async_trait]
impl ExecutionHashStore for FaultInjectingStore {
    async fn save(&self, slot: Slot, record: HeaderHashRecord) -> Result<(), StoreError> {
        if *self.fail_execution_save_at.lock() == Some(slot) {
            return Err(StoreError::Backend(format!("injected execution failure at slot {slot}")));
        }
        ExecutionHashStore::save(&self.inner, slot, record).await
    }

    async fn get(&self, slot: Slot) -> Result<Option<HeaderHashRecord>, StoreError> {
        ExecutionHashStore::get(&self.inner, slot).await
    }

    async fn range(
        &self,
        from_slot: Slot,
        limit: u64,
    ) -> Result<Vec<Option<HeaderHashRecord>>, StoreError> {
        ExecutionHashStore::range(&self.inner, from_slot, limit).await
    }
}

#[async_trait]
impl RealmStore for FaultInjectingStore {
    async fn latest_verified_slot(&self) -> Result<Slot, StoreError> {
        self.inner.latest_verified_slot().await
    }

    async fn save_latest_verified_slot(&self, slot: Slot) -> Result<(), StoreError> {
        self.inner.save_latest_verified_slot(slot).await
    }
}

/// A consensus block whose tree root is stable per slot.
#[must_use]
pub fn consensus_block(slot: Slot) -> ConsensusBlock {
    ConsensusBlock {
        slot,
        proposer_index: slot % 64,
        parent_root: Hash([0x10; 32]),
        state_root: Hash([0x20; 32]),
        body_root: Hash([0x30; 32]),
    }
}

/// An execution header whose hash is stable per slot.
#[must_use]
pub fn execution_header(slot: Slot) -> ExecutionHeader {
    ExecutionHeader {
        slot,
        number: slot,
        parent_hash: Hash([0x40; 32]),
        state_root: Hash([0x50; 32]),
        timestamp: 1_700_000_000 + slot * 6,
        extra_data: vec![0xca, 0xfe],
    }
}

/// Builds a [`CanonicalizationService`] whose three store roles are all
/// backed by `store`, with idle announcement channels. Returns the service
/// plus the senders keeping those channels open.
pub fn engine_over<S>(
    store: &Arc<S>,
) -> (Arc<CanonicalizationService>, mpsc::Sender<HeaderInfo>, mpsc::Sender<HeaderInfo>)
where
    S: ConsensusHashStore + ExecutionHashStore + RealmStore + 'static,
{
    let (shutdown_tx, _) = broadcast::channel(4);
    let (consensus_tx, consensus_rx) = mpsc::channel(16);
    let (execution_tx, execution_rx) = mpsc::channel(16);

    let service = Arc::new(CanonicalizationService::new(
        SpliceConfig::default(),
        Arc::clone(store) as Arc<dyn ConsensusHashStore>,
        Arc::clone(store) as Arc<dyn ExecutionHashStore>,
        Arc::clone(store) as Arc<dyn RealmStore>,
        consensus_rx,
        execution_rx,
        shutdown_tx,
        Arc::new(AtomicBool::new(false)),
    ));

    (service, consensus_tx, execution_tx)
}

/// Seeds pending records on both chains at `slot`, the way the ingestion
/// hooks would.
pub async fn seed_pair<S>(store: &S, slot: Slot)
where
    S: ConsensusHashStore + ExecutionHashStore,
{
    let block = consensus_block(slot);
    let header = execution_header(slot);

    ConsensusHashStore::save(store, slot, HeaderHashRecord::pending(block.hash_tree_root()))
        .await
        .expect("seed consensus record");
    ExecutionHashStore::save(store, slot, HeaderHashRecord::pending(header.hash()))
        .await
        .expect("seed execution record");
}
