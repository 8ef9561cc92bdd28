//! Ingestion hooks called by the chain-client adapters.
//!
//! The adapters themselves (the gRPC/WS subscriptions against the two
//! nodes) live outside this crate; these hooks are the surface they call
//! into. Each hook publishes to the matching feed, persists a `Pending`
//! record, and forwards the announcement into the engine pipeline.
//! Persistence failures are logged and dropped: an adapter cannot do
//! anything useful with them, and the next announcement re-drives the
//! pipeline.

use crate::{
    cache::HeaderCache,
    feed::{Feed, Subscription},
    store::{ConsensusHashStore, ConsensusInfoStore, ExecutionHashStore},
    types::{ConsensusBlock, ConsensusInfo, ExecutionHeader, HeaderHashRecord, HeaderInfo},
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Malformed ingestion payloads; logged at the hook boundary, never
/// propagated to adapters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// The adapter-facing ingestion surface.
///
/// Writes only `Pending` records; records already resolved to a terminal
/// status by the engine are never overwritten here.
pub struct IngestService {
    header_cache: Arc<HeaderCache>,
    consensus_store: Arc<dyn ConsensusHashStore>,
    execution_store: Arc<dyn ExecutionHashStore>,
    consensus_info_store: Arc<dyn ConsensusInfoStore>,

    consensus_info_feed: Feed<ConsensusInfo>,
    consensus_header_feed: Feed<HeaderInfo>,
    execution_header_feed: Feed<HeaderInfo>,

    consensus_headers_tx: mpsc::Sender<HeaderInfo>,
    execution_headers_tx: mpsc::Sender<HeaderInfo>,
}

impl IngestService {
    pub fn new(
        header_cache: Arc<HeaderCache>,
        consensus_store: Arc<dyn ConsensusHashStore>,
        execution_store: Arc<dyn ExecutionHashStore>,
        consensus_info_store: Arc<dyn ConsensusInfoStore>,
        consensus_headers_tx: mpsc::Sender<HeaderInfo>,
        execution_headers_tx: mpsc::Sender<HeaderInfo>,
    ) -> Self {
        Self {
            header_cache,
            consensus_store,
            execution_store,
            consensus_info_store,
            consensus_info_feed: Feed::new(),
            consensus_header_feed: Feed::new(),
            execution_header_feed: Feed::new(),
            consensus_headers_tx,
            execution_headers_tx,
        }
    }

    /// Publishes new epoch metadata to subscribers, then persists it.
    pub async fn on_new_consensus_info(&self, info: ConsensusInfo) {
        let sent = self.consensus_info_feed.send(&info);
        trace!(epoch = info.epoch, sent, "sent consensus info to subscribers");

        if let Err(err) = self.consensus_info_store.save_consensus_info(&info).await {
            warn!(epoch = info.epoch, error = %err, "failed to save consensus info");
        }
    }

    /// Records a pending consensus-chain block at its slot and forwards
    /// the announcement to the engine.
    pub async fn on_new_pending_consensus_block(&self, block: &ConsensusBlock) {
        if let Err(err) = self.validate_slot(block.slot) {
            warn!(error = %err, "dropping pending consensus block");
            return;
        }

        let header_info = HeaderInfo { slot: block.slot, hash: block.hash_tree_root() };

        if !self.persist_consensus_pending(&header_info).await {
            return;
        }

        let sent = self.consensus_header_feed.send(&header_info);
        trace!(slot = header_info.slot, sent, "sent consensus header info to subscribers");

        if self.consensus_headers_tx.send(header_info).await.is_err() {
            debug!(slot = header_info.slot, "engine pipeline closed, announcement dropped");
        }
    }

    /// Caches the full execution header, records its pending hash, and
    /// forwards the announcement to the engine.
    pub async fn on_new_pending_execution_header(&self, header: &ExecutionHeader) {
        if let Err(err) = self.validate_slot(header.slot) {
            warn!(error = %err, "dropping pending execution header");
            return;
        }

        self.header_cache.put(header.slot, header);

        let header_info = HeaderInfo { slot: header.slot, hash: header.hash() };

        if !self.persist_execution_pending(&header_info).await {
            return;
        }

        let sent = self.execution_header_feed.send(&header_info);
        trace!(slot = header_info.slot, sent, "sent execution header info to subscribers");

        if self.execution_headers_tx.send(header_info).await.is_err() {
            debug!(slot = header_info.slot, "engine pipeline closed, announcement dropped");
        }
    }

    /// Subscribes to epoch metadata events.
    #[must_use]
    pub fn subscribe_consensus_info(&self) -> Subscription<ConsensusInfo> {
        self.consensus_info_feed.subscribe()
    }

    /// Subscribes to consensus-chain header announcements.
    #[must_use]
    pub fn subscribe_consensus_header_info(&self) -> Subscription<HeaderInfo> {
        self.consensus_header_feed.subscribe()
    }

    /// Subscribes to execution-chain header announcements.
    #[must_use]
    pub fn subscribe_execution_header_info(&self) -> Subscription<HeaderInfo> {
        self.execution_header_feed.subscribe()
    }

    fn validate_slot(&self, slot: u64) -> Result<(), IngestError> {
        if slot == 0 {
            return Err(IngestError::InvalidInput("slot 0 is the genesis sentinel".to_string()));
        }
        Ok(())
    }

    async fn persist_consensus_pending(&self, header_info: &HeaderInfo) -> bool {
        match self.consensus_store.get(header_info.slot).await {
            Ok(Some(existing)) if existing.status.is_terminal() => {
                debug!(
                    slot = header_info.slot,
                    status = %existing.status,
                    "slot already resolved, pending consensus hash ignored"
                );
                return false;
            }
            Ok(_) => {}
            Err(err) => {
                warn!(slot = header_info.slot, error = %err, "failed to read consensus record");
                return false;
            }
        }

        if let Err(err) = self
            .consensus_store
            .save(header_info.slot, HeaderHashRecord::pending(header_info.hash))
            .await
        {
            warn!(slot = header_info.slot, error = %err, "failed to save consensus block hash");
            return false;
        }

        true
    }

    async fn persist_execution_pending(&self, header_info: &HeaderInfo) -> bool {
        match self.execution_store.get(header_info.slot).await {
            Ok(Some(existing)) if existing.status.is_terminal() => {
                debug!(
                    slot = header_info.slot,
                    status = %existing.status,
                    "slot already resolved, pending execution hash ignored"
                );
                return false;
            }
            Ok(_) => {}
            Err(err) => {
                warn!(slot = header_info.slot, error = %err, "failed to read execution record");
                return false;
            }
        }

        if let Err(err) = self
            .execution_store
            .save(header_info.slot, HeaderHashRecord::pending(header_info.hash))
            .await
        {
            warn!(slot = header_info.slot, error = %err, "failed to save execution header hash");
            return false;
        }

        true
    }
}
