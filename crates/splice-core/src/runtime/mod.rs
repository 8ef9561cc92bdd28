//! Orchestrator lifecycle: component wiring, background tasks, and
//! graceful shutdown.
//!
//! The [`Orchestrator`] owns the ingestion surface and the engine task and
//! coordinates shutdown through one broadcast channel plus a stopping
//! flag, so an in-flight canonicalization pass bails at its next
//! checkpoint instead of committing further verdicts.

use crate::{
    cache::{CacheError, HeaderCache},
    config::SpliceConfig,
    engine::CanonicalizationService,
    ingest::IngestService,
    store::{
        ConsensusHashStore, ConsensusInfoStore, ExecutionHashStore, MemoryStore, RealmStore,
    },
    types::HeaderInfo,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tracing::{info, warn};

/// Depth of the per-chain announcement channels between ingestion and the
/// engine pipeline.
const ANNOUNCEMENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Storage backends behind the orchestrator's three narrow store roles.
/// One concrete backend usually fills every role.
pub struct StoreSet {
    pub consensus: Arc<dyn ConsensusHashStore>,
    pub execution: Arc<dyn ExecutionHashStore>,
    pub realm: Arc<dyn RealmStore>,
    pub consensus_info: Arc<dyn ConsensusInfoStore>,
}

impl StoreSet {
    /// All four roles backed by one shared [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            consensus: Arc::clone(&store) as Arc<dyn ConsensusHashStore>,
            execution: Arc::clone(&store) as Arc<dyn ExecutionHashStore>,
            realm: Arc::clone(&store) as Arc<dyn RealmStore>,
            consensus_info: store,
        }
    }
}

/// Builder for [`Orchestrator`]; the recommended way to construct one.
pub struct OrchestratorBuilder {
    config: SpliceConfig,
    stores: Option<StoreSet>,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self { config: SpliceConfig::default(), stores: None }
    }

    #[must_use]
    pub fn with_config(mut self, config: SpliceConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the default in-memory backends, e.g. with a persistent
    /// store or a fault-injecting test wrapper.
    #[must_use]
    pub fn with_stores(mut self, stores: StoreSet) -> Self {
        self.stores = Some(stores);
        self
    }

    /// Wires the components and starts the engine work loop.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the configuration fails validation.
    pub fn build(self) -> Result<Orchestrator, RuntimeError> {
        self.config.validate().map_err(|err| RuntimeError::InvalidConfig(err.to_string()))?;

        let stores = self.stores.unwrap_or_else(StoreSet::in_memory);

        let header_cache = Arc::new(HeaderCache::new(self.config.header_cache_capacity)?);

        let (consensus_tx, consensus_rx) =
            mpsc::channel::<HeaderInfo>(ANNOUNCEMENT_CHANNEL_CAPACITY);
        let (execution_tx, execution_rx) =
            mpsc::channel::<HeaderInfo>(ANNOUNCEMENT_CHANNEL_CAPACITY);

        let (shutdown_tx, _) = broadcast::channel(8);
        let stopping = Arc::new(AtomicBool::new(false));

        let ingest = Arc::new(IngestService::new(
            Arc::clone(&header_cache),
            Arc::clone(&stores.consensus),
            Arc::clone(&stores.execution),
            Arc::clone(&stores.consensus_info),
            consensus_tx,
            execution_tx,
        ));

        let engine = Arc::new(CanonicalizationService::new(
            self.config.clone(),
            Arc::clone(&stores.consensus),
            Arc::clone(&stores.execution),
            Arc::clone(&stores.realm),
            consensus_rx,
            execution_rx,
            shutdown_tx.clone(),
            Arc::clone(&stopping),
        ));

        let engine_task = engine.start();
        info!("canonicalization engine task started");

        Ok(Orchestrator {
            ingest,
            engine,
            header_cache,
            engine_task: Some(engine_task),
            shutdown_tx,
            stopping,
            shutdown_initiated: AtomicBool::new(false),
        })
    }
}

/// Runtime container owning the orchestrator's components and tasks.
pub struct Orchestrator {
    ingest: Arc<IngestService>,
    engine: Arc<CanonicalizationService>,
    header_cache: Arc<HeaderCache>,
    engine_task: Option<JoinHandle<()>>,
    shutdown_tx: broadcast::Sender<()>,
    stopping: Arc<AtomicBool>,
    shutdown_initiated: AtomicBool,
}

impl Orchestrator {
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// The adapter-facing ingestion surface.
    #[must_use]
    pub fn ingest(&self) -> &Arc<IngestService> {
        &self.ingest
    }

    /// The canonicalization engine, for direct pass invocation and error
    /// channel access.
    #[must_use]
    pub fn engine(&self) -> &Arc<CanonicalizationService> {
        &self.engine
    }

    #[must_use]
    pub fn header_cache(&self) -> &Arc<HeaderCache> {
        &self.header_cache
    }

    /// A receiver on the shutdown broadcast, for custom background tasks.
    #[must_use]
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signals every task to stop and awaits the engine loop. Idempotent.
    pub async fn shutdown(mut self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("shutdown already initiated, ignoring duplicate call");
            return;
        }

        info!("initiating orchestrator shutdown");
        self.stopping.store(true, Ordering::Release);
        if self.shutdown_tx.send(()).is_err() {
            warn!("no tasks listening for shutdown signal");
        }

        if let Some(engine_task) = self.engine_task.take() {
            match engine_task.await {
                Ok(()) => info!("engine task completed"),
                Err(err) if err.is_cancelled() => info!("engine task cancelled"),
                Err(err) => warn!(error = %err, "engine task failed"),
            }
        }

        info!("orchestrator shutdown complete");
    }
}
