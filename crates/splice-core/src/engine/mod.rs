//! The pairing and canonicalization engine.
//!
//! Announcements from the two chains are merged, debounced, and resolved
//! in batch passes. A pass reads the realm watermark, pulls a dense window
//! of per-slot records from both hash stores, and classifies every slot:
//!
//! - both chains produced → upgrade both records to `Verified` and advance
//!   the watermark to that slot
//! - exactly one chain produced → the lone record is an orphan; once the
//!   watermark moves past it, the slot is declared `Skipped`
//! - neither chain produced → a possible skip, confirmed `Skipped` only
//!   for slots at or below the advanced watermark
//!
//! # Single-writer discipline
//!
//! The engine is the only writer of terminal statuses and of the realm
//! watermark. At most one pass runs at a time, gated by the `working`
//! flag; triggers that arrive mid-pass coalesce into the next tick. The
//! watermark never moves backward: only freshly verified slots are saved,
//! and the pass asserts the invariant before finalizing.
//!
//! # Failure semantics
//!
//! Any storage error is fatal to the in-flight pass. The composite
//! [`DatabaseErrors`] triple attributes the fault to a chain (or the realm
//! store) and is pushed on the engine's error channel; the pass is not
//! retried; the next debounce tick re-drives canonicalization from the
//! (possibly unchanged) watermark.

use crate::{
    config::SpliceConfig,
    pipeline::{debounce, merge},
    store::{ConsensusHashStore, ExecutionHashStore, RealmStore, StoreError},
    types::{HeaderHashRecord, HeaderInfo, RealmPair, Slot},
};
use parking_lot::Mutex;
use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tracing::{debug, error, info, trace, warn};

/// Error channel depth; storage hiccups must not deadlock the pipeline.
const ERROR_CHANNEL_CAPACITY: usize = 10_000;

/// Buffer for the merged announcement stream feeding the debouncer.
const MERGED_CHANNEL_CAPACITY: usize = 1024;

/// Failures attributable to one side of the pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// `from_slot` is ahead of the verified watermark; the pass has no
    /// root to invalidate from. Indicates a logic bug or a corrupted
    /// watermark.
    #[error("cannot start invalidation without root: from_slot {from_slot} is ahead of verified slot {latest_verified}")]
    CannotStartWithoutRoot { from_slot: Slot, latest_verified: Slot },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Composite pass failure, one optional error per store role so callers
/// can attribute the fault to a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseErrors {
    pub consensus_err: Option<EngineError>,
    pub execution_err: Option<EngineError>,
    pub realm_err: Option<EngineError>,
}

impl DatabaseErrors {
    #[must_use]
    pub fn consensus(err: impl Into<EngineError>) -> Self {
        Self { consensus_err: Some(err.into()), ..Self::default() }
    }

    #[must_use]
    pub fn execution(err: impl Into<EngineError>) -> Self {
        Self { execution_err: Some(err.into()), ..Self::default() }
    }

    #[must_use]
    pub fn realm(err: impl Into<EngineError>) -> Self {
        Self { realm_err: Some(err.into()), ..Self::default() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.consensus_err.is_none() && self.execution_err.is_none() && self.realm_err.is_none()
    }
}

impl fmt::Display for DatabaseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote = false;
        if let Some(err) = &self.consensus_err {
            write!(f, "consensus: {err}")?;
            wrote = true;
        }
        if let Some(err) = &self.execution_err {
            if wrote {
                f.write_str("; ")?;
            }
            write!(f, "execution: {err}")?;
            wrote = true;
        }
        if let Some(err) = &self.realm_err {
            if wrote {
                f.write_str("; ")?;
            }
            write!(f, "realm: {err}")?;
            wrote = true;
        }
        if !wrote {
            f.write_str("no errors")?;
        }
        Ok(())
    }
}

impl std::error::Error for DatabaseErrors {}

/// How a canonicalization pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The watermark advanced by `newly_verified` slots.
    Completed { newly_verified: u64, latest_verified_slot: Slot },
    /// One of the batches was empty; nothing to pair yet.
    NoWork,
    /// Batches were read but no slot could be verified; orphans and
    /// possible skips stay pending for a future pass.
    NoProgress,
    /// A stop signal was observed at a checkpoint; no error.
    ShuttingDown,
}

/// Everything one pass needs, prepared before any write happens.
struct InvalidationWork {
    invalidation_start_slot: Slot,
    from_slot: Slot,
    consensus_batch: Vec<Option<HeaderHashRecord>>,
    execution_batch: Vec<Option<HeaderHashRecord>>,
    possible_skipped: Vec<RealmPair>,
    consensus_orphans: BTreeMap<Slot, HeaderHashRecord>,
    execution_orphans: BTreeMap<Slot, HeaderHashRecord>,
}

/// The canonicalization state machine. See the module docs for the
/// algorithm and the concurrency contract.
pub struct CanonicalizationService {
    config: SpliceConfig,
    consensus_store: Arc<dyn ConsensusHashStore>,
    execution_store: Arc<dyn ExecutionHashStore>,
    realm_store: Arc<dyn RealmStore>,

    consensus_headers_rx: Mutex<Option<mpsc::Receiver<HeaderInfo>>>,
    execution_headers_rx: Mutex<Option<mpsc::Receiver<HeaderInfo>>>,

    err_tx: mpsc::Sender<DatabaseErrors>,
    err_rx: Mutex<Option<mpsc::Receiver<DatabaseErrors>>>,

    shutdown_tx: broadcast::Sender<()>,
    // Subscribed at construction so a stop signal sent before the work
    // loop is scheduled is still observed.
    work_shutdown_rx: Mutex<Option<broadcast::Receiver<()>>>,
    debounce_shutdown_rx: Mutex<Option<broadcast::Receiver<()>>>,
    stopping: Arc<AtomicBool>,
    working: AtomicBool,
}

impl CanonicalizationService {
    /// Wires the service. The announcement receivers are consumed by
    /// [`start`](Self::start); `shutdown_tx` and `stopping` are shared
    /// with the runtime so one stop signal reaches every task.
    pub fn new(
        config: SpliceConfig,
        consensus_store: Arc<dyn ConsensusHashStore>,
        execution_store: Arc<dyn ExecutionHashStore>,
        realm_store: Arc<dyn RealmStore>,
        consensus_headers_rx: mpsc::Receiver<HeaderInfo>,
        execution_headers_rx: mpsc::Receiver<HeaderInfo>,
        shutdown_tx: broadcast::Sender<()>,
        stopping: Arc<AtomicBool>,
    ) -> Self {
        let (err_tx, err_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        let work_shutdown_rx = shutdown_tx.subscribe();
        let debounce_shutdown_rx = shutdown_tx.subscribe();

        Self {
            config,
            consensus_store,
            execution_store,
            realm_store,
            consensus_headers_rx: Mutex::new(Some(consensus_headers_rx)),
            execution_headers_rx: Mutex::new(Some(execution_headers_rx)),
            err_tx,
            err_rx: Mutex::new(Some(err_rx)),
            shutdown_tx,
            work_shutdown_rx: Mutex::new(Some(work_shutdown_rx)),
            debounce_shutdown_rx: Mutex::new(Some(debounce_shutdown_rx)),
            stopping,
            working: AtomicBool::new(false),
        }
    }

    /// Spawns the work loop: merger, debouncer, and the trigger loop that
    /// runs passes. Call once.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.work_loop().await })
    }

    /// Requests a stop: sets the stopping flag so in-flight passes bail at
    /// the next checkpoint, then wakes every task blocked on the shutdown
    /// channel.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(());
    }

    /// Whether a pass is currently executing.
    #[must_use]
    pub fn is_working(&self) -> bool {
        self.working.load(Ordering::Acquire)
    }

    /// Takes the receiving half of the error channel. The first caller
    /// gets it; pass failures are observable there as composite triples.
    pub fn take_error_receiver(&self) -> Option<mpsc::Receiver<DatabaseErrors>> {
        self.err_rx.lock().take()
    }

    fn stop_requested(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    fn push_error(&self, errors: DatabaseErrors) {
        if self.err_tx.try_send(errors).is_err() {
            warn!("engine error channel full or closed, pass failure not enqueued");
        }
    }

    /// Runs one canonicalization pass over `[from_slot, from_slot +
    /// batch_limit)`.
    ///
    /// Must be invoked repeatedly as new announcements arrive; the work
    /// loop does so on every debounce tick. Safe to call directly for
    /// tests and recovery tooling; the caller is responsible for not
    /// racing two passes.
    ///
    /// # Errors
    ///
    /// Returns the composite [`DatabaseErrors`] triple on the first
    /// storage failure; the same value is pushed on the error channel.
    pub async fn canonicalize(
        &self,
        from_slot: Slot,
        batch_limit: u64,
    ) -> Result<PassOutcome, DatabaseErrors> {
        let result = self.run_pass(from_slot, batch_limit).await;

        if let Err(errors) = &result {
            error!(%errors, "canonicalization pass failed");
            self.push_error(errors.clone());
        }

        result
    }

    async fn run_pass(
        &self,
        from_slot: Slot,
        batch_limit: u64,
    ) -> Result<PassOutcome, DatabaseErrors> {
        if self.stop_requested() {
            return Ok(PassOutcome::ShuttingDown);
        }

        let Some(work) = self.prepare_invalidation(from_slot, batch_limit).await? else {
            return Ok(PassOutcome::NoWork);
        };

        if self.stop_requested() {
            return Ok(PassOutcome::ShuttingDown);
        }

        self.commit_prepared_work(work).await
    }

    /// Reads the watermark and both batch windows, validating that the
    /// requested window has a verified root to extend from.
    async fn prepare_invalidation(
        &self,
        from_slot: Slot,
        batch_limit: u64,
    ) -> Result<Option<InvalidationWork>, DatabaseErrors> {
        let latest_verified =
            self.realm_store.latest_verified_slot().await.map_err(DatabaseErrors::realm)?;

        if from_slot > latest_verified {
            return Err(DatabaseErrors::realm(EngineError::CannotStartWithoutRoot {
                from_slot,
                latest_verified,
            }));
        }

        info!(latest_verified, from_slot, "invalidation starts");

        let execution_batch = self
            .execution_store
            .range(from_slot, batch_limit)
            .await
            .map_err(DatabaseErrors::execution)?;

        let consensus_batch = self
            .consensus_store
            .range(from_slot, batch_limit)
            .await
            .map_err(DatabaseErrors::consensus)?;

        // Batches are dense windows; a chain with no records at all in the
        // window yields all-`None` and there is nothing to pair against.
        if consensus_batch.iter().all(Option::is_none)
            || execution_batch.iter().all(Option::is_none)
        {
            trace!(
                consensus_range = consensus_batch.len(),
                execution_range = execution_batch.len(),
                "not enough blocks to start invalidation"
            );
            return Ok(None);
        }

        trace!(
            consensus_range = consensus_batch.len(),
            execution_range = execution_batch.len(),
            "invalidation with range of blocks"
        );

        Ok(Some(InvalidationWork {
            invalidation_start_slot: latest_verified,
            from_slot,
            consensus_batch,
            execution_batch,
            possible_skipped: Vec::new(),
            consensus_orphans: BTreeMap::new(),
            execution_orphans: BTreeMap::new(),
        }))
    }

    /// Classifies every slot in the prepared window and commits verdicts
    /// in ascending slot order.
    async fn commit_prepared_work(
        &self,
        mut work: InvalidationWork,
    ) -> Result<PassOutcome, DatabaseErrors> {
        let start_slot = work.invalidation_start_slot;
        let from_slot = work.from_slot;
        let mut latest_verified = start_slot;

        // Slots past the last record on either chain are all-`None` pairs:
        // they cannot verify and any possible-skip recorded for them would
        // sit above the final watermark and be dropped anyway. Bounding the
        // walk there keeps a sparse window from materializing one entry per
        // empty slot up to the batch limit.
        let last_populated = work
            .consensus_batch
            .iter()
            .rposition(Option::is_some)
            .max(work.execution_batch.iter().rposition(Option::is_some));

        let pair_count = match last_populated {
            Some(last) => {
                (last + 1).min(work.consensus_batch.len()).min(work.execution_batch.len())
            }
            None => 0,
        };

        for index in 0..pair_count {
            let slot = from_slot + index as u64;

            match (work.consensus_batch[index], work.execution_batch[index]) {
                // Neither chain produced: a possible true skip, resolved
                // after the loop once the watermark position is known.
                (None, None) => work.possible_skipped.push(RealmPair::unresolved(slot)),

                (Some(consensus), None) => {
                    if !consensus.status.is_terminal() {
                        work.consensus_orphans
                            .insert(slot, HeaderHashRecord::pending(consensus.hash));
                    }
                }

                (None, Some(execution)) => {
                    if !execution.status.is_terminal() {
                        work.execution_orphans
                            .insert(slot, HeaderHashRecord::pending(execution.hash));
                    }
                }

                (Some(consensus), Some(execution)) => {
                    if consensus.status.is_terminal() && execution.status.is_terminal() {
                        // Resolved by an earlier pass; terminal records are
                        // never rewritten.
                        continue;
                    }

                    if consensus.status.is_terminal() || execution.status.is_terminal() {
                        // Half-resolved slot, left behind by an interrupted
                        // pass or a late announcement. Heal the pending side
                        // to the terminal verdict; never downgrade.
                        latest_verified = self
                            .reconcile_half_resolved(slot, consensus, execution, latest_verified)
                            .await?;
                        continue;
                    }

                    debug!(slot, hash = ?consensus.hash, "recording verified consensus hash");
                    debug!(slot, hash = ?execution.hash, "recording verified execution hash");

                    let consensus_write = self
                        .consensus_store
                        .save(slot, HeaderHashRecord::verified(consensus.hash))
                        .await;
                    let execution_write = self
                        .execution_store
                        .save(slot, HeaderHashRecord::verified(execution.hash))
                        .await;

                    if consensus_write.is_err() || execution_write.is_err() {
                        return Err(DatabaseErrors {
                            consensus_err: consensus_write.err().map(Into::into),
                            execution_err: execution_write.err().map(Into::into),
                            realm_err: None,
                        });
                    }

                    self.realm_store
                        .save_latest_verified_slot(slot)
                        .await
                        .map_err(DatabaseErrors::realm)?;
                    latest_verified = slot;
                }
            }
        }

        if self.stop_requested() {
            return Ok(PassOutcome::ShuttingDown);
        }

        // Slots are unsigned; the never-rewind intent is enforced as an
        // invariant assertion rather than a signed range check.
        assert!(
            latest_verified >= start_slot,
            "invalidation range went negative: start {start_slot}, latest {latest_verified}"
        );
        let invalidation_range = latest_verified - start_slot;

        info!(
            possible_skipped = work.possible_skipped.len(),
            latest_verified,
            invalidation_start_slot = start_slot,
            "resolving possible skipped pairs"
        );

        if invalidation_range == 0 {
            // Orphans and possible skips stay pending until some slot
            // actually verifies.
            warn!(start_slot, latest_verified, "canonicalization made no forward progress");
            return Ok(PassOutcome::NoProgress);
        }

        self.finalize_orphans(&work, latest_verified).await?;

        if self.stop_requested() {
            return Ok(PassOutcome::ShuttingDown);
        }

        self.finalize_possible_skipped(&work, latest_verified).await?;

        if self.stop_requested() {
            return Ok(PassOutcome::ShuttingDown);
        }

        self.fill_gaps(start_slot, invalidation_range, latest_verified).await?;

        info!(highest_checked_slot = latest_verified, "canonicalization pass resolved");

        Ok(PassOutcome::Completed { newly_verified: invalidation_range, latest_verified_slot: latest_verified })
    }

    /// Resolves a slot where exactly one chain's record is already
    /// terminal. The pending side adopts the terminal verdict: a
    /// half-verified slot finishes verifying (advancing the watermark if
    /// it sits above it), a skipped slot pulls its partner to skipped.
    /// `Invalid` is reserved and left for operator inspection.
    ///
    /// Returns the (possibly advanced) watermark.
    async fn reconcile_half_resolved(
        &self,
        slot: Slot,
        consensus: HeaderHashRecord,
        execution: HeaderHashRecord,
        latest_verified: Slot,
    ) -> Result<Slot, DatabaseErrors> {
        use crate::types::HashStatus;

        let (terminal, terminal_is_consensus) = if consensus.status.is_terminal() {
            (consensus, true)
        } else {
            (execution, false)
        };

        match terminal.status {
            HashStatus::Verified => {
                warn!(slot, "completing half-verified slot");
                if terminal_is_consensus {
                    self.execution_store
                        .save(slot, HeaderHashRecord::verified(execution.hash))
                        .await
                        .map_err(DatabaseErrors::execution)?;
                } else {
                    self.consensus_store
                        .save(slot, HeaderHashRecord::verified(consensus.hash))
                        .await
                        .map_err(DatabaseErrors::consensus)?;
                }
                if slot > latest_verified {
                    self.realm_store
                        .save_latest_verified_slot(slot)
                        .await
                        .map_err(DatabaseErrors::realm)?;
                    return Ok(slot);
                }
            }
            HashStatus::Skipped => {
                if terminal_is_consensus {
                    self.execution_store
                        .save(slot, HeaderHashRecord::skipped())
                        .await
                        .map_err(DatabaseErrors::execution)?;
                } else {
                    self.consensus_store
                        .save(slot, HeaderHashRecord::skipped())
                        .await
                        .map_err(DatabaseErrors::consensus)?;
                }
            }
            HashStatus::Invalid | HashStatus::Pending => {
                warn!(
                    slot,
                    consensus_status = %consensus.status,
                    execution_status = %execution.status,
                    "slot statuses diverge across chains"
                );
            }
        }

        Ok(latest_verified)
    }

    /// Marks orphans at or below the watermark as skipped: the watermark
    /// moved past them, so the lone side definitively has no partner.
    /// Orphans above the watermark wait for a future pass.
    async fn finalize_orphans(
        &self,
        work: &InvalidationWork,
        latest_verified: Slot,
    ) -> Result<(), DatabaseErrors> {
        for &slot in work.consensus_orphans.keys() {
            if slot > latest_verified {
                continue;
            }
            self.consensus_store
                .save(slot, HeaderHashRecord::skipped())
                .await
                .map_err(DatabaseErrors::consensus)?;
        }

        for &slot in work.execution_orphans.keys() {
            if slot > latest_verified {
                continue;
            }
            self.execution_store
                .save(slot, HeaderHashRecord::skipped())
                .await
                .map_err(DatabaseErrors::execution)?;
        }

        Ok(())
    }

    /// Confirms possible skips at or below the watermark on both stores;
    /// pairs above it remain pending for a future pass.
    async fn finalize_possible_skipped(
        &self,
        work: &InvalidationWork,
        latest_verified: Slot,
    ) -> Result<(), DatabaseErrors> {
        let mut still_pending = 0usize;

        for pair in &work.possible_skipped {
            if pair.slot > latest_verified {
                still_pending += 1;
                continue;
            }

            self.consensus_store
                .save(pair.slot, HeaderHashRecord::skipped())
                .await
                .map_err(DatabaseErrors::consensus)?;
            self.execution_store
                .save(pair.slot, HeaderHashRecord::skipped())
                .await
                .map_err(DatabaseErrors::execution)?;
        }

        if still_pending > 0 {
            debug!(still_pending, "possible skipped pairs above watermark left pending");
        }

        Ok(())
    }

    /// Re-reads the progressed window and marks any remaining hole at or
    /// below the watermark as skipped, so no pending gap survives behind
    /// it.
    async fn fill_gaps(
        &self,
        start_slot: Slot,
        invalidation_range: u64,
        latest_verified: Slot,
    ) -> Result<(), DatabaseErrors> {
        let consensus_tail = self
            .consensus_store
            .range(start_slot, invalidation_range)
            .await
            .map_err(DatabaseErrors::consensus)?;

        let execution_tail = self
            .execution_store
            .range(start_slot, invalidation_range)
            .await
            .map_err(DatabaseErrors::execution)?;

        // Walk every slot of the progressed window; a position the batch
        // does not cover counts as a hole, so a backend returning a short
        // window cannot hide an unterminalized slot behind the watermark.
        for offset in 0..invalidation_range {
            let slot = start_slot + offset;
            if slot > latest_verified {
                continue;
            }
            let index = offset as usize;

            if consensus_tail.get(index).map_or(true, Option::is_none) {
                self.consensus_store
                    .save(slot, HeaderHashRecord::skipped())
                    .await
                    .map_err(DatabaseErrors::consensus)?;
            }

            if execution_tail.get(index).map_or(true, Option::is_none) {
                self.execution_store
                    .save(slot, HeaderHashRecord::skipped())
                    .await
                    .map_err(DatabaseErrors::execution)?;
            }
        }

        Ok(())
    }

    /// The long-running loop: forwards merged announcements into the
    /// debouncer and runs a pass per trigger. Announcements arriving while
    /// a pass executes queue in the merged channel and coalesce into the
    /// next tick.
    async fn work_loop(&self) {
        let Some(consensus_rx) = self.consensus_headers_rx.lock().take() else {
            warn!("canonicalization work loop already started");
            return;
        };
        let Some(execution_rx) = self.execution_headers_rx.lock().take() else {
            warn!("canonicalization work loop already started");
            return;
        };
        let (Some(mut shutdown_rx), Some(debounce_shutdown_rx)) =
            (self.work_shutdown_rx.lock().take(), self.debounce_shutdown_rx.lock().take())
        else {
            warn!("canonicalization work loop already started");
            return;
        };

        match self.realm_store.latest_verified_slot().await {
            Ok(slot) => info!(verified_slot = slot, "starting the canonicalization work loop"),
            Err(err) => warn!(error = %err, "failed to read watermark at work loop start"),
        }

        let mut merged = merge(vec![consensus_rx, execution_rx], MERGED_CHANNEL_CAPACITY);
        let (bridge_tx, bridge_rx) = mpsc::channel(MERGED_CHANNEL_CAPACITY);
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(1);

        let pending = Arc::new(AtomicUsize::new(0));
        let min_pending = self.config.min_pending_for_trigger;

        let handler_pending = Arc::clone(&pending);
        let handler = move |_latest: HeaderInfo| {
            // One announcement per chain is not enough to pair anything.
            if handler_pending.load(Ordering::Acquire) < min_pending {
                debug!("not enough pending announcements to trigger canonicalization");
                return;
            }
            // A full trigger queue means a pass is already scheduled.
            let _ = trigger_tx.try_send(());
        };

        let debounce_task = tokio::spawn(debounce(
            bridge_rx,
            self.config.debounce_interval(),
            handler,
            debounce_shutdown_rx,
        ));

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("canonicalization work loop received stop signal");
                    break;
                }

                Some(()) = trigger_rx.recv() => {
                    pending.store(0, Ordering::Release);
                    self.run_triggered_pass().await;
                }

                maybe = merged.recv() => match maybe {
                    Some(header_info) => {
                        pending.fetch_add(1, Ordering::AcqRel);
                        trace!(slot = header_info.slot, "forwarding merged announcement");
                        if bridge_tx.send(header_info).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        debug!("announcement channels closed, work loop exiting");
                        break;
                    }
                },
            }
        }

        drop(bridge_tx);
        let _ = debounce_task.await;
    }

    async fn run_triggered_pass(&self) {
        if self.working.swap(true, Ordering::AcqRel) {
            debug!("canonicalization already in progress, trigger coalesced");
            return;
        }

        let from_slot = match self.realm_store.latest_verified_slot().await {
            Ok(slot) => slot,
            Err(err) => {
                warn!(error = %err, "failed to read watermark for triggered pass");
                self.working.store(false, Ordering::Release);
                return;
            }
        };

        info!(latest_verified = from_slot, "starting canonicalization");

        match self.canonicalize(from_slot, self.config.canonicalization_batch_limit).await {
            Ok(outcome) => debug!(?outcome, "canonicalization finished"),
            Err(errors) => debug!(%errors, "canonicalization failed"),
        }

        self.working.store(false, Ordering::Release);
    }
}
