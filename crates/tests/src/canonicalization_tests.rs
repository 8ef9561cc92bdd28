//! Batch-pass scenarios driven directly against the canonicalization
//! engine, covering pairing, one-sided and true skips, mid-pass storage
//! failures, and watermark stability.

use crate::mock_infrastructure::{
    consensus_block, engine_over, execution_header, seed_pair, FaultInjectingStore,
};
use splice_core::{
    engine::PassOutcome,
    store::{ConsensusHashStore, ExecutionHashStore, MemoryStore, RealmStore},
    types::{Hash, HashStatus, HeaderHashRecord},
};
use std::sync::Arc;

const BATCH_LIMIT: u64 = 50_000;

async fn consensus_record(store: &MemoryStore, slot: u64) -> Option<HeaderHashRecord> {
    ConsensusHashStore::get(store, slot).await.expect("consensus get")
}

async fn execution_record(store: &MemoryStore, slot: u64) -> Option<HeaderHashRecord> {
    ExecutionHashStore::get(store, slot).await.expect("execution get")
}

#[tokio::test]
async fn test_clean_pair_verifies_both_chains() {
    let store = Arc::new(MemoryStore::new());
    let (engine, _ctx, _etx) = engine_over(&store);

    seed_pair(&*store, 1).await;

    let outcome = engine.canonicalize(0, BATCH_LIMIT).await.expect("pass");
    assert_eq!(outcome, PassOutcome::Completed { newly_verified: 1, latest_verified_slot: 1 });

    let consensus = consensus_record(&store, 1).await.expect("record");
    let execution = execution_record(&store, 1).await.expect("record");

    assert_eq!(consensus.status, HashStatus::Verified);
    assert_eq!(execution.status, HashStatus::Verified);
    assert_eq!(consensus.hash, consensus_block(1).hash_tree_root());
    assert_eq!(execution.hash, execution_header(1).hash());
    assert!(!consensus.hash.is_zero());
    assert!(!execution.hash.is_zero());

    assert_eq!(store.latest_verified_slot().await.expect("watermark"), 1);
}

#[tokio::test]
async fn test_one_sided_slot_becomes_skipped_after_progress() {
    let store = Arc::new(MemoryStore::new());
    let (engine, _ctx, _etx) = engine_over(&store);

    // Slot 1: only the consensus chain produced. Slot 2: both did.
    ConsensusHashStore::save(
        &*store,
        1,
        HeaderHashRecord::pending(consensus_block(1).hash_tree_root()),
    )
    .await
    .expect("save");
    seed_pair(&*store, 2).await;

    let outcome = engine.canonicalize(0, BATCH_LIMIT).await.expect("pass");
    assert_eq!(outcome, PassOutcome::Completed { newly_verified: 2, latest_verified_slot: 2 });

    // The orphaned consensus record resolves to an empty-hash skip once
    // the watermark has moved past it.
    let orphan = consensus_record(&store, 1).await.expect("record");
    assert_eq!(orphan.status, HashStatus::Skipped);
    assert!(orphan.hash.is_zero());

    // The execution side of slot 1 never produced; the gap fill closes it.
    let gap = execution_record(&store, 1).await.expect("record");
    assert_eq!(gap.status, HashStatus::Skipped);

    assert_eq!(consensus_record(&store, 2).await.expect("record").status, HashStatus::Verified);
    assert_eq!(execution_record(&store, 2).await.expect("record").status, HashStatus::Verified);
    assert_eq!(store.latest_verified_slot().await.expect("watermark"), 2);
}

#[tokio::test]
async fn test_true_skip_marks_both_chains_skipped() {
    let store = Arc::new(MemoryStore::new());
    let (engine, _ctx, _etx) = engine_over(&store);

    // Neither chain produced at slot 1; both produced at slot 2.
    seed_pair(&*store, 2).await;

    let outcome = engine.canonicalize(0, BATCH_LIMIT).await.expect("pass");
    assert_eq!(outcome, PassOutcome::Completed { newly_verified: 2, latest_verified_slot: 2 });

    for record in
        [consensus_record(&store, 1).await.expect("record"), execution_record(&store, 1).await.expect("record")]
    {
        assert_eq!(record.status, HashStatus::Skipped);
        assert!(record.hash.is_zero());
    }

    assert_eq!(store.latest_verified_slot().await.expect("watermark"), 2);
}

#[tokio::test]
async fn test_storage_failure_mid_pass_stops_at_failed_slot() {
    let store = Arc::new(FaultInjectingStore::new());
    let (engine, _ctx, _etx) = engine_over(&store);
    let mut err_rx = engine.take_error_receiver().expect("error receiver");

    for slot in 1..=5 {
        seed_pair(&*store, slot).await;
    }
    store.fail_consensus_save_at(3);

    let errors = engine.canonicalize(0, BATCH_LIMIT).await.expect_err("injected failure");
    assert!(errors.consensus_err.is_some());
    assert!(errors.execution_err.is_none());

    // Slots 1-2 committed before the failure; slot 3 onward stays pending.
    for slot in [1, 2] {
        let record =
            ConsensusHashStore::get(&*store, slot).await.expect("get").expect("record");
        assert_eq!(record.status, HashStatus::Verified);
    }
    for slot in [3, 4, 5] {
        let record =
            ConsensusHashStore::get(&*store, slot).await.expect("get").expect("record");
        assert_eq!(record.status, HashStatus::Pending, "slot {slot} must stay pending");
    }

    assert_eq!(store.latest_verified_slot().await.expect("watermark"), 2);

    // The composite error reaches the engine's error channel too.
    let surfaced = err_rx.try_recv().expect("error surfaced");
    assert!(surfaced.consensus_err.is_some());
    assert!(surfaced.realm_err.is_none());
}

#[tokio::test]
async fn test_recovery_pass_heals_half_verified_slot() {
    let store = Arc::new(FaultInjectingStore::new());
    let (engine, _ctx, _etx) = engine_over(&store);

    for slot in 1..=5 {
        seed_pair(&*store, slot).await;
    }
    store.fail_consensus_save_at(3);
    engine.canonicalize(0, BATCH_LIMIT).await.expect_err("injected failure");

    // The failed write left slot 3 verified on one chain only. The next
    // debounce tick re-drives from the unchanged watermark and completes
    // the batch.
    store.clear_faults();
    let outcome = engine.canonicalize(2, BATCH_LIMIT).await.expect("recovery pass");
    assert_eq!(outcome, PassOutcome::Completed { newly_verified: 3, latest_verified_slot: 5 });

    for slot in 1..=5 {
        let consensus =
            ConsensusHashStore::get(&*store, slot).await.expect("get").expect("record");
        let execution =
            ExecutionHashStore::get(&*store, slot).await.expect("get").expect("record");
        assert_eq!(consensus.status, HashStatus::Verified, "consensus slot {slot}");
        assert_eq!(execution.status, HashStatus::Verified, "execution slot {slot}");
    }
    assert_eq!(store.latest_verified_slot().await.expect("watermark"), 5);
}

#[tokio::test]
async fn test_watermark_never_rewinds_on_replay() {
    let store = Arc::new(MemoryStore::new());
    let (engine, _ctx, _etx) = engine_over(&store);

    seed_pair(&*store, 1).await;
    engine.canonicalize(0, BATCH_LIMIT).await.expect("first pass");
    assert_eq!(store.latest_verified_slot().await.expect("watermark"), 1);

    let consensus_before = ConsensusHashStore::range(&*store, 0, 10).await.expect("range");
    let execution_before = ExecutionHashStore::range(&*store, 0, 10).await.expect("range");

    // Re-driving from slot 0 performs no writes and leaves the watermark
    // untouched.
    let outcome = engine.canonicalize(0, BATCH_LIMIT).await.expect("replay");
    assert_eq!(outcome, PassOutcome::NoProgress);

    assert_eq!(ConsensusHashStore::range(&*store, 0, 10).await.expect("range"), consensus_before);
    assert_eq!(ExecutionHashStore::range(&*store, 0, 10).await.expect("range"), execution_before);
    assert_eq!(store.latest_verified_slot().await.expect("watermark"), 1);
}

#[tokio::test]
async fn test_batch_limit_bounds_per_pass_work() {
    let store = Arc::new(MemoryStore::new());
    let (engine, _ctx, _etx) = engine_over(&store);

    for slot in 1..=10 {
        seed_pair(&*store, slot).await;
    }

    // A limit of 4 covers slots 0..4, verifying 1..=3.
    let outcome = engine.canonicalize(0, 4).await.expect("bounded pass");
    assert_eq!(outcome, PassOutcome::Completed { newly_verified: 3, latest_verified_slot: 3 });

    assert_eq!(consensus_record(&store, 4).await.expect("record").status, HashStatus::Pending);

    // The next pass picks up where this one left off.
    let outcome = engine.canonicalize(3, BATCH_LIMIT).await.expect("follow-up pass");
    assert_eq!(outcome, PassOutcome::Completed { newly_verified: 7, latest_verified_slot: 10 });
    assert_eq!(store.latest_verified_slot().await.expect("watermark"), 10);
}

#[tokio::test]
async fn test_orphans_above_watermark_stay_pending() {
    let store = Arc::new(MemoryStore::new());
    let (engine, _ctx, _etx) = engine_over(&store);

    // Both chains at slots 1-2, then a lone consensus block far ahead.
    seed_pair(&*store, 1).await;
    seed_pair(&*store, 2).await;
    ConsensusHashStore::save(
        &*store,
        5,
        HeaderHashRecord::pending(consensus_block(5).hash_tree_root()),
    )
    .await
    .expect("save");

    engine.canonicalize(0, BATCH_LIMIT).await.expect("pass");

    assert_eq!(store.latest_verified_slot().await.expect("watermark"), 2);

    // Slot 5 sits beyond the watermark; its verdict waits for a future
    // pass with more progress.
    let record = consensus_record(&store, 5).await.expect("record");
    assert_eq!(record.status, HashStatus::Pending);
}

#[tokio::test]
async fn test_verified_records_never_downgraded() {
    let store = Arc::new(MemoryStore::new());
    let (engine, _ctx, _etx) = engine_over(&store);

    seed_pair(&*store, 1).await;
    seed_pair(&*store, 2).await;
    engine.canonicalize(0, BATCH_LIMIT).await.expect("first pass");

    let verified_consensus = consensus_record(&store, 1).await.expect("record");
    assert_eq!(verified_consensus.status, HashStatus::Verified);

    // New announcements above the watermark drive another pass over the
    // whole window; earlier verdicts must survive it byte for byte.
    seed_pair(&*store, 3).await;
    engine.canonicalize(2, BATCH_LIMIT).await.expect("second pass");

    assert_eq!(consensus_record(&store, 1).await.expect("record"), verified_consensus);
    assert_eq!(store.latest_verified_slot().await.expect("watermark"), 3);
}

#[tokio::test]
async fn test_pass_from_behind_watermark_is_permitted() {
    let store = Arc::new(MemoryStore::new());
    let (engine, _ctx, _etx) = engine_over(&store);

    seed_pair(&*store, 1).await;
    seed_pair(&*store, 2).await;
    engine.canonicalize(0, BATCH_LIMIT).await.expect("first pass");

    seed_pair(&*store, 3).await;

    // from_slot below the watermark extends history without touching
    // resolved slots.
    let outcome = engine.canonicalize(1, BATCH_LIMIT).await.expect("pass from slot 1");
    assert_eq!(outcome, PassOutcome::Completed { newly_verified: 1, latest_verified_slot: 3 });
}

#[tokio::test]
async fn test_pass_ahead_of_watermark_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let (engine, _ctx, _etx) = engine_over(&store);

    seed_pair(&*store, 1).await;

    let errors = engine.canonicalize(4, BATCH_LIMIT).await.expect_err("no root at slot 4");
    assert!(errors.realm_err.is_some());
    assert!(errors.consensus_err.is_none());
    assert!(errors.execution_err.is_none());

    // Nothing was written.
    assert_eq!(consensus_record(&store, 1).await.expect("record").status, HashStatus::Pending);
    assert_eq!(store.latest_verified_slot().await.expect("watermark"), 0);
}

#[tokio::test]
async fn test_mismatched_batch_lengths_bound_the_loop() {
    let store = Arc::new(MemoryStore::new());
    let (engine, _ctx, _etx) = engine_over(&store);

    // Consensus chain runs two slots ahead of the execution chain.
    for slot in 1..=4 {
        ConsensusHashStore::save(
            &*store,
            slot,
            HeaderHashRecord::pending(consensus_block(slot).hash_tree_root()),
        )
        .await
        .expect("save");
    }
    for slot in 1..=2 {
        ExecutionHashStore::save(
            &*store,
            slot,
            HeaderHashRecord::pending(execution_header(slot).hash()),
        )
        .await
        .expect("save");
    }

    let outcome = engine.canonicalize(0, BATCH_LIMIT).await.expect("pass");
    assert_eq!(outcome, PassOutcome::Completed { newly_verified: 2, latest_verified_slot: 2 });

    // Slots beyond the shorter batch are untouched, waiting for the
    // execution chain to catch up.
    for slot in [3, 4] {
        let record = consensus_record(&store, slot).await.expect("record");
        assert_eq!(record.status, HashStatus::Pending, "slot {slot} must stay pending");
    }
}

#[tokio::test]
async fn test_verified_hashes_differ_per_chain() {
    let store = Arc::new(MemoryStore::new());
    let (engine, _ctx, _etx) = engine_over(&store);

    seed_pair(&*store, 1).await;
    engine.canonicalize(0, BATCH_LIMIT).await.expect("pass");

    let consensus = consensus_record(&store, 1).await.expect("record");
    let execution = execution_record(&store, 1).await.expect("record");

    // Pairing preserves each chain's own hash; it never copies one across.
    assert_ne!(consensus.hash, execution.hash);
    assert_ne!(consensus.hash, Hash::ZERO);
}
