//! Integration and end-to-end tests for the Splice orchestrator.
//!
//! Test modules:
//!
//! - `canonicalization_tests`: Batch-pass scenarios driven directly
//!   against the engine: clean pairs, one-sided skips, true skips,
//!   mid-pass storage failures, watermark stability.
//! - `invariant_tests`: Property tests over randomized ingestion
//!   histories: pairing, monotonicity, no-pending-behind-watermark,
//!   idempotent replay.
//! - `end_to_end_tests`: Full pipeline through the `Orchestrator`:
//!   ingestion hooks, merge, debounce, triggered passes, shutdown.
//! - `mock_infrastructure`: Reusable fault-injecting store wrapper and
//!   fixture builders.
//!
//! Run with `cargo test --package tests`. Everything here is
//! self-contained; no external nodes are required.

#[cfg(test)]
mod canonicalization_tests;



/// Mock infrastructure for testing
pub mod mock_infrastructure;
