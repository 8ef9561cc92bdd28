//! # Splice Core
//!
//! Core library for Splice, the orchestrator bridging a consensus-chain
//! node and an execution-chain node in a hybrid proof-of-stake network.
//! Each chain independently produces candidate blocks indexed by a shared
//! slot number; a slot is canonical only when both chains produced
//! mutually consistent blocks for it. Splice pairs the two streams of
//! announcements, assigns every slot a verdict, and surfaces consensus
//! metadata to downstream subscribers.
//!
//! This crate provides:
//!
//! - **[`engine`]**: The pairing and canonicalization state machine that
//!   classifies slots as verified, skipped, or still pending and advances
//!   the latest-verified watermark.
//!
//! - **[`store`]**: Narrow storage capabilities for the per-chain hash
//!   records and the realm watermark, plus the embedded in-memory backend.
//!
//! - **[`cache`]**: Bounded LRU for pending execution headers so
//!   verification does not refetch from the upstream node.
//!
//! - **[`pipeline`]**: Fan-in merging and debouncing of the two
//!   announcement streams.
//!
//! - **[`feed`]**: In-process publish/subscribe feeds consumed by the RPC
//!   layer.
//!
//! - **[`ingest`]**: The hooks the chain-client adapters call on every
//!   announcement.
//!
//! - **[`runtime`]**: Component wiring and graceful shutdown.
//!
//! ## Data Flow
//!
//! ```text
//! consensus adapter ──► on_new_pending_consensus_block ─┐
//!                                                       ├─► stores (Pending)
//! execution adapter ──► on_new_pending_execution_header ┘      + feeds
//!                │                                             │
//!                └── HeaderCache (full headers, LRU)           ▼
//!                                                       ┌────────────┐
//!                                                       │   merge    │
//!                                                       └─────┬──────┘
//!                                                             ▼
//!                                                       ┌────────────┐
//!                                                       │  debounce  │
//!                                                       └─────┬──────┘
//!                                                             ▼
//!                                              ┌──────────────────────────┐
//!                                              │  CanonicalizationService │
//!                                              │  verify / skip / pend    │
//!                                              └────────────┬─────────────┘
//!                                                           ▼
//!                                            stores (Verified / Skipped)
//!                                              + realm watermark advance
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod feed;
pub mod ingest;
pub mod pipeline;
pub mod runtime;
pub mod store;
pub mod types;
