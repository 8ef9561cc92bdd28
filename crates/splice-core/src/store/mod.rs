//! Per-chain hash stores and the realm watermark store.
//!
//! The orchestrator persists three logical keyspaces:
//!
//! - `consensus-hash/<slot:u64-be>`: one [`HeaderHashRecord`] per slot
//! - `execution-hash/<slot:u64-be>`: one [`HeaderHashRecord`] per slot
//! - `realm/latest-verified-slot`: a single `u64-be` watermark
//!
//! The storage engine itself is an external collaborator; this module
//! defines the capability contracts plus the record wire codec any backend
//! must honor, and ships an embedded in-memory backend.
//!
//! The capabilities are deliberately narrow and separate. One concrete
//! backend usually satisfies all of them, but the single-writer discipline
//! in the engine depends on call sites only seeing the capability they
//! need; do not merge these into one wide store trait.

mod memory;

pub use memory::MemoryStore;

use crate::types::{ConsensusInfo, Epoch, HeaderHashRecord, Slot};
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by store backends. The engine treats every variant as
/// fatal to the in-flight canonicalization pass.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("malformed record at slot {slot}: {reason}")]
    Corrupted { slot: Slot, reason: String },
}

/// Records announced by the consensus chain, keyed by slot.
#[async_trait]
pub trait ConsensusHashStore: Send + Sync {
    /// Upserts the record at `slot`, overwriting any prior record.
    async fn save(&self, slot: Slot, record: HeaderHashRecord) -> Result<(), StoreError>;

    /// Exact lookup.
    async fn get(&self, slot: Slot) -> Result<Option<HeaderHashRecord>, StoreError>;

    /// Dense read of `[from_slot, from_slot + limit)`.
    ///
    /// Returns exactly `limit` positions (fewer only when the window runs
    /// off the end of the slot space); position `i` corresponds to
    /// `from_slot + i` and missing slots hold `None`, at the tail
    /// included. The engine aligns the two chains' batches by index and
    /// its gap fill relies on tail holes being present.
    async fn range(
        &self,
        from_slot: Slot,
        limit: u64,
    ) -> Result<Vec<Option<HeaderHashRecord>>, StoreError>;
}

/// Records announced by the execution chain, keyed by slot. Same contract
/// as [`ConsensusHashStore`] over a separate keyspace.
#[async_trait]
pub trait ExecutionHashStore: Send + Sync {
    async fn save(&self, slot: Slot, record: HeaderHashRecord) -> Result<(), StoreError>;

    async fn get(&self, slot: Slot) -> Result<Option<HeaderHashRecord>, StoreError>;

    /// Dense read of `[from_slot, from_slot + limit)`; see
    /// [`ConsensusHashStore::range`] for the exact shape.
    async fn range(
        &self,
        from_slot: Slot,
        limit: u64,
    ) -> Result<Vec<Option<HeaderHashRecord>>, StoreError>;
}

/// The single authoritative watermark: the highest slot at which both
/// chains have been paired and verified.
///
/// The canonicalization engine is the only writer. It never asks for a
/// regression; backends may additionally enforce monotonicity themselves.
#[async_trait]
pub trait RealmStore: Send + Sync {
    async fn latest_verified_slot(&self) -> Result<Slot, StoreError>;

    async fn save_latest_verified_slot(&self, slot: Slot) -> Result<(), StoreError>;
}

/// Epoch-level consensus metadata, keyed by epoch. Written on ingestion,
/// replayed to late subscribers by the RPC layer.
#[async_trait]
pub trait ConsensusInfoStore: Send + Sync {
    async fn save_consensus_info(&self, info: &ConsensusInfo) -> Result<(), StoreError>;

    /// All stored infos with `epoch >= from_epoch`, ascending.
    async fn consensus_infos(&self, from_epoch: Epoch) -> Result<Vec<ConsensusInfo>, StoreError>;
}

/// Encoded size of a [`HeaderHashRecord`]: 1-byte length prefix, 32 hash
/// bytes, 1 status byte.
pub const RECORD_ENCODED_LEN: usize = 34;

const RECORD_BODY_LEN: u8 = 33;

/// Encodes a record into the length-prefixed wire form
/// `{len:u8}{hash:32}{status:u8}` shared by every persistent backend.
#[must_use]
pub fn encode_record(record: &HeaderHashRecord) -> [u8; RECORD_ENCODED_LEN] {
    let mut buf = [0u8; RECORD_ENCODED_LEN];
    buf[0] = RECORD_BODY_LEN;
    buf[1..33].copy_from_slice(record.hash.as_bytes());
    buf[33] = record.status.as_u8();
    buf
}

/// Decodes the wire form produced by [`encode_record`].
///
/// # Errors
///
/// Returns [`StoreError::Corrupted`] on a bad length prefix, truncated
/// buffer, or unknown status discriminant.
pub fn decode_record(slot: Slot, bytes: &[u8]) -> Result<HeaderHashRecord, StoreError> {
    if bytes.len() != RECORD_ENCODED_LEN || bytes[0] != RECORD_BODY_LEN {
        return Err(StoreError::Corrupted {
            slot,
            reason: format!("expected {RECORD_ENCODED_LEN} bytes, got {}", bytes.len()),
        });
    }

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes[1..33]);

    let status = crate::types::HashStatus::from_u8(bytes[33]).ok_or_else(|| {
        StoreError::Corrupted { slot, reason: format!("unknown status discriminant {}", bytes[33]) }
    })?;

    Ok(HeaderHashRecord { hash: crate::types::Hash(hash), status })
}
