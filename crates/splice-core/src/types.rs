//! Core domain types shared across the orchestrator.
//!
//! Both chains index candidate blocks by a common monotonically increasing
//! slot number. The orchestrator records one [`HeaderHashRecord`] per chain
//! per slot and upgrades it from [`HashStatus::Pending`] to a terminal
//! status during canonicalization.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Integer time-index shared by both chains. Slot 0 is the genesis/unset
/// sentinel.
pub type Slot = u64;

/// Epoch index; a fixed number of contiguous slots.
pub type Epoch = u64;

/// Opaque 32-byte digest. Compared byte-for-byte only.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// The all-zero hash. Carried by `Skipped` records that have no block
    /// on either chain.
    pub const ZERO: Hash = Hash([0u8; 32]);

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps structured log fields readable.
        write!(f, "0x{:02x}{:02x}..{:02x}{:02x}", self.0[0], self.0[1], self.0[30], self.0[31])
    }
}

/// Per-slot verdict for one chain's record.
///
/// Records are created `Pending` on ingestion and move to exactly one
/// terminal status during a canonicalization pass. `Invalid` is reserved
/// for slashing-grade evidence and is never assigned by the engine today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum HashStatus {
    Pending = 0,
    Verified = 1,
    Skipped = 2,
    Invalid = 3,
}

impl HashStatus {
    /// Wire discriminant used by the record codec.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses a wire discriminant back into a status.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Pending),
            1 => Some(Self::Verified),
            2 => Some(Self::Skipped),
            3 => Some(Self::Invalid),
            _ => None,
        }
    }

    /// Terminal statuses are never rewritten by anyone.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Skipped | Self::Invalid)
    }
}

impl fmt::Display for HashStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Skipped => "skipped",
            Self::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

/// One chain's record at one slot: the announced hash plus the current
/// verdict. `Verified` records always carry a non-empty hash; `Skipped`
/// records may carry [`Hash::ZERO`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderHashRecord {
    pub hash: Hash,
    pub status: HashStatus,
}

impl HeaderHashRecord {
    #[must_use]
    pub fn pending(hash: Hash) -> Self {
        Self { hash, status: HashStatus::Pending }
    }

    #[must_use]
    pub fn verified(hash: Hash) -> Self {
        Self { hash, status: HashStatus::Verified }
    }

    /// The record written for slots neither chain produced.
    #[must_use]
    pub fn skipped() -> Self {
        Self { hash: Hash::ZERO, status: HashStatus::Skipped }
    }
}

/// A candidate pairing awaiting a verdict: the slot plus whatever each
/// chain announced for it.
#[derive(Debug, Clone, Default)]
pub struct RealmPair {
    pub slot: Slot,
    pub consensus_hash: Option<Hash>,
    pub execution_hashes: Vec<Hash>,
}

impl RealmPair {
    /// A pair with no block on either side, a possible true skip.
    #[must_use]
    pub fn unresolved(slot: Slot) -> Self {
        Self { slot, consensus_hash: None, execution_hashes: Vec::new() }
    }
}

/// Epoch-level consensus metadata published to subscribers.
///
/// Epochs are monotonically non-decreasing across stored entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusInfo {
    pub epoch: Epoch,
    pub validator_list: Vec<String>,
    /// Unix timestamp (seconds) of the first slot in the epoch.
    pub epoch_start_time: u64,
    pub slot_time_sec: u64,
}

/// A pending block announced by the consensus chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusBlock {
    pub slot: Slot,
    pub proposer_index: u64,
    pub parent_root: Hash,
    pub state_root: Hash,
    pub body_root: Hash,
}

impl ConsensusBlock {
    /// Digest of the block's fixed-width field encoding. Stands in for the
    /// consensus client's tree-root computation; stability across calls is
    /// the only property the pairing engine relies on.
    #[must_use]
    pub fn hash_tree_root(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.slot.to_be_bytes());
        hasher.update(self.proposer_index.to_be_bytes());
        hasher.update(self.parent_root.as_bytes());
        hasher.update(self.state_root.as_bytes());
        hasher.update(self.body_root.as_bytes());
        Hash(hasher.finalize().into())
    }
}

/// A full execution-chain header. Cached per slot so verification does not
/// refetch from the upstream node.
///
/// `Clone` produces a deep copy: `extra_data` is owned, so clones never
/// share mutable bytes with the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionHeader {
    pub slot: Slot,
    pub number: u64,
    pub parent_hash: Hash,
    pub state_root: Hash,
    pub timestamp: u64,
    pub extra_data: Vec<u8>,
}

impl ExecutionHeader {
    /// Digest of the header's field encoding.
    #[must_use]
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.slot.to_be_bytes());
        hasher.update(self.number.to_be_bytes());
        hasher.update(self.parent_hash.as_bytes());
        hasher.update(self.state_root.as_bytes());
        hasher.update(self.timestamp.to_be_bytes());
        hasher.update(&self.extra_data);
        Hash(hasher.finalize().into())
    }
}

/// Per-chain announcement event: the slot and the hash the chain produced
/// for it. This is what flows through the merger into the engine and out
/// on the header-info feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderInfo {
    pub slot: Slot,
    pub hash: Hash,
}
