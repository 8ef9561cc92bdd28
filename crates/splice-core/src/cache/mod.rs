//! Bounded LRU cache for pending execution-chain headers.
//!
//! Headers carry mutable byte slices, so both insert and read-out deal in
//! deep copies; an external holder can never mutate cached state. The
//! cache is not authoritative storage; a miss falls back to the hash
//! store or the upstream node.

use crate::types::{ExecutionHeader, Slot};
use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use thiserror::Error;
use tracing::trace;

/// Default capacity: with ~1.5 KB headers this bounds the cache near 1.5 MB.
pub const DEFAULT_HEADER_CACHE_CAPACITY: usize = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("no header cached for slot {0}")]
    NotFound(Slot),

    #[error("cache capacity must be non-zero")]
    ZeroCapacity,
}

/// LRU of the most recently announced execution header per slot.
pub struct HeaderCache {
    cache: RwLock<LruCache<Slot, ExecutionHeader>>,
}

impl HeaderCache {
    /// Creates a cache holding at most `capacity` headers.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ZeroCapacity`] when `capacity` is zero; the
    /// capacity is an explicit construction parameter, never a process-wide
    /// global.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheError::ZeroCapacity)?;
        Ok(Self { cache: RwLock::new(LruCache::new(capacity)) })
    }

    /// Inserts or replaces the header at `slot`, storing a deep copy.
    pub fn put(&self, slot: Slot, header: &ExecutionHeader) {
        trace!(slot, hash = ?header.hash(), "caching execution header");
        self.cache.write().put(slot, header.clone());
    }

    /// Returns a deep copy of the header at `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] when the slot is absent (including
    /// after LRU eviction).
    pub fn get(&self, slot: Slot) -> Result<ExecutionHeader, CacheError> {
        // `get` promotes the entry, so the write half of the lock is needed.
        self.cache.write().get(&slot).cloned().ok_or(CacheError::NotFound(slot))
    }

    /// Number of headers currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}
