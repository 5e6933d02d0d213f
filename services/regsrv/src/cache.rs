//! Per-endpoint register cache
//!
//! Holds the resolved register set of one physical endpoint, keyed by the
//! explicit `(port, slave_address)` tuple. The store stays authoritative:
//! an entry is only ever dropped or replaced, never edited in place.
//!
//! ## Load/invalidate race
//! A reader that misses records the cache epoch before reading the store and
//! passes it to [`RegisterCache::insert_if_current`]. Any invalidation in
//! between bumps the epoch and the stale load is discarded.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::models::Register;

/// `(port, slave_address)`
pub type EndpointKey = (u16, u8);

#[derive(Debug, Clone)]
struct CachedEntry {
    registers: Arc<Vec<Register>>,
    loaded_at: Instant,
}

#[derive(Debug)]
pub struct RegisterCache {
    entries: DashMap<EndpointKey, CachedEntry>,
    /// `None` keeps entries until invalidated
    ttl: Option<Duration>,
    enabled: bool,
    epoch: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl RegisterCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            enabled: true,
            epoch: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// A cache that never stores anything; every read goes to the store
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(None)
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current epoch; take it before loading from the store
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub fn get(&self, port: u16, slave_address: u8) -> Option<Arc<Vec<Register>>> {
        let key = (port, slave_address);
        let hit = self.entries.get(&key).and_then(|entry| {
            if self.is_expired(&entry) {
                None
            } else {
                Some(Arc::clone(&entry.registers))
            }
        });

        match hit {
            Some(registers) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(registers)
            },
            None => {
                // Expired entries are dropped on read
                self.entries
                    .remove_if(&key, |_, entry| self.is_expired(entry));
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            },
        }
    }

    /// Store a loaded register set unless an invalidation happened since `epoch`
    ///
    /// Returns the shared snapshot either way so the caller can serve it.
    pub fn insert_if_current(
        &self,
        port: u16,
        slave_address: u8,
        registers: Vec<Register>,
        epoch: u64,
    ) -> Arc<Vec<Register>> {
        let registers = Arc::new(registers);
        if !self.enabled {
            return registers;
        }

        // Hold the shard lock while comparing so an invalidation cannot slip
        // between the epoch check and the insert
        let slot = self.entries.entry((port, slave_address));
        if self.epoch() == epoch {
            slot.insert(CachedEntry {
                registers: Arc::clone(&registers),
                loaded_at: Instant::now(),
            });
        } else {
            debug!(
                "Discarding stale register load for ({}, {})",
                port, slave_address
            );
        }
        registers
    }

    /// Remove the entry for one endpoint; a miss is not an error
    pub fn invalidate(&self, port: u16, slave_address: u8) -> bool {
        // Bump first so a concurrent loader that already read the store
        // cannot re-insert what we are about to remove
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        let removed = self.entries.remove(&(port, slave_address)).is_some();
        debug!(
            "Cache invalidate ({}, {}): {}",
            port,
            slave_address,
            if removed { "removed" } else { "absent" }
        );
        removed
    }

    pub fn contains(&self, port: u16, slave_address: u8) -> bool {
        self.entries.contains_key(&(port, slave_address))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> RegisterCacheStats {
        RegisterCacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    fn is_expired(&self, entry: &CachedEntry) -> bool {
        self.ttl
            .is_some_and(|ttl| entry.loaded_at.elapsed() >= ttl)
    }
}

impl Default for RegisterCache {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Register cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}
