//! Sharded concurrent existence map
//!
//! The cache is split into a fixed number of independently locked
//! shards to avoid lock bottlenecks under many concurrent uploads.
//! A shard is selected by hashing the key; operations lock exactly
//! one shard for the duration of a single map operation, never more,
//! so concurrent callers can only contend on a single shard's lock
//! and can never deadlock.
//!
//! The cache also owns the process's relative time base: an `Instant`
//! captured at construction. All stored timestamps are whole seconds
//! since that base, which keeps them in 32 bits.

use crate::cache::entry::PackedEntry;
use crate::cache::key::PathKey;
use crate::shutdown::CancelToken;
use gxhash::GxHasher;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::hash::Hasher;
use std::time::Instant;

/// Number of independently locked partitions.
pub const SHARD_COUNT: usize = 128;

struct Shard {
    items: RwLock<HashMap<PathKey, PackedEntry>>,
}

/// Concurrent map from path digest to packed existence entry.
///
/// One instance is shared by every table writer in the process; all
/// existence checks and commits are scoped by table id.
pub struct ExistenceCache {
    shards: Vec<Shard>,
    start: Instant,
}

impl ExistenceCache {
    /// Create an empty cache and capture the relative time base.
    pub fn new() -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| Shard {
                items: RwLock::new(HashMap::new()),
            })
            .collect();
        Self {
            shards,
            start: Instant::now(),
        }
    }

    /// Seconds elapsed since the relative time base.
    pub fn now_rel(&self) -> u32 {
        self.start.elapsed().as_secs() as u32
    }

    fn shard(&self, key: &PathKey) -> &Shard {
        // Fixed-seed gxhash over the digest bytes; only shard routing
        // depends on it, so the seed never needs to vary.
        let mut hasher = GxHasher::with_seed(0);
        hasher.write(key.as_bytes());
        &self.shards[hasher.finish() as usize % SHARD_COUNT]
    }

    /// True iff an entry exists for `key` with the flag bit for
    /// `table_id` set. An absent key is false for every table id.
    /// The timestamp is not consulted.
    pub fn exists(&self, key: &PathKey, table_id: u8) -> bool {
        let shard = self.shard(key);
        let items = shard.items.read();
        items
            .get(key)
            .copied()
            .unwrap_or(PackedEntry::EMPTY)
            .has_table(table_id)
    }

    /// Fetch the raw packed entry, if present.
    pub fn get(&self, key: &PathKey) -> Option<PackedEntry> {
        let shard = self.shard(key);
        let items = shard.items.read();
        items.get(key).copied()
    }

    /// Insert or update: OR in `table_id`'s flag and overwrite the
    /// timestamp. Only the owning shard is touched.
    pub fn set(&self, key: PathKey, table_id: u8, timestamp: u32) {
        let shard = self.shard(&key);
        let mut items = shard.items.write();
        let prior = items.get(&key).copied().unwrap_or(PackedEntry::EMPTY);
        items.insert(key, prior.with_table(table_id, timestamp));
    }

    /// Commit a batch's working set: `set` for every key, one table
    /// id, one timestamp (the batch's start time). Not atomic across
    /// keys - concurrent readers may observe a partially merged batch.
    pub fn merge(&self, table_id: u8, keys: &HashSet<PathKey>, timestamp: u32) {
        for key in keys {
            self.set(*key, table_id, timestamp);
        }
    }

    /// Live entry count summed across shards. Eventually consistent;
    /// observability only.
    pub fn count(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.items.read().len())
            .sum()
    }

    /// Empty all shards. Used on a full reset of a table's view
    /// (reconnect/resync), not on the normal upload path.
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.items.write().clear();
        }
    }

    /// Delete every entry whose last-write timestamp is older than
    /// `now - ttl_secs`. Checks the cancellation token between shards;
    /// a partial scan is safe, shards not yet visited are simply
    /// evicted on the next pass. Returns the number removed.
    pub fn expire(&self, ttl_secs: u32, cancel: &CancelToken) -> usize {
        let deadline = self.now_rel().saturating_sub(ttl_secs);
        self.expire_older_than(deadline, cancel)
    }

    fn expire_older_than(&self, deadline: u32, cancel: &CancelToken) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            if cancel.is_canceled() {
                return removed;
            }
            let mut items = shard.items.write();
            let before = items.len();
            items.retain(|_, entry| entry.timestamp() >= deadline);
            removed += before - items.len();
        }
        removed
    }
}

impl Default for ExistenceCache {
    fn default() -> Self {
        Self::new()
    }
}
