//! Shared existence cache for path keys
//!
//! This module answers one question cheaply and concurrently: "has
//! table X already written a row for this path?" It holds a sharded
//! map from 20-byte path digests to a packed 64-bit value carrying
//! per-table "known" flags plus a last-write timestamp, and evicts
//! stale entries in the background.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   exists/merge   ┌──────────────────────────┐
//! │ TreeUploader │ ───────────────▶ │      ExistenceCache      │
//! │  (per table) │                  │  128 RwLock'd shards of  │
//! └──────────────┘                  │  PathKey -> PackedEntry  │
//!                                   └────────────┬─────────────┘
//!                                                │ expire(ttl)
//!                                   ┌────────────▼─────────────┐
//!                                   │      EvictionWorker      │
//!                                   │  one background thread   │
//!                                   └──────────────────────────┘
//! ```

pub mod entry;
pub mod expire;
pub mod key;
pub mod map;

pub use entry::{PackedEntry, MAX_TABLES};
pub use expire::{EvictionWorker, ExpiredCounter, DEFAULT_CACHE_TTL, DEFAULT_EVICTION_INTERVAL};
pub use key::PathKey;
pub use map::{ExistenceCache, SHARD_COUNT};
