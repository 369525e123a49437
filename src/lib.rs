//! tree-uploader - Deduplicating Tree Uploader for Metric Paths
//!
//! The deduplication layer of a metrics-ingestion pipeline that writes
//! hierarchical path data into a columnar store. Incoming batches
//! contain dotted metric paths (`a.b.c`); each path implies a chain of
//! ancestor prefixes (`a.`, `a.b.`) that must also exist as rows.
//! Writing every path and ancestor on every batch would multiply write
//! volume by the average path depth, so this crate decides, per
//! observed path, whether it is already known and streams only the
//! novel rows.
//!
//! # Features
//!
//! - **Sharded Existence Cache**: 128 independently locked shards map
//!   20-byte path digests to a packed per-table flag set plus a
//!   last-write timestamp, keeping contention low under many
//!   concurrent uploads.
//!
//! - **Background Eviction**: A single worker per process scans the
//!   cache on an interval and drops entries past their TTL, bounding
//!   memory over the process lifetime.
//!
//! - **Tree Decomposition**: Each path expands into its ancestor
//!   chain; the cache and a per-batch working set drop everything
//!   already emitted.
//!
//! - **Streaming Uploads**: Decomposition and the store insert run
//!   concurrently, connected by a bounded byte pipe, so a large batch
//!   never has to be buffered in full.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  records   ┌──────────────────┐  RowBinary  ┌──────────────┐
//! │  row file   │ ─────────▶ │  TreeDecomposer  │ ──────────▶ │ bounded pipe │
//! │  (reader)   │            │  + RowEncoder    │             └──────┬───────┘
//! └─────────────┘            └────────┬─────────┘                    │
//!                                     │ working set                  ▼
//!                            ┌────────▼─────────┐           ┌──────────────┐
//!                            │  ExistenceCache  │ ◀──commit─│ StoreClient  │
//!                            │  (128 shards)    │  on success│ (writer     │
//!                            └────────▲─────────┘           │  thread)     │
//!                                     │ expire(ttl)         └──────────────┘
//!                            ┌────────┴─────────┐
//!                            │  EvictionWorker  │
//!                            └──────────────────┘
//! ```
//!
//! The cache is credited only after the store confirms the write, so a
//! failed or aborted batch is always safe to retry: the same rows are
//! simply re-emitted with a fresh version, which the store's versioned
//! merge collapses.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tree_uploader::config::UploadConfig;
//! use tree_uploader::shutdown::CancelToken;
//! use tree_uploader::tree::reader::VecSource;
//! use tree_uploader::upload::{FileStore, TreeUploader, UploadContext};
//!
//! let context = UploadContext::new();
//! let store = Arc::new(FileStore::new("tree.rowbinary".as_ref()));
//! let uploader = TreeUploader::new(&context, &UploadConfig::default(), store)?;
//!
//! let mut batch = VecSource::new([b"servers.web1.cpu".to_vec()]);
//! let outcome = uploader.upload(&mut batch, &CancelToken::never())?;
//! assert_eq!(outcome.rows_emitted, 3);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod shutdown;
pub mod tree;
pub mod upload;
