//! Tree decomposition with batch-scoped deduplication
//!
//! For each input path the decomposer emits the leaf row plus one row
//! per ancestor prefix, unless the row is already known:
//! - the leaf is checked against the shared existence cache (scoped by
//!   table id) and against this batch's working set;
//! - ancestors are checked against the working set only - the store's
//!   versioned merge converges repeated ancestor writes across
//!   batches, and leaves dominate cardinality, so cross-batch dedup is
//!   spent where it pays.
//!
//! A leaf already known skips the whole record: its ancestor chain was
//! necessarily written when the leaf first appeared. Likewise, an
//! ancestor already in the working set stops the upward walk - every
//! higher ancestor was emitted alongside it.

use crate::cache::{ExistenceCache, PathKey};
use crate::error::{Result, UploadError};
use crate::tree::encode::RowEncoder;
use crate::tree::reader::RecordSource;
use std::collections::HashSet;
use std::io::Write;

/// Reserved for tagged-series paths, which are handled by a different
/// uploader. Records containing it are skipped here.
pub const TAG_DELIMITER: u8 = b'?';

/// Hierarchy segment separator.
pub const PATH_SEPARATOR: u8 = b'.';

/// Number of dot-delimited segments; a path with no separator is
/// level 1. Only called for leaves - ancestor levels are derived by
/// counting down from the leaf's.
pub fn path_level(path: &[u8]) -> u32 {
    1 + path.iter().filter(|&&b| b == PATH_SEPARATOR).count() as u32
}

/// Outcome of decomposing one batch.
#[derive(Debug)]
pub struct Decomposition {
    /// Keys newly accepted in this batch, to be merged into the
    /// existence cache once the store write is confirmed.
    pub new_keys: HashSet<PathKey>,

    /// Rows written to the encoder (leaves + ancestors).
    pub rows_emitted: u64,

    /// Records consumed from the source.
    pub records_read: u64,

    /// Records skipped (tagged, or leaf already known).
    pub records_skipped: u64,
}

/// Walks a batch of path records and emits the surviving rows.
pub struct TreeDecomposer<'a> {
    cache: &'a ExistenceCache,
    table_id: u8,
}

impl<'a> TreeDecomposer<'a> {
    pub fn new(cache: &'a ExistenceCache, table_id: u8) -> Self {
        Self { cache, table_id }
    }

    /// Consume the source to its end, writing rows into `encoder`.
    ///
    /// Any read or encode failure is terminal for the batch; the
    /// working set accumulated so far must not be committed.
    pub fn decompose<W: Write>(
        &self,
        source: &mut dyn RecordSource,
        encoder: &mut RowEncoder<W>,
    ) -> Result<Decomposition> {
        let mut new_keys: HashSet<PathKey> = HashSet::new();
        let mut rows_emitted = 0u64;
        let mut records_read = 0u64;
        let mut records_skipped = 0u64;

        while let Some(path) = source.next_record()? {
            records_read += 1;

            if path.contains(&TAG_DELIMITER) {
                records_skipped += 1;
                continue;
            }

            let leaf = PathKey::of(path);
            if self.cache.exists(&leaf, self.table_id) || new_keys.contains(&leaf) {
                records_skipped += 1;
                continue;
            }
            new_keys.insert(leaf);

            let mut level = path_level(path);
            encoder
                .write_row(level, path)
                .map_err(UploadError::Encode)?;
            rows_emitted += 1;

            // Walk from the leaf's parent upward. `prefix` always
            // includes the trailing separator.
            let mut rest = path;
            while level > 1 {
                level -= 1;
                let index = match rest.iter().rposition(|&b| b == PATH_SEPARATOR) {
                    Some(index) => index,
                    None => break,
                };
                let prefix = &rest[..=index];

                let key = PathKey::of(prefix);
                if new_keys.contains(&key) {
                    // This ancestor was already emitted in this batch,
                    // so every higher one was too.
                    break;
                }
                new_keys.insert(key);

                encoder
                    .write_row(level, prefix)
                    .map_err(UploadError::Encode)?;
                rows_emitted += 1;

                rest = &rest[..index];
            }
        }

        Ok(Decomposition {
            new_keys,
            rows_emitted,
            records_read,
            records_skipped,
        })
    }
}
