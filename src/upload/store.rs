//! Store client interface
//!
//! The network client that performs the actual insert is an external
//! collaborator; this module only fixes its interface: stream a
//! RowBinary insert body into a named query target. The query target
//! carries the table name plus the column list for its variant.
//!
//! `FileStore` is the shipped implementation for the dry-run CLI and
//! tests: it appends the insert body to a local file.

use crate::error::StoreResult;
use crate::tree::encode::TableVariant;
use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Query target for an insert, e.g.
/// `graphite_tree (Level, Path, Version)`.
pub fn insert_target(table_name: &str, variant: TableVariant) -> String {
    format!("{} {}", table_name, variant.columns())
}

/// Performs the store insert by reading the body stream to EOF.
///
/// Implementations must consume the reader until it signals EOF or
/// fails; returning early while the producer is still writing would
/// deadlock the upload.
pub trait StoreClient: Send + Sync {
    fn insert_row_binary(&self, target: &str, body: &mut dyn Read) -> StoreResult<()>;
}

/// Appends insert bodies to a local file. Dry-run / debugging sink.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StoreClient for FileStore {
    fn insert_row_binary(&self, target: &str, body: &mut dyn Read) -> StoreResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let bytes = io::copy(body, &mut file)?;
        file.flush()?;

        debug!(target_query = target, bytes, path = %self.path.display(), "insert body written");
        Ok(())
    }
}
