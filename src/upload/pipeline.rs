//! Upload orchestration and the shared process context
//!
//! `UploadContext` is the explicitly constructed process singleton:
//! one existence cache, one table-id allocator, one expired counter.
//! The bootstrap creates it once and injects it into each table
//! uploader; tests construct isolated contexts.
//!
//! `TreeUploader::upload` runs one batch: decomposition on the calling
//! thread feeding the pipe, the store insert on a writer thread
//! draining it, and the controller waiting on whichever of
//! {writer result, cancellation} comes first. The existence cache is
//! credited only after the store confirms the write, so a failed or
//! aborted batch is always safe to retry (at-least-once semantics).

use crate::cache::{EvictionWorker, ExistenceCache, ExpiredCounter, MAX_TABLES};
use crate::config::UploadConfig;
use crate::error::{ConfigError, ConfigResult, Result, UploadError};
use crate::shutdown::CancelToken;
use crate::tree::decompose::TreeDecomposer;
use crate::tree::encode::{RowEncoder, TableVariant};
use crate::tree::reader::RecordSource;
use crate::upload::pipe::pipe;
use crate::upload::store::{insert_target, StoreClient};
use crossbeam_channel::{bounded, select};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Process-wide shared state for all table uploaders.
pub struct UploadContext {
    cache: Arc<ExistenceCache>,
    expired: Arc<ExpiredCounter>,
    next_table_id: AtomicUsize,
}

impl UploadContext {
    /// Create a fresh context; the cache's relative time base starts
    /// now.
    pub fn new() -> Self {
        Self {
            cache: Arc::new(ExistenceCache::new()),
            expired: Arc::new(ExpiredCounter::new()),
            next_table_id: AtomicUsize::new(0),
        }
    }

    /// The shared existence cache.
    pub fn cache(&self) -> &Arc<ExistenceCache> {
        &self.cache
    }

    /// Read and reset the count of entries removed by eviction since
    /// the last read.
    pub fn take_expired(&self) -> u64 {
        self.expired.take()
    }

    /// Allocate the next table id. Ids are assigned sequentially and
    /// never reclaimed; allocation past the packed-flag width is a
    /// configuration error.
    pub fn allocate_table_id(&self) -> ConfigResult<u8> {
        let id = self.next_table_id.fetch_add(1, Ordering::SeqCst);
        if id >= MAX_TABLES {
            return Err(ConfigError::TableIdsExhausted { max: MAX_TABLES });
        }
        Ok(id as u8)
    }

    /// Start the per-process eviction worker against the shared cache.
    pub fn start_eviction(
        &self,
        ttl: Duration,
        interval: Duration,
        cancel: CancelToken,
    ) -> io::Result<EvictionWorker> {
        EvictionWorker::spawn(
            Arc::clone(&self.cache),
            ttl,
            interval,
            Arc::clone(&self.expired),
            cancel,
        )
    }
}

impl Default for UploadContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of one committed batch.
#[derive(Debug)]
pub struct UploadOutcome {
    /// Rows streamed to the store (leaves + ancestors).
    pub rows_emitted: u64,

    /// Records consumed from the source.
    pub records_read: u64,

    /// Records skipped (tagged or already known).
    pub records_skipped: u64,

    /// Keys newly credited to the existence cache.
    pub new_keys: usize,

    /// Wall time for the whole batch.
    pub duration: Duration,
}

/// One table writer: owns a table id, a query target, and a reference
/// to the shared context.
pub struct TreeUploader<S: StoreClient> {
    table_id: u8,
    query_target: String,
    variant: TableVariant,
    pipe_buffer: usize,
    cache: Arc<ExistenceCache>,
    store: Arc<S>,
}

impl<S: StoreClient + 'static> TreeUploader<S> {
    /// Construct a table uploader, allocating its id from the context.
    pub fn new(
        context: &UploadContext,
        config: &UploadConfig,
        store: Arc<S>,
    ) -> ConfigResult<Self> {
        let table_id = context.allocate_table_id()?;
        Ok(Self {
            table_id,
            query_target: insert_target(&config.table_name, config.variant),
            variant: config.variant,
            pipe_buffer: config.pipe_buffer,
            cache: Arc::clone(&context.cache),
            store,
        })
    }

    /// This uploader's table id (also its flag bit in the cache).
    pub fn table_id(&self) -> u8 {
        self.table_id
    }

    /// Upload one batch: decompose, stream, and on confirmed success
    /// commit the batch's working set to the cache.
    pub fn upload(
        &self,
        source: &mut dyn RecordSource,
        cancel: &CancelToken,
    ) -> Result<UploadOutcome> {
        let started = Instant::now();
        let start_time = self.cache.now_rel();
        let version = unix_seconds();

        let (pipe_writer, pipe_reader) = pipe(self.pipe_buffer);
        let (result_sender, result_receiver) = bounded(1);

        // Consumer: stream the pipe into the store. Detached on
        // purpose - once the pipe is closed it always terminates, and
        // the capacity-1 channel means its final send never blocks.
        let store = Arc::clone(&self.store);
        let target = self.query_target.clone();
        thread::Builder::new()
            .name("store-writer".into())
            .spawn(move || {
                let mut reader = pipe_reader;
                let result = store.insert_row_binary(&target, &mut reader);
                if let Err(ref e) = result {
                    let message = e.to_string();
                    reader.close_with_error(message);
                }
                let _ = result_sender.send(result);
            })
            .map_err(UploadError::SpawnFailed)?;

        // Producer: decompose on the calling thread.
        let decomposer = TreeDecomposer::new(&self.cache, self.table_id);
        let mut encoder = RowEncoder::new(pipe_writer, self.variant, version);
        let parse_result = decomposer.decompose(source, &mut encoder);

        // Close the pipe whatever happened, carrying the failure to
        // the writer side so it aborts instead of blocking.
        let parse_result = match parse_result {
            Ok(decomposition) => match encoder.into_inner().close() {
                Ok(()) => Ok(decomposition),
                Err(e) => Err(UploadError::Encode(e)),
            },
            Err(e) => {
                encoder.into_inner().close_with_error(e.to_string());
                Err(e)
            }
        };

        // Controller: first of {writer result, cancellation}.
        let store_result = select! {
            recv(result_receiver) -> msg => match msg {
                Ok(result) => result,
                Err(_) => return Err(UploadError::WriterPanicked),
            },
            recv(cancel.channel()) -> _ => {
                warn!(target_query = %self.query_target, "upload aborted");
                return Err(UploadError::Aborted);
            }
        };

        if let Err(e) = store_result {
            warn!(target_query = %self.query_target, error = %e, "store insert failed");
            // A failing writer closes the reader half under the
            // producer; a broken-pipe encode error on the parse side
            // is then the same failure seen from the other end, and
            // the store error is the one to surface.
            return match parse_result {
                Err(parse_err) if !is_broken_pipe(&parse_err) => Err(parse_err),
                _ => Err(UploadError::Store(e)),
            };
        }
        let decomposition = parse_result?;

        // Commit only after the confirmed store write, stamped with
        // the batch's start time.
        self.cache
            .merge(self.table_id, &decomposition.new_keys, start_time);

        let outcome = UploadOutcome {
            rows_emitted: decomposition.rows_emitted,
            records_read: decomposition.records_read,
            records_skipped: decomposition.records_skipped,
            new_keys: decomposition.new_keys.len(),
            duration: started.elapsed(),
        };

        info!(
            target_query = %self.query_target,
            table_id = self.table_id,
            rows = outcome.rows_emitted,
            records = outcome.records_read,
            skipped = outcome.records_skipped,
            new_keys = outcome.new_keys,
            duration_ms = outcome.duration.as_millis() as u64,
            "batch committed"
        );

        Ok(outcome)
    }

    /// Full reset of the cached view (reconnect/resync path). Clears
    /// the shared cache for every table.
    pub fn reset(&self) {
        self.cache.clear();
    }
}

fn is_broken_pipe(err: &UploadError) -> bool {
    matches!(err, UploadError::Encode(e) if e.kind() == io::ErrorKind::BrokenPipe)
}

fn unix_seconds() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
