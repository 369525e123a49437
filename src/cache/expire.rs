//! Background eviction of stale cache entries
//!
//! One eviction worker runs per process, regardless of how many table
//! writers share the cache. On a fixed interval it scans every shard
//! and removes entries whose last-write timestamp is older than the
//! configured TTL, adding the removed count to a shared counter.
//!
//! The worker is bound to the process-wide cancellation token and
//! terminates promptly, including mid-scan (the scan itself checks the
//! token between shards).

use crate::cache::map::ExistenceCache;
use crate::shutdown::CancelToken;
use crossbeam_channel::{after, select};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default entry time-to-live.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Default delay between eviction passes.
pub const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// Counter of entries removed by eviction, with consume-and-reset
/// read semantics: `take` returns the count accumulated since the
/// last `take` and zeroes it.
#[derive(Debug, Default)]
pub struct ExpiredCounter(AtomicU64);

impl ExpiredCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add removed entries from one eviction pass.
    pub fn add(&self, removed: u64) {
        self.0.fetch_add(removed, Ordering::Relaxed);
    }

    /// Read and reset the counter.
    pub fn take(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// Handle to the background eviction thread.
pub struct EvictionWorker {
    handle: Option<JoinHandle<()>>,
}

impl EvictionWorker {
    /// Spawn the eviction loop on a dedicated named thread.
    pub fn spawn(
        cache: Arc<ExistenceCache>,
        ttl: Duration,
        interval: Duration,
        counter: Arc<ExpiredCounter>,
        cancel: CancelToken,
    ) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name("cache-evict".into())
            .spawn(move || eviction_loop(cache, ttl, interval, counter, cancel))?;

        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for the worker to exit. Call after canceling its token.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn eviction_loop(
    cache: Arc<ExistenceCache>,
    ttl: Duration,
    interval: Duration,
    counter: Arc<ExpiredCounter>,
    cancel: CancelToken,
) {
    let ttl_secs = ttl.as_secs() as u32;

    loop {
        select! {
            recv(cancel.channel()) -> _ => {
                tracing::debug!("eviction worker stopping");
                return;
            }
            recv(after(interval)) -> _ => {
                let removed = cache.expire(ttl_secs, &cancel);
                if removed > 0 {
                    counter.add(removed as u64);
                    tracing::debug!(removed, live = cache.count(), "eviction pass");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::PathKey;
    use crate::shutdown::CancelSource;
    use std::time::Instant;

    #[test]
    fn test_expired_counter_consume_and_reset() {
        let counter = ExpiredCounter::new();
        counter.add(3);
        counter.add(4);

        assert_eq!(counter.take(), 7);
        assert_eq!(counter.take(), 0);

        counter.add(1);
        assert_eq!(counter.take(), 1);
    }

    #[test]
    fn test_worker_stops_on_cancel() {
        let cache = Arc::new(ExistenceCache::new());
        let counter = Arc::new(ExpiredCounter::new());
        let source = CancelSource::new();

        let worker = EvictionWorker::spawn(
            Arc::clone(&cache),
            DEFAULT_CACHE_TTL,
            Duration::from_secs(3600), // never fires during the test
            Arc::clone(&counter),
            source.token(),
        )
        .unwrap();

        let started = Instant::now();
        source.cancel();
        worker.join();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_worker_evicts_on_interval() {
        let cache = Arc::new(ExistenceCache::new());
        let counter = Arc::new(ExpiredCounter::new());
        let source = CancelSource::new();

        // Entry written "now" with TTL zero becomes stale as soon as
        // one relative second has passed, so give the pass a moment.
        cache.set(PathKey::of(b"stale.metric"), 0, 0);

        let worker = EvictionWorker::spawn(
            Arc::clone(&cache),
            Duration::from_secs(0),
            Duration::from_millis(20),
            Arc::clone(&counter),
            source.token(),
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while cache.count() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(50));
        }

        source.cancel();
        worker.join();

        assert_eq!(cache.count(), 0);
        assert_eq!(counter.take(), 1);
    }
}
