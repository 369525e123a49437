//! Cancellation signaling
//!
//! A `CancelSource`/`CancelToken` pair used in two places:
//! - a process-wide token that stops the eviction worker,
//! - a per-upload token that aborts a blocked upload controller.
//!
//! The token carries an atomic flag for cheap polling (the eviction
//! scan checks it between shards) plus a channel receiver that
//! disconnects on cancel, so blocked `select!` arms wake up without
//! busy-waiting.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The cancelling side. Dropping the source also cancels.
pub struct CancelSource {
    flag: Arc<AtomicBool>,
    sender: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
}

impl CancelSource {
    /// Create a new, un-canceled source.
    pub fn new() -> Self {
        let (sender, receiver) = bounded(0);
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            sender: Mutex::new(Some(sender)),
            receiver,
        }
    }

    /// Get a token observing this source. Tokens are cheap to clone.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            flag: Arc::clone(&self.flag),
            receiver: self.receiver.clone(),
        }
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        // Dropping the sender disconnects every token's receiver,
        // waking any select! blocked on it.
        self.sender.lock().take();
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CancelSource {
    fn drop(&mut self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// The observing side. Clone freely across threads.
#[derive(Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    receiver: Receiver<()>,
}

impl CancelToken {
    /// Non-blocking check, used between cache shard scans.
    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Receiver for use in `crossbeam_channel::select!`. The channel
    /// never yields a message; it disconnects when the source cancels.
    pub fn channel(&self) -> &Receiver<()> {
        &self.receiver
    }

    /// A token that can never be canceled. Leaks one zero-capacity
    /// channel endpoint; intended for tests and one-shot tools.
    pub fn never() -> Self {
        let (sender, receiver) = bounded(0);
        std::mem::forget(sender);
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            receiver,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::select;
    use std::time::Duration;

    #[test]
    fn test_cancel_sets_flag() {
        let source = CancelSource::new();
        let token = source.token();

        assert!(!token.is_canceled());
        source.cancel();
        assert!(token.is_canceled());

        // Idempotent
        source.cancel();
        assert!(token.is_canceled());
    }

    #[test]
    fn test_cancel_wakes_select() {
        let source = CancelSource::new();
        let token = source.token();

        let handle = std::thread::spawn(move || {
            select! {
                recv(token.channel()) -> _ => true,
                default(Duration::from_secs(5)) => false,
            }
        });

        source.cancel();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_never_token() {
        let token = CancelToken::never();
        assert!(!token.is_canceled());

        let woke = select! {
            recv(token.channel()) -> _ => true,
            default(Duration::from_millis(10)) => false,
        };
        assert!(!woke);
    }
}
