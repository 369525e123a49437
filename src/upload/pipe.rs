//! Bounded in-memory byte pipe
//!
//! Connects the decomposer (producer) to the store writer (consumer):
//! a bounded channel of byte chunks with a small write-side buffer.
//! The producer blocks when the channel is full, the consumer blocks
//! when it is empty, so the pipe bounds memory and applies
//! backpressure in both directions.
//!
//! Either side can close the pipe with an error; the error surfaces as
//! an `io::Error` on the peer, so neither task can stay blocked after
//! the other gives up. Dropping the writer after a flush reads as
//! clean EOF; dropping the reader turns further writes into broken
//! pipe errors.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::io::{self, Read, Write};
use std::sync::Arc;

/// Chunk granularity for the channel.
const CHUNK_SIZE: usize = 64 * 1024;

struct Shared {
    error: Mutex<Option<String>>,
}

impl Shared {
    /// First error wins; later closes keep the original cause.
    fn set_error(&self, message: String) {
        let mut slot = self.error.lock();
        if slot.is_none() {
            *slot = Some(message);
        }
    }

    fn error(&self) -> Option<String> {
        self.error.lock().clone()
    }
}

/// Create a pipe buffering roughly `buffer_bytes` in flight.
pub fn pipe(buffer_bytes: usize) -> (PipeWriter, PipeReader) {
    let chunks = (buffer_bytes / CHUNK_SIZE).max(1);
    let (sender, receiver) = bounded(chunks);
    let shared = Arc::new(Shared {
        error: Mutex::new(None),
    });

    let writer = PipeWriter {
        sender: Some(sender),
        buf: Vec::with_capacity(CHUNK_SIZE),
        shared: Arc::clone(&shared),
    };
    let reader = PipeReader {
        receiver,
        current: Vec::new(),
        pos: 0,
        shared,
    };
    (writer, reader)
}

/// Producer half.
pub struct PipeWriter {
    sender: Option<Sender<Vec<u8>>>,
    buf: Vec<u8>,
    shared: Arc<Shared>,
}

impl PipeWriter {
    /// Flush buffered bytes and close cleanly; the reader sees EOF
    /// once it drains the remaining chunks.
    pub fn close(mut self) -> io::Result<()> {
        self.flush()?;
        self.sender = None;
        Ok(())
    }

    /// Close carrying a producer-side failure. Buffered bytes are
    /// discarded; the reader's next read past the queued chunks fails
    /// with this message.
    pub fn close_with_error(mut self, message: String) {
        self.shared.set_error(message);
        self.buf.clear();
        self.sender = None;
    }

    fn send_chunk(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::take(&mut self.buf);
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "pipe writer closed"))?;
        sender.send(chunk).map_err(|_| self.peer_gone())
    }

    /// The reader was dropped or closed with an error.
    fn peer_gone(&self) -> io::Error {
        let message = self
            .shared
            .error()
            .unwrap_or_else(|| "upload pipe closed by reader".into());
        io::Error::new(io::ErrorKind::BrokenPipe, message)
    }
}

impl Write for PipeWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.shared.error().is_some() {
            return Err(self.peer_gone());
        }
        self.buf.extend_from_slice(data);
        if self.buf.len() >= CHUNK_SIZE {
            self.send_chunk()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_chunk()
    }
}

/// Consumer half.
pub struct PipeReader {
    receiver: Receiver<Vec<u8>>,
    current: Vec<u8>,
    pos: usize,
    shared: Arc<Shared>,
}

impl PipeReader {
    /// Close carrying a consumer-side failure (e.g. the store rejected
    /// the insert). Unblocks a producer waiting on a full pipe; its
    /// next write fails with this message.
    pub fn close_with_error(self, message: String) {
        self.shared.set_error(message);
        // Dropping the receiver disconnects the channel.
    }
}

impl Read for PipeReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.current.len() {
                let n = out.len().min(self.current.len() - self.pos);
                out[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }

            match self.receiver.recv() {
                Ok(chunk) => {
                    self.current = chunk;
                    self.pos = 0;
                }
                // Writer gone: clean EOF unless it closed with an error.
                Err(_) => {
                    return match self.shared.error() {
                        Some(message) => Err(io::Error::new(io::ErrorKind::Other, message)),
                        None => Ok(0),
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_round_trip() {
        let (mut writer, mut reader) = pipe(1 << 20);

        let consumer = thread::spawn(move || {
            let mut collected = Vec::new();
            reader.read_to_end(&mut collected).unwrap();
            collected
        });

        let payload: Vec<u8> = (0..200_000).map(|i| i as u8).collect();
        writer.write_all(&payload).unwrap();
        writer.close().unwrap();

        assert_eq!(consumer.join().unwrap(), payload);
    }

    #[test]
    fn test_writer_error_reaches_reader() {
        let (mut writer, mut reader) = pipe(1 << 20);

        writer.write_all(b"partial").unwrap();
        writer.close_with_error("decompose failed".into());

        let mut collected = Vec::new();
        let err = reader.read_to_end(&mut collected).unwrap_err();
        assert!(err.to_string().contains("decompose failed"));
    }

    #[test]
    fn test_reader_error_unblocks_writer() {
        // Capacity of one chunk so the producer fills up quickly.
        let (mut writer, reader) = pipe(1);

        let producer = thread::spawn(move || {
            let chunk = vec![0u8; CHUNK_SIZE];
            loop {
                if let Err(e) = writer.write_all(&chunk) {
                    return e;
                }
            }
        });

        reader.close_with_error("store rejected insert".into());

        let err = producer.join().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(err.to_string().contains("store rejected insert"));
    }

    #[test]
    fn test_drop_reader_breaks_writes() {
        let (mut writer, reader) = pipe(1);
        drop(reader);

        let chunk = vec![0u8; CHUNK_SIZE];
        let err = loop {
            if let Err(e) = writer.write_all(&chunk) {
                break e;
            }
        };
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_small_writes_buffered_until_flush() {
        let (mut writer, mut reader) = pipe(1 << 20);

        writer.write_all(b"abc").unwrap();
        writer.flush().unwrap();
        writer.close().unwrap();

        let mut collected = Vec::new();
        reader.read_to_end(&mut collected).unwrap();
        assert_eq!(collected, b"abc");
    }
}
