//! Record sources: the row-oriented input file interface
//!
//! Batches arrive as row-oriented binary files of varint
//! length-prefixed path records. The decomposer only needs "read next
//! record", so that is the whole trait; the concrete reader decides
//! what counts as clean end-of-input versus corruption.
//!
//! A matching writer is provided for tests and tooling that need to
//! produce row files.

use crate::error::{ReadError, ReadResult};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Longest accepted record. Metric paths are far shorter; a larger
/// length prefix means the file is corrupt.
pub const MAX_RECORD_LEN: u64 = 1 << 16;

/// A stream of raw path records.
///
/// `Ok(None)` signals clean end of input. The returned slice is valid
/// until the next call.
pub trait RecordSource {
    fn next_record(&mut self) -> ReadResult<Option<&[u8]>>;
}

/// Reads varint length-prefixed records from a row file.
pub struct RowFileReader {
    inner: BufReader<File>,
    buf: Vec<u8>,
}

impl RowFileReader {
    /// Open a row file for reading.
    pub fn open(path: &Path) -> ReadResult<Self> {
        let file = File::open(path).map_err(|source| ReadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            inner: BufReader::new(file),
            buf: Vec::new(),
        })
    }
}

impl RecordSource for RowFileReader {
    fn next_record(&mut self) -> ReadResult<Option<&[u8]>> {
        let len = match read_uvarint(&mut self.inner)? {
            Some(len) => len,
            // EOF at a record boundary is the normal end of input.
            None => return Ok(None),
        };

        if len > MAX_RECORD_LEN {
            return Err(ReadError::Oversized {
                len,
                max: MAX_RECORD_LEN,
            });
        }

        self.buf.resize(len as usize, 0);
        self.inner.read_exact(&mut self.buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                ReadError::Truncated {
                    expected: len as usize,
                }
            } else {
                ReadError::Io(e)
            }
        })?;

        Ok(Some(&self.buf))
    }
}

/// Read an unsigned LEB128 varint. `Ok(None)` if the stream ends
/// before the first byte; ending mid-varint is a truncation error.
fn read_uvarint<R: BufRead>(reader: &mut R) -> ReadResult<Option<u64>> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut first = true;

    loop {
        let mut byte = [0u8; 1];
        match reader.read_exact(&mut byte) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                if first {
                    return Ok(None);
                }
                return Err(ReadError::Truncated { expected: 1 });
            }
            Err(e) => return Err(ReadError::Io(e)),
        }
        first = false;

        value |= u64::from(byte[0] & 0x7f) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(Some(value));
        }
        shift += 7;
        if shift >= 64 {
            return Err(ReadError::Oversized {
                len: u64::MAX,
                max: MAX_RECORD_LEN,
            });
        }
    }
}

/// Writes varint length-prefixed records; the counterpart of
/// `RowFileReader`.
pub struct RowFileWriter {
    inner: BufWriter<File>,
}

impl RowFileWriter {
    /// Create (or truncate) a row file for writing.
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self {
            inner: BufWriter::new(File::create(path)?),
        })
    }

    /// Append one record.
    pub fn write_record(&mut self, record: &[u8]) -> io::Result<()> {
        crate::tree::encode::write_uvarint(&mut self.inner, record.len() as u64)?;
        self.inner.write_all(record)
    }

    /// Flush and close.
    pub fn finish(mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// In-memory record source for tests and benchmarks.
pub struct VecSource {
    records: Vec<Vec<u8>>,
    next: usize,
}

impl VecSource {
    pub fn new<I, B>(records: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        Self {
            records: records.into_iter().map(Into::into).collect(),
            next: 0,
        }
    }
}

impl RecordSource for VecSource {
    fn next_record(&mut self) -> ReadResult<Option<&[u8]>> {
        match self.records.get(self.next) {
            Some(record) => {
                self.next += 1;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip_row_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.bin");

        let mut writer = RowFileWriter::create(&path).unwrap();
        writer.write_record(b"a.b.c").unwrap();
        writer.write_record(b"").unwrap();
        writer.write_record(&vec![b'x'; 200]).unwrap();
        writer.finish().unwrap();

        let mut reader = RowFileReader::open(&path).unwrap();
        assert_eq!(reader.next_record().unwrap().unwrap(), b"a.b.c");
        assert_eq!(reader.next_record().unwrap().unwrap(), b"");
        assert_eq!(reader.next_record().unwrap().unwrap().len(), 200);
        assert!(reader.next_record().unwrap().is_none());
        // Stays at end.
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_truncated_record_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("truncated.bin");

        // Length prefix promises 100 bytes, only 3 follow.
        std::fs::write(&path, [100u8, b'a', b'b', b'c']).unwrap();

        let mut reader = RowFileReader::open(&path).unwrap();
        match reader.next_record() {
            Err(ReadError::Truncated { expected }) => assert_eq!(expected, 100),
            other => panic!("expected truncation error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_oversized_record_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("oversized.bin");

        // Varint for 1 << 20, beyond MAX_RECORD_LEN.
        let mut bytes = Vec::new();
        crate::tree::encode::write_uvarint(&mut bytes, 1 << 20).unwrap();
        std::fs::write(&path, &bytes).unwrap();

        let mut reader = RowFileReader::open(&path).unwrap();
        assert!(matches!(
            reader.next_record(),
            Err(ReadError::Oversized { .. })
        ));
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            RowFileReader::open(Path::new("/nonexistent/rows.bin")),
            Err(ReadError::Open { .. })
        ));
    }

    #[test]
    fn test_vec_source() {
        let mut source = VecSource::new([b"a.b".to_vec(), b"c".to_vec()]);
        assert_eq!(source.next_record().unwrap().unwrap(), b"a.b");
        assert_eq!(source.next_record().unwrap().unwrap(), b"c");
        assert!(source.next_record().unwrap().is_none());
    }
}
