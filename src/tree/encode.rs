//! RowBinary row encoding
//!
//! Wire format for the store insert body:
//! - unsigned 32-bit integers are little-endian
//! - byte strings are LEB128 varint length-prefixed, no terminator
//! - dates are unsigned 16-bit little-endian days since epoch
//!
//! A tree row is `level, path, version` concatenated with no
//! separators beyond the length prefixes. The date-partitioned table
//! variant additionally carries a leading `Date` column; the pure tree
//! variant omits it.

use std::io::{self, Write};

const SECONDS_PER_DAY: u32 = 86_400;

/// Write a little-endian u32.
pub fn write_u32<W: Write>(out: &mut W, value: u32) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

/// Write a little-endian u16.
pub fn write_u16<W: Write>(out: &mut W, value: u16) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

/// Write an unsigned LEB128 varint.
pub fn write_uvarint<W: Write>(out: &mut W, mut value: u64) -> io::Result<()> {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.write_all(&[byte])?;
        if value == 0 {
            return Ok(());
        }
    }
}

/// Write a varint length-prefixed byte string.
pub fn write_bytes<W: Write>(out: &mut W, bytes: &[u8]) -> io::Result<()> {
    write_uvarint(out, bytes.len() as u64)?;
    out.write_all(bytes)
}

/// Which columns the target table carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableVariant {
    /// `(Level, Path, Version)` - no date column.
    Tree,
    /// `(Date, Level, Path, Version)` - date-partitioned.
    DatePartitioned,
}

impl TableVariant {
    /// Column list for the insert query target.
    pub fn columns(self) -> &'static str {
        match self {
            TableVariant::Tree => "(Level, Path, Version)",
            TableVariant::DatePartitioned => "(Date, Level, Path, Version)",
        }
    }
}

/// Encodes tree rows for one batch.
///
/// The version (and the derived date for the partitioned variant) is
/// captured once per batch; every row in the batch carries it.
pub struct RowEncoder<W: Write> {
    out: W,
    variant: TableVariant,
    version: u32,
    date: u16,
}

impl<W: Write> RowEncoder<W> {
    /// Wrap an output stream. `version` is wall-clock seconds since
    /// epoch for this batch.
    pub fn new(out: W, variant: TableVariant, version: u32) -> Self {
        Self {
            out,
            variant,
            version,
            date: (version / SECONDS_PER_DAY) as u16,
        }
    }

    /// Encode one row for the given path or prefix.
    pub fn write_row(&mut self, level: u32, path: &[u8]) -> io::Result<()> {
        if self.variant == TableVariant::DatePartitioned {
            write_u16(&mut self.out, self.date)?;
        }
        write_u32(&mut self.out, level)?;
        write_bytes(&mut self.out, path)?;
        write_u32(&mut self.out, self.version)
    }

    /// Hand back the output stream. Does not flush - the caller
    /// decides between a clean close and an error close.
    pub fn into_inner(self) -> W {
        self.out
    }
}
