//! Packed cache value: per-table flags plus a shared timestamp
//!
//! Each cache entry is a single 64-bit word:
//! - low 32 bits: last-write timestamp, seconds relative to the
//!   process start (the cache's relative time base)
//! - bits 32..63: one "known by table id i" flag per table writer
//!
//! Setting a value for one table ORs in that table's bit and
//! overwrites the timestamp without clearing the other table bits, so
//! a key accumulates "known by" flags across tables but carries one
//! shared last-write time. Eviction therefore drops an entry for all
//! tables at once.

/// Number of table flag bits available in the packed value.
pub const MAX_TABLES: usize = 32;

/// One cache entry: 32 table flags + a 32-bit relative timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackedEntry(u64);

impl PackedEntry {
    /// Entry with no flags and a zero timestamp. `has_table` is false
    /// for every id, matching the absent-key semantics of the map.
    pub const EMPTY: PackedEntry = PackedEntry(0);

    /// Reconstruct from a raw packed word.
    pub fn from_raw(raw: u64) -> Self {
        PackedEntry(raw)
    }

    /// The raw packed word.
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Last-write timestamp, seconds since the relative time base.
    pub fn timestamp(self) -> u32 {
        self.0 as u32
    }

    /// Whether the flag bit for `table_id` is set.
    pub fn has_table(self, table_id: u8) -> bool {
        self.0 & Self::flag_bit(table_id) != 0
    }

    /// Return a copy with `table_id`'s flag ORed in and the timestamp
    /// overwritten. Existing table flags are preserved.
    #[must_use]
    pub fn with_table(self, table_id: u8, timestamp: u32) -> Self {
        let flags = self.0 >> 32 << 32;
        PackedEntry(flags | Self::flag_bit(table_id) | u64::from(timestamp))
    }

    fn flag_bit(table_id: u8) -> u64 {
        debug_assert!((table_id as usize) < MAX_TABLES);
        1 << (32 + u64::from(table_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_layout_worked_example() {
        // set(0, 123) -> bit 32 set, low word 0x7b
        let e = PackedEntry::EMPTY.with_table(0, 123);
        assert_eq!(e.raw(), 0x1_0000_007b);

        // additionally set id 1 at the same timestamp
        let e = e.with_table(1, 123);
        assert_eq!(e.raw(), 0x3_0000_007b);

        // additionally set id 2 at timestamp 124 - flags accumulate,
        // the timestamp is overwritten for the whole entry
        let e = e.with_table(2, 124);
        assert_eq!(e.raw(), 0x7_0000_007c);
    }

    #[test]
    fn test_flags_accumulate() {
        let e = PackedEntry::EMPTY.with_table(5, 10).with_table(31, 20);
        assert!(e.has_table(5));
        assert!(e.has_table(31));
        assert!(!e.has_table(0));
        assert!(!e.has_table(6));
        assert_eq!(e.timestamp(), 20);
    }

    #[test]
    fn test_timestamp_overwrites_not_max() {
        // A later set with an older timestamp still wins (last writer
        // wins, no max is taken).
        let e = PackedEntry::EMPTY.with_table(0, 500).with_table(0, 100);
        assert_eq!(e.timestamp(), 100);
        assert!(e.has_table(0));
    }

    #[test]
    fn test_set_idempotent() {
        let once = PackedEntry::EMPTY.with_table(3, 77);
        let twice = once.with_table(3, 77);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_has_no_tables() {
        for id in 0..MAX_TABLES as u8 {
            assert!(!PackedEntry::EMPTY.has_table(id));
        }
    }
}
