//! Tree decomposition of metric paths
//!
//! Turns a stream of dotted metric paths into the minimal set of
//! RowBinary rows needed to keep the store's hierarchy consistent.
//! Each path implies a chain of ancestor prefixes; this module expands
//! the chain, drops everything already known (to the existence cache
//! or emitted earlier in the same batch), and encodes the survivors.
//!
//! ```text
//! "a.b.c"  ──▶  (3, "a.b.c", v)  (2, "a.b.", v)  (1, "a.", v)
//! ```

pub mod decompose;
pub mod encode;
pub mod reader;

pub use decompose::{path_level, Decomposition, TreeDecomposer, TAG_DELIMITER};
pub use encode::{RowEncoder, TableVariant};
pub use reader::{RecordSource, RowFileReader, RowFileWriter, VecSource};
