//! Streaming upload pipeline
//!
//! Wires the tree decomposer to a concurrently running store writer so
//! a large batch never has to be buffered in full before the insert
//! begins.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────┐   bytes   ┌───────────────────────┐
//! │ producer (caller task) │ ────────▶ │ consumer (writer      │
//! │  TreeDecomposer        │   pipe    │  thread)              │
//! │  RowEncoder            │           │  StoreClient insert   │
//! └───────────┬────────────┘           └──────────┬────────────┘
//!             │ working set                       │ result
//!             ▼                                   ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │ controller: select {writer result, cancel}; on success     │
//! │ merge the working set into the shared ExistenceCache       │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod pipe;
pub mod pipeline;
pub mod store;

pub use pipe::{pipe, PipeReader, PipeWriter};
pub use pipeline::{TreeUploader, UploadContext, UploadOutcome};
pub use store::{insert_target, FileStore, StoreClient};
