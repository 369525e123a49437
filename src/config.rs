//! Configuration types for tree-uploader
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::error::{ConfigError, ConfigResult};
use crate::tree::encode::TableVariant;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Minimum cache entry TTL
const MIN_CACHE_TTL_SECS: u64 = 1;

/// Minimum delay between eviction passes
const MIN_EVICTION_INTERVAL_SECS: u64 = 1;

/// Pipe buffer limits
const MIN_PIPE_BUFFER: usize = 4 * 1024;
const MAX_PIPE_BUFFER: usize = 64 * 1024 * 1024;

/// Deduplicating tree uploader for hierarchical metric paths
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tree-uploader",
    version,
    about = "Deduplicating tree uploader for hierarchical metric paths",
    long_about = "Reads row files of dotted metric paths, expands each path into its\n\
                  ancestor chain, drops rows already known to the existence cache,\n\
                  and streams the surviving RowBinary rows to an output file.",
    after_help = "EXAMPLES:\n    \
        tree-uploader batch1.bin batch2.bin -o tree.rowbinary\n    \
        tree-uploader batch.bin --table graphite_series --date-partitioned\n    \
        tree-uploader batch.bin --cache-ttl 7200 -v"
)]
pub struct CliArgs {
    /// Input row files (varint length-prefixed path records)
    #[arg(value_name = "ROW_FILE")]
    pub inputs: Vec<PathBuf>,

    /// Output file receiving the RowBinary insert body
    #[arg(short, long, default_value = "tree.rowbinary", value_name = "FILE")]
    pub output: PathBuf,

    /// Target table name
    #[arg(short, long, default_value = "graphite_tree", value_name = "NAME")]
    pub table: String,

    /// Emit the Date column (date-partitioned table variant)
    #[arg(long)]
    pub date_partitioned: bool,

    /// Existence cache entry TTL in seconds
    #[arg(long, default_value = "3600", value_name = "SECS")]
    pub cache_ttl: u64,

    /// Delay between eviction passes in seconds
    #[arg(long, default_value = "60", value_name = "SECS")]
    pub eviction_interval: u64,

    /// Upload pipe buffer size in bytes
    #[arg(long, default_value = "1048576", value_name = "BYTES")]
    pub pipe_buffer: usize,

    /// Verbose output (debug-level logging)
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Target table name
    pub table_name: String,

    /// Which columns the target table carries
    pub variant: TableVariant,

    /// Existence cache entry TTL
    pub cache_ttl: Duration,

    /// Delay between eviction passes
    pub eviction_interval: Duration,

    /// Upload pipe buffer size in bytes
    pub pipe_buffer: usize,
}

impl UploadConfig {
    /// Validate CLI arguments and build the runtime configuration.
    pub fn from_args(args: &CliArgs) -> ConfigResult<Self> {
        if args.inputs.is_empty() {
            return Err(ConfigError::NoInputs);
        }
        if args.table.trim().is_empty() {
            return Err(ConfigError::EmptyTableName);
        }
        if args.cache_ttl < MIN_CACHE_TTL_SECS {
            return Err(ConfigError::TtlTooSmall {
                min_secs: MIN_CACHE_TTL_SECS,
                got_secs: args.cache_ttl,
            });
        }
        if args.eviction_interval < MIN_EVICTION_INTERVAL_SECS {
            return Err(ConfigError::IntervalTooSmall {
                min_secs: MIN_EVICTION_INTERVAL_SECS,
                got_secs: args.eviction_interval,
            });
        }
        if args.pipe_buffer < MIN_PIPE_BUFFER || args.pipe_buffer > MAX_PIPE_BUFFER {
            return Err(ConfigError::PipeBufferOutOfRange {
                min: MIN_PIPE_BUFFER,
                max: MAX_PIPE_BUFFER,
                got: args.pipe_buffer,
            });
        }

        Ok(Self {
            table_name: args.table.clone(),
            variant: if args.date_partitioned {
                TableVariant::DatePartitioned
            } else {
                TableVariant::Tree
            },
            cache_ttl: Duration::from_secs(args.cache_ttl),
            eviction_interval: Duration::from_secs(args.eviction_interval),
            pipe_buffer: args.pipe_buffer,
        })
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            table_name: "graphite_tree".into(),
            variant: TableVariant::Tree,
            cache_ttl: crate::cache::DEFAULT_CACHE_TTL,
            eviction_interval: crate::cache::DEFAULT_EVICTION_INTERVAL,
            pipe_buffer: 1024 * 1024,
        }
    }
}
