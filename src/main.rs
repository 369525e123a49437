//! tree-uploader - deduplicating tree uploader CLI
//!
//! Entry point for the dry-run command line tool: decomposes row files
//! against a fresh existence cache and writes the surviving RowBinary
//! rows to a local file.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tree_uploader::config::{CliArgs, UploadConfig};
use tree_uploader::shutdown::CancelSource;
use tree_uploader::tree::reader::RowFileReader;
use tree_uploader::upload::{FileStore, TreeUploader, UploadContext};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = UploadConfig::from_args(&args).context("Invalid configuration")?;

    // Process-wide shared state: one cache, one id allocator
    let context = UploadContext::new();

    // Setup signal handler for graceful shutdown
    let cancel = Arc::new(CancelSource::new());
    let token = cancel.token();
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            eprintln!("\nInterrupt received, shutting down...");
            cancel.cancel();
        })
        .context("Failed to set signal handler")?;
    }

    // Background eviction, bound to the same shutdown signal
    let eviction = context
        .start_eviction(config.cache_ttl, config.eviction_interval, cancel.token())
        .context("Failed to start eviction worker")?;

    let store = Arc::new(FileStore::new(&args.output));
    let uploader =
        TreeUploader::new(&context, &config, store).context("Failed to create uploader")?;

    let mut total_rows = 0u64;
    let mut total_records = 0u64;

    for input in &args.inputs {
        let mut source = RowFileReader::open(input)
            .with_context(|| format!("Cannot read '{}'", input.display()))?;

        let outcome = uploader
            .upload(&mut source, &token)
            .with_context(|| format!("Upload failed for '{}'", input.display()))?;

        info!(
            file = %input.display(),
            rows = outcome.rows_emitted,
            records = outcome.records_read,
            skipped = outcome.records_skipped,
            "file uploaded"
        );

        total_rows += outcome.rows_emitted;
        total_records += outcome.records_read;
    }

    cancel.cancel();
    eviction.join();

    println!(
        "{} record(s) in, {} row(s) out -> {}",
        total_records,
        total_rows,
        args.output.display()
    );

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("tree_uploader=debug,warn")
    } else {
        EnvFilter::new("tree_uploader=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
