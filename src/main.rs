//! Fulltext - Command Line Interface
//!
//! Builds BM25 search indexes for Parquet-backed dataset splits and runs
//! queries against them. Splits are addressed as (dataset, config, split)
//! under a storage root, which may be a local directory, an `s3://` url, or
//! `memory://` (useful only within one process).
//!
//! # Commands
//!
//! - **`index`** - Builds and publishes the search index for a split
//! - **`search`** - Queries a split and prints the JSON response envelope
//! - **`info`** - Displays metadata about a published index
//!
//! # Usage Examples
//!
//! ```bash
//! # Build an index (optionally with a byte budget)
//! fulltext index /data/exports squad default train
//! fulltext index /data/exports squad default train --budget 1000000000
//!
//! # Search: query, then optional offset and length
//! fulltext search /data/exports squad default train "neural networks" 0 20
//!
//! # Inspect a published index
//! fulltext info /data/exports squad default train
//! ```
//!
//! # Exit Codes
//!
//! - `0` - Success
//! - `1` - General error (invalid arguments, build failure, query failure)
//! - `2` - Index not built yet (search/info commands; build it and retry)

use std::env;
use std::process;

use fulltext::{
    IndexOptions, IndexStore, SearchError, SplitRef, build_and_save_index, index_info, search,
};

fn print_usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {program} index  <root> <dataset> <config> <split> [--budget BYTES]");
    eprintln!("  {program} search <root> <dataset> <config> <split> <query> [offset] [length]");
    eprintln!("  {program} info   <root> <dataset> <config> <split>");
}

fn exit_code(error: &SearchError) -> i32 {
    if error.is_retryable() { 2 } else { 1 }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("fulltext");

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(program);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let command = args[1].as_str();
    if args.len() < 6 {
        eprintln!("error: missing arguments for '{command}'");
        print_usage(program);
        process::exit(1);
    }

    let store = IndexStore::new(&args[2]);
    let split = SplitRef::new(&args[3], &args[4], &args[5]);

    let code = match command {
        "index" => run_index(&store, &split, &args[6..]).await,
        "search" => run_search(&store, &split, &args[6..]).await,
        "info" => run_info(&store, &split).await,
        other => {
            eprintln!("error: unknown command '{other}'");
            print_usage(program);
            1
        }
    };
    process::exit(code);
}

async fn run_index(store: &IndexStore, split: &SplitRef, rest: &[String]) -> i32 {
    let mut options = IndexOptions::default();
    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--budget" => match iter.next().and_then(|v| v.parse::<u64>().ok()) {
                Some(budget) => options.byte_budget = budget,
                None => {
                    eprintln!("error: --budget requires a byte count");
                    return 1;
                }
            },
            other => {
                eprintln!("error: unknown option '{other}'");
                return 1;
            }
        }
    }

    match build_and_save_index(store, split, &options).await {
        Ok(report) => {
            println!("Indexed {split}:");
            println!("  rows indexed:   {}", report.num_rows_indexed);
            println!("  rows skipped:   {}", report.rows_skipped);
            println!("  unique terms:   {}", report.num_terms);
            println!(
                "  bytes consumed: {} of {} budget",
                report.bytes_consumed, report.byte_budget
            );
            println!("  partial:        {}", report.partial);
            println!(
                "  artifact size:  {} bytes ({:.2} KB)",
                report.artifact_size,
                report.artifact_size as f64 / 1024.0
            );
            0
        }
        Err(e) => {
            eprintln!("error: index build failed: {e}");
            exit_code(&e)
        }
    }
}

async fn run_search(store: &IndexStore, split: &SplitRef, rest: &[String]) -> i32 {
    let Some(query) = rest.first() else {
        eprintln!("error: search requires a query string");
        return 1;
    };
    let offset = match rest.get(1).map(|v| v.parse::<usize>()) {
        None => 0,
        Some(Ok(v)) => v,
        Some(Err(_)) => {
            eprintln!("error: offset must be a non-negative integer");
            return 1;
        }
    };
    let length = match rest.get(2).map(|v| v.parse::<usize>()) {
        None => fulltext::NUM_ROWS_PER_PAGE,
        Some(Ok(v)) => v,
        Some(Err(_)) => {
            eprintln!("error: length must be an integer between 1 and 100");
            return 1;
        }
    };

    match search(store, split, query, offset, length).await {
        Ok(response) => match serde_json::to_string_pretty(&response) {
            Ok(json) => {
                println!("{json}");
                0
            }
            Err(e) => {
                eprintln!("error: failed to serialize response: {e}");
                1
            }
        },
        Err(e) => {
            eprintln!("error: search failed: {e}");
            exit_code(&e)
        }
    }
}

async fn run_info(store: &IndexStore, split: &SplitRef) -> i32 {
    match index_info(store, split).await {
        Ok(info) => {
            println!("Index for {split}:");
            println!("  format version: {}", info.version);
            println!("  unique terms:   {}", info.num_terms);
            println!("  rows indexed:   {}", info.num_rows_indexed);
            println!(
                "  bytes consumed: {} of {} budget",
                info.bytes_consumed, info.byte_budget
            );
            println!("  partial:        {}", info.partial);
            println!(
                "  artifact size:  {} bytes ({:.2} KB)",
                info.artifact_size,
                info.artifact_size as f64 / 1024.0
            );
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            exit_code(&e)
        }
    }
}
