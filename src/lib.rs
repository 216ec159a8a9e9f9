//! Fulltext - BM25 full-text search over Parquet-backed dataset splits
//!
//! This library builds a BM25-capable inverted index over all string-typed
//! columns of a dataset split (including strings nested inside lists and
//! structs) and answers free-text queries with a paginated window of
//! matching rows in original row order.
//!
//! # Overview
//!
//! - **Indexing**: scans a split's Parquet export sequentially, extracts
//!   text from every string leaf, applies English Porter stemming, and
//!   accumulates an inverted index under a hard byte budget. When the
//!   budget is exhausted the index covers a strict prefix of the split and
//!   is flagged `partial`.
//! - **Querying**: tokenizes a query identically, uses BM25 purely as a
//!   match-membership test, then returns matching rows in ascending
//!   `row_idx` order; relevance never orders the output.
//! - **Storage**: splits and index artifacts live behind an object-store
//!   abstraction (local filesystem, S3, or in-memory), keyed by
//!   (dataset, config, split).
//!
//! # Quick Start
//!
//! ```no_run
//! use fulltext::{IndexOptions, IndexStore, SplitRef, build_and_save_index, search};
//!
//! #[tokio::main]
//! async fn main() -> fulltext::Result<()> {
//!     let store = IndexStore::new("/data/exports");
//!     let split = SplitRef::new("squad", "default", "train");
//!
//!     // Build and publish the index
//!     build_and_save_index(&store, &split, &IndexOptions::default()).await?;
//!
//!     // Query a paginated window of matches, in row order
//!     let response = search(&store, &split, "rust programming", 0, 10).await?;
//!     println!("{} matching rows", response.num_rows_total);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Known limitations
//!
//! - Porter stemming assumes English; non-English text still indexes but
//!   relevance degrades.
//! - Queries cannot see rows beyond the indexed byte budget; the `partial`
//!   flag in every response says when that applies.

pub mod error;
pub mod extract;
pub mod index;
pub mod row_reader;
pub mod schema;
pub mod searching;
pub mod storage;
pub mod tokenize;
pub mod utils;
pub mod value;

pub use error::{Result, SearchError};
pub use index::{
    BuildReport, DEFAULT_BYTE_BUDGET, INDEX_FORMAT_VERSION, IndexOptions, Posting, SearchIndex,
};
pub use schema::{Feature, FeatureType};
pub use searching::{NUM_ROWS_PER_PAGE, RowItem, SearchResponse, SplitSearcher};
pub use storage::{IndexStore, SplitRef};
pub use tokenize::TermTokenizer;
pub use value::{RowValues, Value};

/// Metadata about a published index artifact.
#[derive(Debug, Clone)]
pub struct IndexInfo {
    pub version: u32,
    pub dataset: String,
    pub config: String,
    pub split: String,
    pub num_terms: usize,
    pub num_rows_indexed: u32,
    pub bytes_consumed: u64,
    pub byte_budget: u64,
    pub partial: bool,
    pub artifact_size: u64,
}

/// Builds the index for a split and publishes it in one step.
///
/// The artifact replaces any previous one atomically from a reader's
/// perspective; a failed build publishes nothing and leaves the previous
/// artifact servable.
pub async fn build_and_save_index(
    store: &IndexStore,
    split: &SplitRef,
    options: &IndexOptions,
) -> Result<BuildReport> {
    let outcome = index::build_index(store, split, options).await?;
    let artifact_size = store.save(split, &outcome.index).await?;
    Ok(BuildReport {
        num_rows_indexed: outcome.index.num_rows_indexed,
        rows_skipped: outcome.rows_skipped,
        num_terms: outcome.index.terms.len(),
        bytes_consumed: outcome.index.bytes_consumed,
        byte_budget: outcome.index.byte_budget,
        partial: outcome.index.partial,
        artifact_size,
    })
}

/// Runs one query against a split's published index.
///
/// Convenience wrapper that loads the searcher per call; for repeated
/// queries over the same split, hold a [`SplitSearcher`] instead.
pub async fn search(
    store: &IndexStore,
    split: &SplitRef,
    query: &str,
    offset: usize,
    length: usize,
) -> Result<SearchResponse> {
    let searcher = SplitSearcher::load(store, split).await?;
    searcher.search(query, offset, length).await
}

/// Quick check whether an index artifact exists for the split. Does not
/// validate freshness against the Parquet export.
pub async fn index_exists(store: &IndexStore, split: &SplitRef) -> bool {
    store.index_exists(split).await
}

/// Loads the index artifact and reports its metadata.
pub async fn index_info(store: &IndexStore, split: &SplitRef) -> Result<IndexInfo> {
    let artifact_size = store.index_size(split).await?;
    let index = store.load(split).await?;
    Ok(IndexInfo {
        version: index.version,
        dataset: index.dataset,
        config: index.config,
        split: index.split,
        num_terms: index.terms.len(),
        num_rows_indexed: index.num_rows_indexed,
        bytes_consumed: index.bytes_consumed,
        byte_budget: index.byte_budget,
        partial: index.partial,
        artifact_size,
    })
}
