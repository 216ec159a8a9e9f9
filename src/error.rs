//! Error taxonomy for index builds and queries.
//!
//! The variants are grouped by who recovers from them:
//!
//! - [`SearchError::Validation`]: the caller sent a bad request; fix and resend.
//! - [`SearchError::IndexNotFound`]: no artifact yet; trigger a build and retry.
//! - [`SearchError::Extraction`]: one row could not be extracted; the builder
//!   skips it and continues; surfaced only in logs and build reports.
//! - [`SearchError::StreamRead`]: the split scan failed mid-way; the build is
//!   aborted and nothing is published.
//! - [`SearchError::UnsupportedType`]: the split has no Parquet export, so
//!   search is unavailable for it; a fixed limitation, not a transient failure.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SearchError>;

/// All error conditions raised by the index builder and query executor.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request parameters were rejected before any work was attempted.
    #[error("invalid request: {0}")]
    Validation(String),

    /// No index artifact exists yet for the requested split. Recoverable by
    /// retrying after an external build completes.
    #[error("no search index for {dataset}/{config}/{split}; it has not been built yet")]
    IndexNotFound {
        dataset: String,
        config: String,
        split: String,
    },

    /// A single row held values incompatible with the declared schema. The
    /// builder recovers by skipping the row.
    #[error("row {row_idx} could not be extracted: {reason}")]
    Extraction { row_idx: u32, reason: String },

    /// Reading the split's row stream failed. Fatal to the build attempt.
    #[error("failed to read split data: {0}")]
    StreamRead(String),

    /// The split is not backed by the required Parquet export.
    #[error("search is unavailable: {0}")]
    UnsupportedType(String),

    /// Underlying storage failure (local filesystem, S3, or memory store).
    #[error(transparent)]
    Storage(#[from] object_store::Error),

    /// Parquet decode failure.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow conversion failure.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Index artifact could not be serialized or deserialized.
    #[error("index artifact error: {0}")]
    Index(String),

    /// A storage root or path could not be parsed.
    #[error("invalid storage url: {0}")]
    Url(#[from] url::ParseError),
}

impl SearchError {
    /// True when the caller should retry after an external index build.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SearchError::IndexNotFound { .. })
    }
}
