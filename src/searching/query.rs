//! Query execution over a published index.
//!
//! A [`SplitSearcher`] pairs the immutable index artifact with the split's
//! row store. Loading fails with [`SearchError::IndexNotFound`] when no
//! artifact exists yet; the caller's job layer is expected to trigger a
//! build and retry. Once loaded, a searcher is read-only and may serve any
//! number of queries; identical (query, offset, length) inputs return
//! identical results.
//!
//! BM25 relevance decides only *membership*: rows with a positive score
//! match, and the matching set is then sorted back into ascending row order
//! before pagination. Relevance ranking is intentionally discarded in the
//! output; that is the contract, not an oversight.

use hashbrown::HashMap;
use tracing::debug;

use crate::error::{Result, SearchError};
use crate::index::SearchIndex;
use crate::row_reader::SplitRows;
use crate::searching::response::{RowItem, SearchResponse};
use crate::searching::scoring::bm25_score;
use crate::storage::{IndexStore, SplitRef};
use crate::tokenize::TermTokenizer;

/// Server-side page size cap; also echoed as `num_rows_per_page`.
pub const NUM_ROWS_PER_PAGE: usize = 100;

/// Read-only query executor for one split.
pub struct SplitSearcher {
    split: SplitRef,
    index: SearchIndex,
    rows: SplitRows,
    tokenizer: TermTokenizer,
}

impl SplitSearcher {
    /// Loads the index artifact and opens the split's row store.
    pub async fn load(store: &IndexStore, split: &SplitRef) -> Result<Self> {
        let index = store.load(split).await?;
        let rows = SplitRows::open(store, split).await?;
        Ok(SplitSearcher {
            split: split.clone(),
            index,
            rows,
            tokenizer: TermTokenizer::new(),
        })
    }

    /// For tests and tools that already hold the pieces.
    pub fn from_parts(split: SplitRef, index: SearchIndex, rows: SplitRows) -> Self {
        SplitSearcher {
            split,
            index,
            rows,
            tokenizer: TermTokenizer::new(),
        }
    }

    /// True when the index covers only a budget-limited prefix of the split.
    pub fn partial(&self) -> bool {
        self.index.partial
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    /// Runs a query over the window `[offset, offset + length)`.
    ///
    /// `query` must be non-empty after trimming and `length` must lie in
    /// `1..=100`; out-of-range values are rejected, never clamped. A window
    /// past the end of the match list yields a shorter or empty page, not an
    /// error.
    pub async fn search(&self, query: &str, offset: usize, length: usize) -> Result<SearchResponse> {
        if query.trim().is_empty() {
            return Err(SearchError::Validation("query must not be empty".to_string()));
        }
        if length == 0 || length > NUM_ROWS_PER_PAGE {
            return Err(SearchError::Validation(format!(
                "length must be between 1 and {NUM_ROWS_PER_PAGE}, got {length}"
            )));
        }

        // Identical normalization to the build side, or matches silently
        // fail. Duplicate query terms add nothing to membership.
        let mut terms: Vec<String> = self.tokenizer.terms(query).collect();
        terms.sort();
        terms.dedup();

        // A query that normalizes to nothing (pure punctuation) matches
        // nothing; that is an empty result, not an error.
        let matches = if terms.is_empty() {
            Vec::new()
        } else {
            self.matching_rows(&terms)
        };

        let num_rows_total = matches.len() as u64;
        let window_start = offset.min(matches.len());
        let window_end = offset.saturating_add(length).min(matches.len());
        let window = &matches[window_start..window_end];

        debug!(
            split = %self.split,
            query,
            num_terms = terms.len(),
            num_rows_total,
            window = window.len(),
            "query executed"
        );

        let fetched = self.rows.fetch_rows(window)?;
        let rows = fetched
            .into_iter()
            .map(|(row_idx, row)| RowItem {
                row_idx,
                row,
                truncated_cells: Vec::new(),
            })
            .collect();

        Ok(SearchResponse {
            features: self.rows.features().to_vec(),
            rows,
            num_rows_total,
            num_rows_per_page: NUM_ROWS_PER_PAGE,
            partial: self.index.partial,
        })
    }

    /// Scores every candidate row and returns the matching set in ascending
    /// row order. Score is a membership test only.
    fn matching_rows(&self, terms: &[String]) -> Vec<u32> {
        let total_rows = self.index.num_rows_indexed as f32;
        let avg_row_len = self.index.avg_row_length as f32;

        let mut scores: HashMap<u32, f32> = HashMap::new();
        for term in terms {
            let Some(postings) = self.index.term_postings(term) else {
                continue;
            };
            let df = postings.len() as f32;
            for posting in postings {
                let row_len = self.index.row_lengths[posting.row_idx as usize] as f32;
                let score = bm25_score(
                    posting.term_frequency as f32,
                    df,
                    total_rows,
                    row_len,
                    avg_row_len,
                );
                *scores.entry(posting.row_idx).or_insert(0.0) += score;
            }
        }

        let mut matches: Vec<u32> = scores
            .into_iter()
            .filter(|&(_, score)| score > 0.0)
            .map(|(row_idx, _)| row_idx)
            .collect();
        matches.sort_unstable();
        matches
    }
}
