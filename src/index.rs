//! Inverted index construction and the serialized index artifact.
//!
//! The builder consumes a split's rows strictly in ascending `row_idx`
//! order, extracts and tokenizes their text, and accumulates postings under
//! a hard byte budget. When admitting the next row would exceed the budget,
//! the build stops and the artifact is flagged `partial`: it then covers a
//! strict prefix of the split and callers must be told, via that flag, that
//! unindexed rows can never match.
//!
//! The artifact layout is deterministic: terms are sorted lexicographically
//! and posting lists hold rows in ascending order, so rebuilding from the
//! same row stream, budget and tokenizer produces byte-identical output.
//! Sorted terms also give the query side binary-search lookups, no hash map
//! rebuild on load.

use hashbrown::HashMap;
use rkyv::rancor::Error as RkyvError;
use rkyv::util::AlignedVec;
use rkyv::{Archive, Archived, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize, to_bytes};
use tracing::{debug, info, warn};

use crate::error::{Result, SearchError};
use crate::extract::extract_text;
use crate::row_reader::SplitRows;
use crate::schema::Feature;
use crate::storage::{IndexStore, SplitRef};
use crate::tokenize::TermTokenizer;
use crate::value::{RowValues, row_byte_size};

/// Current artifact format version.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Default hard cap on bytes ingested per index build: 5 GB.
///
/// An operational tuning value, not structural; override it through
/// [`IndexOptions`].
pub const DEFAULT_BYTE_BUDGET: u64 = 5_000_000_000;

/// Knobs for one index build.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Maximum bytes of row data admitted before the build stops and the
    /// index is marked partial.
    pub byte_budget: u64,
}

impl Default for IndexOptions {
    fn default() -> Self {
        IndexOptions {
            byte_budget: DEFAULT_BYTE_BUDGET,
        }
    }
}

/// One posting: a row containing the term and how often it occurs there.
///
/// Postings with zero frequency are never stored; absence from the list is
/// the zero.
#[derive(Archive, RkyvSerialize, RkyvDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub row_idx: u32,
    pub term_frequency: u32,
}

/// The complete, immutable index for one (dataset, config, split).
///
/// Built once, published wholesale, and replaced wholesale on rebuild; no
/// incremental mutation. `terms` is sorted and `postings` runs parallel to
/// it, each list ascending by `row_idx`.
#[derive(Archive, RkyvSerialize, RkyvDeserialize, Debug, Clone, PartialEq)]
pub struct SearchIndex {
    pub version: u32,
    pub dataset: String,
    pub config: String,
    pub split: String,

    /// Sorted unique stemmed terms.
    pub terms: Vec<String>,
    /// Posting list per term, parallel to `terms`.
    pub postings: Vec<Vec<Posting>>,

    /// Token count per consumed row, indexed by `row_idx`. Skipped rows
    /// (extraction failures) hold zero.
    pub row_lengths: Vec<u32>,
    /// Average of `row_lengths`, the BM25 length-normalization reference.
    pub avg_row_length: f64,
    /// Rows consumed by this build; a strict prefix of the split when
    /// `partial` is true.
    pub num_rows_indexed: u32,

    /// True when the byte budget ran out before the split was exhausted.
    pub partial: bool,
    pub byte_budget: u64,
    pub bytes_consumed: u64,
}

impl SearchIndex {
    /// Looks up a term's posting list. Terms must already be stemmed; query
    /// code reaches this through the same tokenizer as the builder.
    pub fn term_postings(&self, term: &str) -> Option<&[Posting]> {
        self.terms
            .binary_search_by(|t| t.as_str().cmp(term))
            .ok()
            .map(|i| self.postings[i].as_slice())
    }

    /// Number of rows containing `term` (document frequency).
    pub fn document_frequency(&self, term: &str) -> usize {
        self.term_postings(term).map_or(0, |p| p.len())
    }

    /// Serializes the artifact with rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = to_bytes::<RkyvError>(self)
            .map_err(|e| SearchError::Index(format!("failed to serialize index: {e}")))?;
        Ok(bytes.to_vec())
    }

    /// Deserializes an artifact, copying into an aligned buffer first since
    /// object stores return arbitrarily aligned bytes.
    pub fn from_bytes(data: &[u8]) -> Result<SearchIndex> {
        let mut aligned = AlignedVec::<16>::new();
        aligned.extend_from_slice(data);
        let archived: &Archived<SearchIndex> = rkyv::access(&aligned)
            .map_err(|e: RkyvError| SearchError::Index(format!("corrupt index artifact: {e}")))?;
        rkyv::deserialize::<SearchIndex, RkyvError>(archived)
            .map_err(|e| SearchError::Index(format!("failed to deserialize index: {e}")))
    }
}

/// Outcome of a completed build, before publication.
#[derive(Debug)]
pub struct BuildOutcome {
    pub index: SearchIndex,
    /// Rows consumed but skipped because extraction failed.
    pub rows_skipped: u32,
}

/// Summary returned by [`build_and_save_index`](crate::build_and_save_index).
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub num_rows_indexed: u32,
    pub rows_skipped: u32,
    pub num_terms: usize,
    pub bytes_consumed: u64,
    pub byte_budget: u64,
    pub partial: bool,
    pub artifact_size: u64,
}

/// Accumulates postings for one split, row by row.
///
/// Rows must be pushed in ascending `row_idx` order starting at zero; the
/// budget cutoff depends on cumulative consumed bytes, which is why a build
/// is sequential by construction.
pub struct IndexBuilder {
    split: SplitRef,
    byte_budget: u64,
    tokenizer: TermTokenizer,
    postings: HashMap<String, Vec<Posting>>,
    row_lengths: Vec<u32>,
    bytes_consumed: u64,
    partial: bool,
    rows_skipped: u32,
}

impl IndexBuilder {
    pub fn new(split: SplitRef, options: &IndexOptions) -> Self {
        IndexBuilder {
            split,
            byte_budget: options.byte_budget,
            tokenizer: TermTokenizer::new(),
            postings: HashMap::new(),
            row_lengths: Vec::new(),
            bytes_consumed: 0,
            partial: false,
            rows_skipped: 0,
        }
    }

    /// Offers the next row to the build.
    ///
    /// Returns `false` when admitting the row would exceed the byte budget;
    /// the index is then partial and no further rows may be pushed. A row
    /// that fails extraction is consumed (its bytes count) but contributes
    /// no postings.
    pub fn push_row(&mut self, row_idx: u32, features: &[Feature], row: &RowValues) -> bool {
        debug_assert_eq!(row_idx as usize, self.row_lengths.len(), "rows must arrive in order");
        if self.partial {
            return false;
        }

        let row_size = row_byte_size(row);
        if self.bytes_consumed + row_size > self.byte_budget {
            self.partial = true;
            debug!(
                split = %self.split,
                row_idx,
                bytes_consumed = self.bytes_consumed,
                byte_budget = self.byte_budget,
                "byte budget exhausted, index will be partial"
            );
            return false;
        }
        self.bytes_consumed += row_size;

        let fields = match extract_text(features, row, row_idx) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(split = %self.split, row_idx, error = %e, "skipping row: extraction failed");
                self.rows_skipped += 1;
                self.row_lengths.push(0);
                return true;
            }
        };

        let mut row_terms: HashMap<String, u32> = HashMap::new();
        for field in &fields {
            for term in self.tokenizer.terms(field.text) {
                *row_terms.entry(term).or_insert(0) += 1;
            }
        }

        let row_length: u32 = row_terms.values().sum();
        self.row_lengths.push(row_length);

        // One posting per (term, row); rows arrive in order, so every list
        // stays ascending without a sort.
        for (term, term_frequency) in row_terms {
            self.postings.entry(term).or_default().push(Posting {
                row_idx,
                term_frequency,
            });
        }
        true
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    /// Freezes the accumulated state into the immutable artifact.
    pub fn finish(self) -> BuildOutcome {
        let mut entries: Vec<(String, Vec<Posting>)> = self.postings.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut terms = Vec::with_capacity(entries.len());
        let mut postings = Vec::with_capacity(entries.len());
        for (term, list) in entries {
            terms.push(term);
            postings.push(list);
        }

        let num_rows_indexed = self.row_lengths.len() as u32;
        let avg_row_length = if num_rows_indexed == 0 {
            0.0
        } else {
            self.row_lengths.iter().map(|&l| l as u64).sum::<u64>() as f64
                / num_rows_indexed as f64
        };

        let index = SearchIndex {
            version: INDEX_FORMAT_VERSION,
            dataset: self.split.dataset,
            config: self.split.config,
            split: self.split.split,
            terms,
            postings,
            row_lengths: self.row_lengths,
            avg_row_length,
            num_rows_indexed,
            partial: self.partial,
            byte_budget: self.byte_budget,
            bytes_consumed: self.bytes_consumed,
        };

        BuildOutcome {
            index,
            rows_skipped: self.rows_skipped,
        }
    }
}

/// Builds the index for a split by scanning its Parquet rows sequentially.
///
/// A stream read failure aborts the build and nothing is published; per-row
/// extraction failures are logged and skipped inside the builder.
pub async fn build_index(
    store: &IndexStore,
    split: &SplitRef,
    options: &IndexOptions,
) -> Result<BuildOutcome> {
    let rows = SplitRows::open(store, split).await?;
    let features = rows.features().to_vec();
    info!(
        split = %split,
        num_rows = rows.num_rows(),
        num_features = features.len(),
        byte_budget = options.byte_budget,
        "starting index build"
    );

    let mut builder = IndexBuilder::new(split.clone(), options);
    for item in rows.scan()? {
        let (row_idx, row) = item?;
        if !builder.push_row(row_idx, &features, &row) {
            break;
        }
    }

    let outcome = builder.finish();
    info!(
        split = %split,
        num_rows_indexed = outcome.index.num_rows_indexed,
        num_terms = outcome.index.terms.len(),
        bytes_consumed = outcome.index.bytes_consumed,
        partial = outcome.index.partial,
        rows_skipped = outcome.rows_skipped,
        "index build complete"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FeatureType;
    use crate::value::Value;

    fn text_features() -> Vec<Feature> {
        vec![Feature {
            feature_idx: 0,
            name: "text".to_string(),
            feature_type: FeatureType::Value { dtype: "string".to_string() },
        }]
    }

    fn text_row(text: &str) -> RowValues {
        let mut row = RowValues::new();
        row.insert("text".to_string(), Value::Str(text.to_string()));
        row
    }

    fn split() -> SplitRef {
        SplitRef::new("ds", "default", "train")
    }

    fn build_rows(rows: &[&str], budget: u64) -> SearchIndex {
        let features = text_features();
        let mut builder = IndexBuilder::new(split(), &IndexOptions { byte_budget: budget });
        for (i, text) in rows.iter().enumerate() {
            if !builder.push_row(i as u32, &features, &text_row(text)) {
                break;
            }
        }
        builder.finish().index
    }

    #[test]
    fn postings_record_per_row_frequencies() {
        let index = build_rows(&["dog dog cat", "cat"], u64::MAX);
        let dog = index.term_postings("dog").unwrap();
        assert_eq!(dog, &[Posting { row_idx: 0, term_frequency: 2 }]);
        let cat = index.term_postings("cat").unwrap();
        assert_eq!(cat, &[
            Posting { row_idx: 0, term_frequency: 1 },
            Posting { row_idx: 1, term_frequency: 1 },
        ]);
        assert!(index.term_postings("bird").is_none());
        assert_eq!(index.document_frequency("cat"), 2);
        assert_eq!(index.document_frequency("bird"), 0);
        assert!(!index.partial);
    }

    #[test]
    fn zero_frequencies_are_absent_not_stored() {
        let index = build_rows(&["alpha", "beta"], u64::MAX);
        for list in &index.postings {
            assert!(list.iter().all(|p| p.term_frequency >= 1));
        }
    }

    #[test]
    fn terms_are_sorted_and_rows_ascending() {
        let index = build_rows(&["zebra apple", "mango apple", "apple"], u64::MAX);
        let mut sorted = index.terms.clone();
        sorted.sort();
        assert_eq!(index.terms, sorted);
        for list in &index.postings {
            assert!(list.windows(2).all(|w| w[0].row_idx < w[1].row_idx));
        }
    }

    #[test]
    fn build_is_deterministic() {
        let rows = ["the quick brown fox", "jumps over", "the lazy dogs"];
        let a = build_rows(&rows, u64::MAX);
        let b = build_rows(&rows, u64::MAX);
        assert_eq!(a, b);
        assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
    }

    #[test]
    fn budget_cuts_a_strict_prefix() {
        let rows = ["aaaa bbbb", "cccc dddd", "eeee ffff"];
        // Row 0 is 4 (column name) + 9 (text) = 13 bytes; a 15-byte budget
        // admits only row 0.
        let index = build_rows(&rows, 15);
        assert!(index.partial);
        assert_eq!(index.num_rows_indexed, 1);
        assert!(index.term_postings("aaaa").is_some());
        assert!(index.term_postings("cccc").is_none());
        assert!(index.bytes_consumed <= 15);

        // A bigger budget indexes a superset prefix.
        let larger = build_rows(&rows, 30);
        assert_eq!(larger.num_rows_indexed, 2);
        assert!(larger.partial);
        let full = build_rows(&rows, u64::MAX);
        assert_eq!(full.num_rows_indexed, 3);
        assert!(!full.partial);
    }

    #[test]
    fn extraction_failure_skips_row_but_consumes_bytes() {
        let features = text_features();
        let mut builder = IndexBuilder::new(split(), &IndexOptions::default());
        assert!(builder.push_row(0, &features, &text_row("good row")));

        let mut bad = RowValues::new();
        bad.insert("text".to_string(), Value::Int(42));
        let before = builder.bytes_consumed();
        assert!(builder.push_row(1, &features, &bad));
        assert!(builder.bytes_consumed() > before);

        assert!(builder.push_row(2, &features, &text_row("another good row")));
        let outcome = builder.finish();
        assert_eq!(outcome.rows_skipped, 1);
        assert_eq!(outcome.index.num_rows_indexed, 3);
        assert_eq!(outcome.index.row_lengths[1], 0);
        // The skipped row contributes no postings.
        for list in &outcome.index.postings {
            assert!(list.iter().all(|p| p.row_idx != 1));
        }
    }

    #[test]
    fn artifact_round_trips_through_rkyv() {
        let index = build_rows(&["dogs bark loudly", "cats sleep"], u64::MAX);
        let bytes = index.to_bytes().unwrap();
        let restored = SearchIndex::from_bytes(&bytes).unwrap();
        assert_eq!(index, restored);
    }

    #[test]
    fn average_row_length_reflects_token_counts() {
        let index = build_rows(&["one two three", "four"], u64::MAX);
        assert_eq!(index.row_lengths, vec![3, 1]);
        assert!((index.avg_row_length - 2.0).abs() < f64::EPSILON);
    }
}
