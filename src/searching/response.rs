//! Response envelope consumed by the external HTTP layer.

use serde::Serialize;

use crate::schema::Feature;
use crate::value::RowValues;

/// One matched row in the response.
#[derive(Debug, Clone, Serialize)]
pub struct RowItem {
    pub row_idx: u32,
    pub row: RowValues,
    /// Always empty here: this endpoint performs no cell truncation.
    pub truncated_cells: Vec<String>,
}

/// The full search response.
///
/// `rows` is ascending by `row_idx`: original dataset order, never score
/// order. `num_rows_total` counts all matches before pagination, so it is
/// the same for every window over the same query and index. `partial` is
/// inherited from the index: when true, only a byte-budget-limited prefix
/// of the split was searchable.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub features: Vec<Feature>,
    pub rows: Vec<RowItem>,
    pub num_rows_total: u64,
    pub num_rows_per_page: usize,
    pub partial: bool,
}
