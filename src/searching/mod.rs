pub mod query;
pub mod response;
pub mod scoring;

pub use query::{NUM_ROWS_PER_PAGE, SplitSearcher};
pub use response::{RowItem, SearchResponse};
