//! Row access for a split's Parquet export.
//!
//! Two access patterns, both over the same loaded file:
//!
//! * [`SplitRows::scan`]: the index builder's sequential full scan, rows in
//!   ascending `row_idx` order (the budget cutoff depends on that order).
//! * [`SplitRows::fetch_rows`]: the query executor's selective fetch, which
//!   decodes only the requested rows through a Parquet `RowSelection`.
//!
//! The file is streamed from the object store once per `open` and held as
//! `Bytes`; scans and fetches then slice it zero-copy.

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use parquet::arrow::arrow_reader::{
    ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder, RowSelection, RowSelector,
};

use crate::error::{Result, SearchError};
use crate::schema::{Feature, features_of};
use crate::storage::{IndexStore, SplitRef};
use crate::utils::store_access::get_object_store;
use crate::value::{RowValues, batch_row};

/// Rows decoded per record batch during scans and fetches.
const BATCH_SIZE: usize = 1024;

/// A split's Parquet export, loaded and ready for row access.
pub struct SplitRows {
    bytes: Bytes,
    schema: SchemaRef,
    features: Vec<Feature>,
    num_rows: u64,
}

impl SplitRows {
    /// Streams the split's Parquet file from storage and parses its footer.
    ///
    /// A missing file means the split has no Parquet export, which surfaces
    /// as [`SearchError::UnsupportedType`]: search is a documented
    /// unavailability for such splits, not a transient failure.
    pub async fn open(store: &IndexStore, split: &SplitRef) -> Result<Self> {
        let path = store.parquet_path(split);
        let (object_store, obj_path) = get_object_store(&path).await?;

        let get_result = match object_store.get(&obj_path).await {
            Ok(r) => r,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(SearchError::UnsupportedType(format!(
                    "split {split} has no parquet export at {path}"
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let mut stream = get_result.into_stream();
        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SearchError::StreamRead(e.to_string()))?;
            buffer.extend_from_slice(&chunk);
        }
        let bytes = buffer.freeze();

        let builder = ParquetRecordBatchReaderBuilder::try_new(bytes.clone())?;
        let schema = builder.schema().clone();
        let num_rows = builder.metadata().file_metadata().num_rows() as u64;
        let features = features_of(schema.as_ref());

        Ok(SplitRows {
            bytes,
            schema,
            features,
            num_rows,
        })
    }

    /// Feature descriptors in schema order, resolved once at open.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Total rows in the split (not the indexed prefix).
    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    /// Sequential scan over all rows in ascending `row_idx` order.
    pub fn scan(&self) -> Result<RowScan> {
        let reader = ParquetRecordBatchReaderBuilder::try_new(self.bytes.clone())?
            .with_batch_size(BATCH_SIZE)
            .build()?;
        Ok(RowScan {
            reader,
            batch: None,
            offset_in_batch: 0,
            next_row_idx: 0,
        })
    }

    /// Fetches the full content of specific rows.
    ///
    /// `row_indices` must be strictly ascending; the resulting pairs come
    /// back in that same order. Only the selected rows are decoded.
    pub fn fetch_rows(&self, row_indices: &[u32]) -> Result<Vec<(u32, RowValues)>> {
        if row_indices.is_empty() {
            return Ok(Vec::new());
        }
        debug_assert!(row_indices.windows(2).all(|w| w[0] < w[1]));

        let mut selectors = Vec::new();
        let mut cursor = 0u32;
        for &row_idx in row_indices {
            if row_idx > cursor {
                selectors.push(RowSelector::skip((row_idx - cursor) as usize));
            }
            selectors.push(RowSelector::select(1));
            cursor = row_idx + 1;
        }

        let reader = ParquetRecordBatchReaderBuilder::try_new(self.bytes.clone())?
            .with_batch_size(BATCH_SIZE)
            .with_row_selection(RowSelection::from(selectors))
            .build()?;

        let mut rows = Vec::with_capacity(row_indices.len());
        let mut selected = row_indices.iter().copied();
        for batch in reader {
            let batch = batch.map_err(|e| SearchError::StreamRead(e.to_string()))?;
            for i in 0..batch.num_rows() {
                let row_idx = selected.next().ok_or_else(|| {
                    SearchError::StreamRead(
                        "row selection returned more rows than requested".to_string(),
                    )
                })?;
                rows.push((row_idx, batch_row(&batch, i)?));
            }
        }
        Ok(rows)
    }
}

/// Iterator yielding `(row_idx, row)` pairs for a sequential scan.
///
/// Decode failures surface as [`SearchError::StreamRead`], which aborts the
/// surrounding build: a half-read stream must never publish an index.
pub struct RowScan {
    reader: ParquetRecordBatchReader,
    batch: Option<RecordBatch>,
    offset_in_batch: usize,
    next_row_idx: u32,
}

impl Iterator for RowScan {
    type Item = Result<(u32, RowValues)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(batch) = &self.batch {
                if self.offset_in_batch < batch.num_rows() {
                    let row_idx = self.next_row_idx;
                    let row = match batch_row(batch, self.offset_in_batch) {
                        Ok(row) => row,
                        Err(e) => return Some(Err(e)),
                    };
                    self.offset_in_batch += 1;
                    self.next_row_idx += 1;
                    return Some(Ok((row_idx, row)));
                }
                self.batch = None;
                self.offset_in_batch = 0;
            }

            match self.reader.next() {
                Some(Ok(batch)) => self.batch = Some(batch),
                Some(Err(e)) => return Some(Err(SearchError::StreamRead(e.to_string()))),
                None => return None,
            }
        }
    }
}
