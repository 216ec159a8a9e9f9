//! Index artifact storage keyed by (dataset, config, split).
//!
//! Layout under a storage root (local directory, `s3://bucket/prefix`, or
//! `memory://prefix`):
//!
//! ```text
//! {root}/{dataset}/{config}/{split}.parquet            row data (external)
//! {root}/{dataset}/{config}/{split}.ftsindex/
//! └── index.rkyv                                       search index artifact
//! ```
//!
//! Publication is a single object put of `index.rkyv`: readers either see
//! the previous complete artifact or the new complete artifact, never a
//! half-written one. Rebuilds replace the artifact wholesale.

use bytes::Bytes;
use object_store::PutPayload;
use tracing::info;

use crate::error::{Result, SearchError};
use crate::index::SearchIndex;
use crate::utils::store_access::get_object_store;

/// File name of the serialized index inside the `.ftsindex` directory.
pub const INDEX_FILE_NAME: &str = "index.rkyv";

/// Identity of one dataset split.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SplitRef {
    pub dataset: String,
    pub config: String,
    pub split: String,
}

impl SplitRef {
    pub fn new(dataset: &str, config: &str, split: &str) -> Self {
        SplitRef {
            dataset: dataset.to_string(),
            config: config.to_string(),
            split: split.to_string(),
        }
    }
}

impl std::fmt::Display for SplitRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.dataset, self.config, self.split)
    }
}

/// Resolves split-relative paths under a storage root and moves index
/// artifacts in and out of object storage.
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: String,
}

impl IndexStore {
    /// Creates a store rooted at a local directory, `s3://` url or
    /// `memory://` prefix. A trailing slash on the root is ignored.
    pub fn new(root: &str) -> Self {
        IndexStore {
            root: root.trim_end_matches('/').to_string(),
        }
    }

    /// Path of the split's Parquet row file.
    pub fn parquet_path(&self, split: &SplitRef) -> String {
        format!(
            "{}/{}/{}/{}.parquet",
            self.root, split.dataset, split.config, split.split
        )
    }

    /// Path of the split's index artifact.
    pub fn index_path(&self, split: &SplitRef) -> String {
        format!(
            "{}/{}/{}/{}.ftsindex/{}",
            self.root, split.dataset, split.config, split.split, INDEX_FILE_NAME
        )
    }

    /// Serializes and publishes an index artifact, replacing any previous
    /// one. The single put is the atomic swap point for readers.
    pub async fn save(&self, split: &SplitRef, index: &SearchIndex) -> Result<u64> {
        let bytes = index.to_bytes()?;
        let size = bytes.len() as u64;
        let path = self.index_path(split);
        let (store, obj_path) = get_object_store(&path).await?;
        store
            .put(&obj_path, PutPayload::from(Bytes::from(bytes)))
            .await?;
        info!(split = %split, size, partial = index.partial, "published index artifact");
        Ok(size)
    }

    /// Loads the index artifact for a split.
    ///
    /// A missing artifact maps to [`SearchError::IndexNotFound`] so callers
    /// can distinguish "not built yet" from storage failures.
    pub async fn load(&self, split: &SplitRef) -> Result<SearchIndex> {
        let path = self.index_path(split);
        let (store, obj_path) = get_object_store(&path).await?;
        let result = match store.get(&obj_path).await {
            Ok(r) => r,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(SearchError::IndexNotFound {
                    dataset: split.dataset.clone(),
                    config: split.config.clone(),
                    split: split.split.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let bytes = result.bytes().await?;
        SearchIndex::from_bytes(&bytes)
    }

    /// Quick existence check of the index artifact. Does not validate that
    /// the artifact is current with respect to the Parquet file.
    pub async fn index_exists(&self, split: &SplitRef) -> bool {
        match get_object_store(&self.index_path(split)).await {
            Ok((store, path)) => store.head(&path).await.is_ok(),
            Err(_) => false,
        }
    }

    /// Size in bytes of the stored artifact.
    pub async fn index_size(&self, split: &SplitRef) -> Result<u64> {
        let path = self.index_path(split);
        let (store, obj_path) = get_object_store(&path).await?;
        match store.head(&obj_path).await {
            Ok(meta) => Ok(meta.size),
            Err(object_store::Error::NotFound { .. }) => Err(SearchError::IndexNotFound {
                dataset: split.dataset.clone(),
                config: split.config.clone(),
                split: split.split.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
