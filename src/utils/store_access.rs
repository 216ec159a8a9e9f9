//! Unified object store access for local paths, S3 and in-memory storage.
//!
//! Every file the crate touches (Parquet splits, index artifacts) goes
//! through [`get_object_store`], which resolves a path string to an
//! [`ObjectStore`] implementation plus the path within it:
//!
//! * `s3://bucket/key` (optionally `?anon=true` for public buckets): S3,
//!   with stores cached per (bucket, anonymous) so credentials are fetched
//!   once per process.
//! * `memory://key`: a process-global in-memory store, used by the test
//!   suite to exercise full build/search cycles without a filesystem.
//! * anything else: the local filesystem, with relative paths resolved
//!   against the current directory.

use std::sync::Arc;

use dashmap::DashMap;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, aws::AmazonS3Builder, local::LocalFileSystem};
use once_cell::sync::Lazy;
use url::Url;

use crate::error::{Result, SearchError};

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
struct S3CacheKey {
    bucket: String,
    anonymous: bool,
}

/// S3 stores cached per (bucket, anonymous). Creating a store involves
/// credential resolution, which is too slow to repeat per request. The AWS
/// credential chain refreshes expiring credentials behind the cached store.
static S3_STORE_CACHE: Lazy<DashMap<S3CacheKey, Arc<dyn ObjectStore>>> = Lazy::new(DashMap::new);

/// One shared in-memory store for the whole process. `memory://` paths all
/// resolve into this store, so bytes registered by one component (e.g. a
/// test writing a Parquet split) are visible to every other.
static MEMORY_STORE: Lazy<Arc<InMemory>> = Lazy::new(|| Arc::new(InMemory::new()));

fn s3_store(bucket: &str, anonymous: bool) -> Result<Arc<dyn ObjectStore>> {
    let key = S3CacheKey {
        bucket: bucket.to_string(),
        anonymous,
    };
    let entry = S3_STORE_CACHE.entry(key);
    let store = entry.or_try_insert_with(|| -> Result<Arc<dyn ObjectStore>> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
        if anonymous {
            builder = builder.with_skip_signature(true);
        }
        Ok(Arc::new(builder.build()?))
    })?;
    Ok(Arc::clone(store.value()))
}

/// Resolves a path string to an object store and the path within it.
pub async fn get_object_store(file_path: &str) -> Result<(Arc<dyn ObjectStore>, ObjectPath)> {
    if let Some(key) = file_path.strip_prefix("memory://") {
        let store: Arc<dyn ObjectStore> = MEMORY_STORE.clone();
        return Ok((store, ObjectPath::from(key)));
    }

    if file_path.starts_with("s3://") {
        let url = Url::parse(file_path)?;
        let bucket = url
            .host_str()
            .ok_or_else(|| SearchError::Validation("S3 url has no bucket".to_string()))?;
        let key = url.path().trim_start_matches('/');
        let anonymous = url
            .query_pairs()
            .any(|(k, v)| k == "anon" && (v == "true" || v == "1"));

        let store = s3_store(bucket, anonymous)?;
        return Ok((store, ObjectPath::from(key)));
    }

    let std_path = std::path::Path::new(file_path);
    let absolute = if std_path.is_absolute() {
        std_path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| SearchError::StreamRead(format!("cannot resolve working directory: {e}")))?
            .join(std_path)
    };
    let relative = absolute.to_string_lossy().trim_start_matches('/').to_string();

    let local = LocalFileSystem::new_with_prefix("/")?;
    let store: Arc<dyn ObjectStore> = Arc::new(local);
    Ok((store, ObjectPath::from(relative)))
}

/// Registers bytes at a `memory://` path, for tests and in-memory builds.
pub async fn register_memory_bytes(path: &str, data: bytes::Bytes) -> Result<()> {
    let key = path.strip_prefix("memory://").ok_or_else(|| {
        SearchError::Validation(format!("'{path}' is not a memory:// path"))
    })?;
    MEMORY_STORE
        .put(&ObjectPath::from(key), object_store::PutPayload::from(data))
        .await?;
    Ok(())
}
