//! Storage provider contract
//!
//! This module defines the StorageProvider trait that every backend implements.
//! Providers receive the bucket on every call; they hold no per-bucket state.

use async_trait::async_trait;
use std::path::Path;
use stowage_core::models::Bucket;
use stowage_core::AppError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No storage provider registered for backend '{0}'")]
    UnknownProvider(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Source file does not exist: {0}")]
    SourceMissing(String),

    #[error("Size mismatch after copy: expected {expected} bytes, found {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No storage buckets available")]
    NoBucketsAvailable,

    #[error("All {attempted} selected buckets failed, last error: {last_error}")]
    AllBucketsFailed { attempted: usize, last_error: String },

    #[error("File not found in any bucket: {0}")]
    NotFoundInAnyBucket(String),

    #[error("Repository error: {0}")]
    Repository(#[from] AppError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Per-write options passed through to the provider.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    pub content_type: Option<String>,
}

/// Storage provider contract
///
/// One implementation may serve several backend tags (the S3 provider serves
/// `s3`, `b2` and `r2`). Every fault is returned as a [`StorageError`].
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Copy `source` to `dest_path` in `bucket`, returning where it landed
    /// (a URL for remote backends, the absolute path for local ones).
    async fn store(
        &self,
        bucket: &Bucket,
        source: &Path,
        dest_path: &str,
        opts: &StoreOptions,
    ) -> StorageResult<String>;

    /// Download `remote_path` from `bucket` into the local file `dest`.
    async fn retrieve(&self, bucket: &Bucket, remote_path: &str, dest: &Path)
        -> StorageResult<()>;

    /// Delete `remote_path`. A missing file is not an error.
    async fn delete(&self, bucket: &Bucket, remote_path: &str) -> StorageResult<()>;

    /// Whether `remote_path` exists. Backend faults read as `false`.
    async fn exists(&self, bucket: &Bucket, remote_path: &str) -> bool;

    /// Public URL for `remote_path`, if the backend serves one.
    fn public_url(&self, bucket: &Bucket, remote_path: &str) -> Option<String>;

    /// Verify the bucket is reachable with its configured credentials.
    async fn test_connection(&self, bucket: &Bucket) -> StorageResult<()>;
}

/// Reject keys that could escape the bucket root.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|segment| segment == "..") {
        return Err(StorageError::InvalidKey(format!(
            "Storage key '{}' contains invalid characters",
            key
        )));
    }
    Ok(())
}
