use crate::traits::{validate_key, StorageError, StorageProvider, StorageResult, StoreOptions};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use stowage_core::models::Bucket;
use tokio::fs;

const CHECK_FILE: &str = ".stowage-connection-test";

/// Copies `source` to `dest`, returning the bytes written.
type CopyFn =
    Arc<dyn Fn(PathBuf, PathBuf) -> BoxFuture<'static, std::io::Result<u64>> + Send + Sync>;

fn fs_copy() -> CopyFn {
    Arc::new(|source, dest| Box::pin(async move { fs::copy(source, dest).await }))
}

/// Local filesystem provider
///
/// Each bucket maps to a root directory: the bucket's own `local_root`, else the
/// provider's default root.
#[derive(Clone)]
pub struct LocalProvider {
    default_root: PathBuf,
    copy: CopyFn,
}

impl LocalProvider {
    /// # Arguments
    /// * `default_root` - Root for buckets without their own (e.g., "priv/uploads")
    pub fn new(default_root: impl Into<PathBuf>) -> Self {
        Self {
            default_root: default_root.into(),
            copy: fs_copy(),
        }
    }

    /// Replace the copy step used by `store`.
    #[cfg(test)]
    fn with_copy(mut self, copy: CopyFn) -> Self {
        self.copy = copy;
        self
    }

    fn root(&self, bucket: &Bucket) -> PathBuf {
        bucket
            .local_root
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| self.default_root.clone())
    }

    /// Convert a remote path to a filesystem path under the bucket root.
    fn key_to_path(&self, bucket: &Bucket, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root(bucket).join(key))
    }

    async fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

/// Re-stat `dest` and compare against the size recorded before the copy.
async fn verify_copy(dest: &Path, expected: u64) -> StorageResult<u64> {
    let actual = fs::metadata(dest)
        .await
        .map_err(|e| StorageError::UploadFailed(format!("Failed to stat {}: {}", dest.display(), e)))?
        .len();
    if actual != expected {
        tracing::error!(
            path = %dest.display(),
            expected_bytes = expected,
            actual_bytes = actual,
            "Local storage copy truncated"
        );
        return Err(StorageError::SizeMismatch { expected, actual });
    }
    Ok(actual)
}

#[async_trait]
impl StorageProvider for LocalProvider {
    #[tracing::instrument(skip_all, fields(bucket.id = %bucket.id, key = %dest_path))]
    async fn store(
        &self,
        bucket: &Bucket,
        source: &Path,
        dest_path: &str,
        _opts: &StoreOptions,
    ) -> StorageResult<String> {
        let dest = self.key_to_path(bucket, dest_path)?;

        let expected = match fs::metadata(source).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return Err(StorageError::SourceMissing(source.display().to_string())),
        };

        Self::ensure_parent_dir(&dest).await?;

        let start = Instant::now();
        (self.copy)(source.to_path_buf(), dest.clone())
            .await
            .map_err(|e| {
                StorageError::UploadFailed(format!("Failed to copy to {}: {}", dest.display(), e))
            })?;

        let actual = match verify_copy(&dest, expected).await {
            Ok(actual) => actual,
            Err(e) => {
                // A short copy must not be mistaken for the file later.
                let _ = fs::remove_file(&dest).await;
                return Err(e);
            }
        };

        tracing::info!(
            path = %dest.display(),
            size_bytes = actual,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage store successful"
        );

        Ok(dest.display().to_string())
    }

    #[tracing::instrument(skip_all, fields(bucket.id = %bucket.id, key = %remote_path))]
    async fn retrieve(
        &self,
        bucket: &Bucket,
        remote_path: &str,
        dest: &Path,
    ) -> StorageResult<()> {
        let path = self.key_to_path(bucket, remote_path)?;
        let start = Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(remote_path.to_string()));
        }

        Self::ensure_parent_dir(dest).await?;
        let size = fs::copy(&path, dest).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage retrieve successful"
        );

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(bucket.id = %bucket.id, key = %remote_path))]
    async fn delete(&self, bucket: &Bucket, remote_path: &str) -> StorageResult<()> {
        let path = self.key_to_path(bucket, remote_path)?;
        let start = Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn exists(&self, bucket: &Bucket, remote_path: &str) -> bool {
        match self.key_to_path(bucket, remote_path) {
            Ok(path) => fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    fn public_url(&self, _bucket: &Bucket, _remote_path: &str) -> Option<String> {
        None
    }

    async fn test_connection(&self, bucket: &Bucket) -> StorageResult<()> {
        let root = self.root(bucket);
        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        let check = root.join(CHECK_FILE);
        fs::write(&check, b"ok").await?;
        let read_back = fs::read(&check).await?;
        fs::remove_file(&check).await?;

        if read_back != b"ok" {
            return Err(StorageError::BackendError(format!(
                "Check file under {} did not round-trip",
                root.display()
            )));
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use stowage_db::test_helpers::bucket;
    use tempfile::tempdir;

    fn local_bucket(root: &Path) -> Bucket {
        let mut b = bucket("disk", "local", 1);
        b.local_root = Some(root.display().to_string());
        b
    }

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let root = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let provider = LocalProvider::new("unused");
        let bucket = local_bucket(root.path());

        let source = scratch.path().join("in.txt");
        fs::write(&source, b"test data").await.unwrap();

        let stored = provider
            .store(&bucket, &source, "2024/05/in.txt", &StoreOptions::default())
            .await
            .unwrap();
        assert!(stored.ends_with("2024/05/in.txt"));
        assert!(provider.exists(&bucket, "2024/05/in.txt").await);

        let out = scratch.path().join("out/copy.txt");
        provider
            .retrieve(&bucket, "2024/05/in.txt", &out)
            .await
            .unwrap();
        assert_eq!(fs::read(&out).await.unwrap(), b"test data");
    }

    #[tokio::test]
    async fn test_default_root_used_when_bucket_has_none() {
        let root = tempdir().unwrap();
        let provider = LocalProvider::new(root.path());
        let bucket = bucket("disk", "local", 1);

        provider.test_connection(&bucket).await.unwrap();
        let source = root.path().join("src.bin");
        fs::write(&source, [1u8; 64]).await.unwrap();
        provider
            .store(&bucket, &source, "a/b.bin", &StoreOptions::default())
            .await
            .unwrap();
        assert!(root.path().join("a/b.bin").exists());
    }

    #[tokio::test]
    async fn test_missing_source() {
        let root = tempdir().unwrap();
        let provider = LocalProvider::new(root.path());
        let result = provider
            .store(
                &local_bucket(root.path()),
                &root.path().join("nope"),
                "x.txt",
                &StoreOptions::default(),
            )
            .await;
        assert!(matches!(result, Err(StorageError::SourceMissing(_))));
    }

    #[tokio::test]
    async fn test_truncated_copy_is_size_mismatch() {
        let root = tempdir().unwrap();
        let dest = root.path().join("short.bin");
        fs::write(&dest, [0u8; 10]).await.unwrap();

        let result = verify_copy(&dest, 20).await;
        assert!(matches!(
            result,
            Err(StorageError::SizeMismatch {
                expected: 20,
                actual: 10
            })
        ));
        assert_eq!(verify_copy(&dest, 10).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_store_with_short_copy_fails_and_leaves_nothing() {
        let root = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let truncating: CopyFn = Arc::new(|source, dest| {
            Box::pin(async move {
                let bytes = fs::read(&source).await?;
                fs::write(&dest, &bytes[..bytes.len() / 2]).await?;
                Ok((bytes.len() / 2) as u64)
            })
        });
        let provider = LocalProvider::new("unused").with_copy(truncating);
        let bucket = local_bucket(root.path());

        let source = scratch.path().join("clip.mp4");
        fs::write(&source, [9u8; 100]).await.unwrap();

        let result = provider
            .store(&bucket, &source, "2024/05/clip.mp4", &StoreOptions::default())
            .await;

        assert!(matches!(
            result,
            Err(StorageError::SizeMismatch {
                expected: 100,
                actual: 50
            })
        ));
        assert!(!provider.exists(&bucket, "2024/05/clip.mp4").await);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let root = tempdir().unwrap();
        let provider = LocalProvider::new(root.path());
        let bucket = local_bucket(root.path());

        let result = provider
            .retrieve(&bucket, "../../../etc/passwd", &root.path().join("x"))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = provider.delete(&bucket, "/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        assert!(!provider.exists(&bucket, "../etc/passwd").await);
    }

    #[tokio::test]
    async fn test_delete_nonexistent_is_ok() {
        let root = tempdir().unwrap();
        let provider = LocalProvider::new(root.path());
        let result = provider
            .delete(&local_bucket(root.path()), "nonexistent/file.txt")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_retrieve_missing_is_not_found() {
        let root = tempdir().unwrap();
        let provider = LocalProvider::new(root.path());
        let result = provider
            .retrieve(&local_bucket(root.path()), "missing.txt", &root.path().join("x"))
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert!(provider.public_url(&local_bucket(root.path()), "missing.txt").is_none());
    }
}
