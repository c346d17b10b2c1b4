//! In-memory storage provider for testing
//!
//! Objects are kept per (bucket id, path). Individual buckets can be made to fail
//! every call to exercise redundancy and failover.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use stowage_core::models::Bucket;
use uuid::Uuid;

use crate::traits::{validate_key, StorageError, StorageProvider, StorageResult, StoreOptions};

#[derive(Clone, Default)]
pub struct MemoryProvider {
    objects: Arc<Mutex<HashMap<(Uuid, String), Vec<u8>>>>,
    failing: Arc<Mutex<HashSet<Uuid>>>,
    calls: Arc<Mutex<Vec<(&'static str, Uuid)>>>,
    url_base: Option<String>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve public URLs as `{base}/{bucket name}/{path}`.
    pub fn with_public_urls(base: &str) -> Self {
        Self {
            url_base: Some(base.trim_end_matches('/').to_string()),
            ..Self::default()
        }
    }

    /// Make every call against `bucket_id` fail with a backend error.
    pub fn fail_bucket(&self, bucket_id: Uuid) {
        self.failing.lock().unwrap().insert(bucket_id);
    }

    /// Seed an object directly.
    pub fn put(&self, bucket_id: Uuid, path: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket_id, path.to_string()), data.to_vec());
    }

    pub fn contains(&self, bucket_id: Uuid, path: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(bucket_id, path.to_string()))
    }

    /// Bucket ids that received `op` (`store`, `retrieve`, `delete`, ...), in call order.
    pub fn calls(&self, op: &str) -> Vec<Uuid> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| *o == op)
            .map(|(_, id)| *id)
            .collect()
    }

    fn enter(&self, op: &'static str, bucket: &Bucket) -> StorageResult<()> {
        self.calls.lock().unwrap().push((op, bucket.id));
        if self.failing.lock().unwrap().contains(&bucket.id) {
            return Err(StorageError::BackendError(format!(
                "bucket {} is unavailable",
                bucket.name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageProvider for MemoryProvider {
    async fn store(
        &self,
        bucket: &Bucket,
        source: &Path,
        dest_path: &str,
        _opts: &StoreOptions,
    ) -> StorageResult<String> {
        self.enter("store", bucket)?;
        validate_key(dest_path)?;
        let data = tokio::fs::read(source)
            .await
            .map_err(|_| StorageError::SourceMissing(source.display().to_string()))?;
        self.put(bucket.id, dest_path, &data);
        Ok(format!("memory://{}/{}", bucket.name, dest_path))
    }

    async fn retrieve(
        &self,
        bucket: &Bucket,
        remote_path: &str,
        dest: &Path,
    ) -> StorageResult<()> {
        self.enter("retrieve", bucket)?;
        let data = self
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.id, remote_path.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(remote_path.to_string()))?;
        tokio::fs::write(dest, data).await?;
        Ok(())
    }

    async fn delete(&self, bucket: &Bucket, remote_path: &str) -> StorageResult<()> {
        self.enter("delete", bucket)?;
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.id, remote_path.to_string()));
        Ok(())
    }

    async fn exists(&self, bucket: &Bucket, remote_path: &str) -> bool {
        self.enter("exists", bucket).is_ok() && self.contains(bucket.id, remote_path)
    }

    fn public_url(&self, bucket: &Bucket, remote_path: &str) -> Option<String> {
        self.url_base
            .as_ref()
            .map(|base| format!("{}/{}/{}", base, bucket.name, remote_path))
    }

    async fn test_connection(&self, bucket: &Bucket) -> StorageResult<()> {
        self.enter("test_connection", bucket)
    }
}
