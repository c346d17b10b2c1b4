//! Storage manager
//!
//! Writes a file to N buckets (N from the `storage_redundancy_copies` setting),
//! reads it back from the first bucket that has it, and deletes it everywhere.
//!
//! Writes and deletes always list enabled buckets fresh so a bucket disabled a
//! moment ago is not written to; reads go through the [`BucketCache`].

use futures::future::join_all;
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stowage_core::constants::{parse_redundancy, BUCKET_CACHE_TTL, SETTING_REDUNDANCY_COPIES};
use stowage_core::models::Bucket;
use stowage_db::traits::{BucketSource, SettingsSource};
use uuid::Uuid;

use crate::cache::BucketCache;
use crate::keys;
use crate::registry::ProviderRegistry;
use crate::traits::{StorageError, StorageResult, StoreOptions};

/// Options for [`StorageManager::store`].
#[derive(Debug, Clone, Default)]
pub struct StoreOpts {
    /// Write to exactly these buckets (first N, in this order).
    pub bucket_ids: Option<Vec<Uuid>>,
    /// Exact destination path.
    pub path: Option<String>,
    /// Directory joined with the source file name when `path` is unset.
    pub prefix: Option<String>,
    pub content_type: Option<String>,
}

/// Options for reads and deletes.
#[derive(Debug, Clone, Default)]
pub struct RetrieveOpts {
    /// Try exactly these buckets, in this order.
    pub bucket_ids: Option<Vec<Uuid>>,
}

impl RetrieveOpts {
    pub fn buckets(ids: Vec<Uuid>) -> Self {
        Self {
            bucket_ids: Some(ids),
        }
    }
}

/// Result of a redundant write.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOutcome {
    pub path: String,
    /// Buckets attempted.
    pub stored_in: usize,
    /// Buckets that hold the file now.
    pub successful_storages: usize,
    /// Ids of the successful buckets, in selection order.
    pub bucket_ids: Vec<Uuid>,
    pub urls: Vec<String>,
}

impl StoreOutcome {
    /// Whether at least `min` copies were written.
    pub fn meets(&self, min: usize) -> bool {
        self.successful_storages >= min
    }

    pub fn is_complete(&self) -> bool {
        self.successful_storages == self.stored_in
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub attempted: usize,
    pub succeeded: usize,
}

/// Per-bucket connectivity result.
#[derive(Debug)]
pub struct ConnectionCheck {
    pub bucket_id: Uuid,
    pub bucket_name: String,
    pub provider: String,
    pub result: StorageResult<()>,
    pub duration: Duration,
}

/// Write selection: fixed priorities ascending, then auto-priority buckets shuffled.
pub fn write_order<R: Rng + ?Sized>(buckets: Vec<Bucket>, rng: &mut R) -> Vec<Bucket> {
    let (mut fixed, mut auto): (Vec<Bucket>, Vec<Bucket>) =
        buckets.into_iter().partition(|b| !b.is_auto_priority());
    fixed.sort_by_key(|b| (b.priority, b.id));
    auto.shuffle(rng);
    fixed.extend(auto);
    fixed
}

/// Read order: deterministic, fixed priorities ascending, auto last.
pub fn read_order(mut buckets: Vec<Bucket>) -> Vec<Bucket> {
    buckets.sort_by_key(|b| b.read_order_key());
    buckets
}

pub struct StorageManager {
    buckets: Arc<dyn BucketSource>,
    settings: Arc<dyn SettingsSource>,
    registry: Arc<ProviderRegistry>,
    cache: BucketCache,
}

impl StorageManager {
    pub fn new(
        buckets: Arc<dyn BucketSource>,
        settings: Arc<dyn SettingsSource>,
        registry: ProviderRegistry,
    ) -> Self {
        Self {
            buckets,
            settings,
            registry: Arc::new(registry),
            cache: BucketCache::new(BUCKET_CACHE_TTL),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = BucketCache::new(ttl);
        self
    }

    /// Configured copy count, clamped to 1-5.
    pub async fn redundancy_copies(&self) -> usize {
        match self.settings.get_setting(SETTING_REDUNDANCY_COPIES).await {
            Ok(value) => parse_redundancy(value.as_deref()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read redundancy setting, using default");
                parse_redundancy(None)
            }
        }
    }

    /// Enabled buckets through the cache.
    async fn cached_enabled(&self) -> StorageResult<Arc<Vec<Bucket>>> {
        if let Some(buckets) = self.cache.get().await {
            return Ok(buckets);
        }
        let fresh = self.buckets.list_enabled().await?;
        tracing::debug!(count = fresh.len(), "Bucket cache refreshed");
        Ok(self.cache.put(fresh).await)
    }

    async fn select_for_write(&self, explicit: Option<&[Uuid]>) -> StorageResult<Vec<Bucket>> {
        let copies = self.redundancy_copies().await;
        let candidates = match explicit {
            Some(ids) => self.buckets.get_many(ids).await?,
            None => {
                let enabled = self.buckets.list_enabled().await?;
                write_order(enabled, &mut rand::rng())
            }
        };
        Ok(candidates.into_iter().take(copies).collect())
    }

    /// Buckets to try for a read, in order.
    pub async fn read_candidates(&self, explicit: Option<&[Uuid]>) -> StorageResult<Vec<Bucket>> {
        match explicit {
            Some(ids) => Ok(self.buckets.get_many(ids).await?),
            None => Ok(read_order(self.cached_enabled().await?.as_ref().clone())),
        }
    }

    async fn delete_candidates(&self, explicit: Option<&[Uuid]>) -> StorageResult<Vec<Bucket>> {
        match explicit {
            Some(ids) => Ok(self.buckets.get_many(ids).await?),
            None => Ok(read_order(self.buckets.list_enabled().await?)),
        }
    }

    /// Write `source` to the selected buckets concurrently.
    ///
    /// Succeeds if any bucket took the file; use [`StoreOutcome::meets`] to
    /// enforce a stricter minimum.
    #[tracing::instrument(skip_all, fields(source = %source.display()))]
    pub async fn store(&self, source: &Path, opts: &StoreOpts) -> StorageResult<StoreOutcome> {
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::SourceMissing(source.display().to_string()))?;

        let path = match (&opts.path, &opts.prefix) {
            (Some(path), _) => path.clone(),
            (None, Some(prefix)) => keys::join(prefix, file_name),
            (None, None) => keys::generate_path(file_name),
        };

        let selected = self.select_for_write(opts.bucket_ids.as_deref()).await?;
        if selected.is_empty() {
            return Err(StorageError::NoBucketsAvailable);
        }

        let provider_opts = StoreOptions {
            content_type: opts.content_type.clone(),
        };
        let start = Instant::now();

        let attempts = selected.iter().map(|bucket| {
            let path = path.as_str();
            let provider_opts = &provider_opts;
            async move {
                let result = match self.registry.get(&bucket.provider) {
                    Ok(provider) => provider.store(bucket, source, path, provider_opts).await,
                    Err(e) => Err(e),
                };
                (bucket, result)
            }
        });
        let results = join_all(attempts).await;

        let mut bucket_ids = Vec::new();
        let mut urls = Vec::new();
        let mut last_error = None;
        for (bucket, result) in results {
            match result {
                Ok(url) => {
                    bucket_ids.push(bucket.id);
                    urls.push(url);
                }
                Err(e) => {
                    tracing::warn!(
                        bucket.id = %bucket.id,
                        bucket.name = %bucket.name,
                        error = %e,
                        "Store failed on bucket"
                    );
                    last_error = Some(e.to_string());
                }
            }
        }

        if bucket_ids.is_empty() {
            return Err(StorageError::AllBucketsFailed {
                attempted: selected.len(),
                last_error: last_error.unwrap_or_default(),
            });
        }

        let outcome = StoreOutcome {
            path,
            stored_in: selected.len(),
            successful_storages: bucket_ids.len(),
            bucket_ids,
            urls,
        };

        tracing::info!(
            path = %outcome.path,
            stored_in = outcome.stored_in,
            successful_storages = outcome.successful_storages,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File stored"
        );

        Ok(outcome)
    }

    /// Download `path` into `dest` from the first bucket that has it.
    ///
    /// Returns the id of the bucket that served the file.
    #[tracing::instrument(skip_all, fields(path = %path))]
    pub async fn retrieve(&self, path: &str, dest: &Path, opts: &RetrieveOpts) -> StorageResult<Uuid> {
        let candidates = self.read_candidates(opts.bucket_ids.as_deref()).await?;

        for bucket in &candidates {
            let result = match self.registry.get(&bucket.provider) {
                Ok(provider) => provider.retrieve(bucket, path, dest).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => {
                    tracing::debug!(bucket.id = %bucket.id, "File retrieved");
                    return Ok(bucket.id);
                }
                Err(e) => {
                    tracing::warn!(
                        bucket.id = %bucket.id,
                        bucket.name = %bucket.name,
                        error = %e,
                        "Retrieve failed, trying next bucket"
                    );
                }
            }
        }

        Err(StorageError::NotFoundInAnyBucket(path.to_string()))
    }

    /// Delete `path` from every selected bucket.
    #[tracing::instrument(skip_all, fields(path = %path))]
    pub async fn delete(&self, path: &str, opts: &RetrieveOpts) -> StorageResult<DeleteOutcome> {
        let candidates = self.delete_candidates(opts.bucket_ids.as_deref()).await?;
        if candidates.is_empty() {
            return Err(StorageError::NoBucketsAvailable);
        }

        let attempts = candidates.iter().map(|bucket| async move {
            let result = match self.registry.get(&bucket.provider) {
                Ok(provider) => provider.delete(bucket, path).await,
                Err(e) => Err(e),
            };
            (bucket, result)
        });

        let mut succeeded = 0;
        let mut last_error = None;
        for (bucket, result) in join_all(attempts).await {
            match result {
                Ok(()) => succeeded += 1,
                Err(e) => {
                    tracing::warn!(bucket.id = %bucket.id, error = %e, "Delete failed on bucket");
                    last_error = Some(e.to_string());
                }
            }
        }

        if succeeded == 0 {
            return Err(StorageError::AllBucketsFailed {
                attempted: candidates.len(),
                last_error: last_error.unwrap_or_default(),
            });
        }

        Ok(DeleteOutcome {
            attempted: candidates.len(),
            succeeded,
        })
    }

    pub async fn exists(&self, path: &str, opts: &RetrieveOpts) -> StorageResult<bool> {
        for bucket in self.read_candidates(opts.bucket_ids.as_deref()).await? {
            if let Ok(provider) = self.registry.get(&bucket.provider) {
                if provider.exists(&bucket, path).await {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// URL from the first bucket (read order) that has the file and serves URLs.
    pub async fn public_url(&self, path: &str, opts: &RetrieveOpts) -> StorageResult<Option<String>> {
        for bucket in self.read_candidates(opts.bucket_ids.as_deref()).await? {
            let provider = match self.registry.get(&bucket.provider) {
                Ok(provider) => provider,
                Err(e) => {
                    tracing::warn!(bucket.id = %bucket.id, error = %e, "Skipping bucket");
                    continue;
                }
            };
            let Some(url) = provider.public_url(&bucket, path) else {
                continue;
            };
            if provider.exists(&bucket, path).await {
                return Ok(Some(url));
            }
        }
        Ok(None)
    }

    /// Run `test_connection` against every enabled bucket.
    pub async fn test_connections(&self) -> StorageResult<Vec<ConnectionCheck>> {
        let buckets = read_order(self.buckets.list_enabled().await?);

        let checks = buckets.into_iter().map(|bucket| async move {
            let start = Instant::now();
            let result = match self.registry.get(&bucket.provider) {
                Ok(provider) => provider.test_connection(&bucket).await,
                Err(e) => Err(e),
            };
            ConnectionCheck {
                bucket_id: bucket.id,
                bucket_name: bucket.name,
                provider: bucket.provider,
                result,
                duration: start.elapsed(),
            }
        });

        Ok(join_all(checks).await)
    }

    pub async fn invalidate_cache(&self) {
        self.cache.invalidate().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MemoryProvider;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use stowage_db::test_helpers::{bucket, InMemoryRepository};
    use tempfile::tempdir;

    fn manager(repo: &InMemoryRepository, provider: &MemoryProvider) -> StorageManager {
        let mut registry = ProviderRegistry::new();
        registry.register_tag("memory", Arc::new(provider.clone()));
        StorageManager::new(Arc::new(repo.clone()), Arc::new(repo.clone()), registry)
    }

    fn source_file(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("photo.jpg");
        std::fs::write(&path, b"jpeg bytes").unwrap();
        path
    }

    #[test]
    fn test_write_order_fixed_then_auto() {
        let a = bucket("a", "memory", 1);
        let z = bucket("z", "memory", 9);
        let b = bucket("b", "memory", 0);
        let c = bucket("c", "memory", 0);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let order = write_order(
                vec![b.clone(), z.clone(), c.clone(), a.clone()],
                &mut rng,
            );
            let names: Vec<&str> = order.iter().map(|b| b.name.as_str()).collect();
            assert_eq!(&names[..2], &["a", "z"]);
            assert!(names[2..].contains(&"b") && names[2..].contains(&"c"));
        }
    }

    #[tokio::test]
    async fn test_redundancy_selects_fixed_then_one_auto() {
        let repo = InMemoryRepository::new();
        let provider = MemoryProvider::new();
        let a = bucket("A", "memory", 1);
        let b = bucket("B", "memory", 0);
        let c = bucket("C", "memory", 0);
        for x in [&a, &b, &c] {
            repo.add_bucket(x.clone());
        }
        repo.set_setting(SETTING_REDUNDANCY_COPIES, "2");
        let manager = manager(&repo, &provider);
        let dir = tempdir().unwrap();
        let source = source_file(dir.path());

        for _ in 0..10 {
            let outcome = manager.store(&source, &StoreOpts::default()).await.unwrap();
            assert_eq!(outcome.stored_in, 2);
            assert_eq!(outcome.successful_storages, 2);
            assert_eq!(outcome.bucket_ids[0], a.id);
            assert!(outcome.bucket_ids[1] == b.id || outcome.bucket_ids[1] == c.id);
            assert!(outcome.path.starts_with("photo_"));
            assert!(outcome.path.ends_with(".jpg"));
        }
    }

    #[tokio::test]
    async fn test_partial_failure_is_success_with_counts() {
        let repo = InMemoryRepository::new();
        let provider = MemoryProvider::new();
        let a = bucket("A", "memory", 1);
        let b = bucket("B", "memory", 2);
        repo.add_bucket(a.clone());
        repo.add_bucket(b.clone());
        repo.set_setting(SETTING_REDUNDANCY_COPIES, "2");
        provider.fail_bucket(a.id);
        let manager = manager(&repo, &provider);
        let dir = tempdir().unwrap();

        let outcome = manager
            .store(
                &source_file(dir.path()),
                &StoreOpts {
                    prefix: Some("2024/05".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.path, "2024/05/photo.jpg");
        assert_eq!(outcome.stored_in, 2);
        assert_eq!(outcome.successful_storages, 1);
        assert_eq!(outcome.bucket_ids, vec![b.id]);
        assert!(outcome.meets(1));
        assert!(!outcome.meets(2));
        assert!(!outcome.is_complete());
    }

    #[tokio::test]
    async fn test_all_failed_and_none_available() {
        let repo = InMemoryRepository::new();
        let provider = MemoryProvider::new();
        let manager = manager(&repo, &provider);
        let dir = tempdir().unwrap();
        let source = source_file(dir.path());

        let result = manager.store(&source, &StoreOpts::default()).await;
        assert!(matches!(result, Err(StorageError::NoBucketsAvailable)));

        let a = bucket("A", "memory", 1);
        repo.add_bucket(a.clone());
        provider.fail_bucket(a.id);
        let result = manager.store(&source, &StoreOpts::default()).await;
        assert!(matches!(
            result,
            Err(StorageError::AllBucketsFailed { attempted: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_provider_counts_as_failed_bucket() {
        let repo = InMemoryRepository::new();
        let provider = MemoryProvider::new();
        let ftp = bucket("F", "ftp", 1);
        let mem = bucket("M", "memory", 2);
        repo.add_bucket(ftp);
        repo.add_bucket(mem.clone());
        repo.set_setting(SETTING_REDUNDANCY_COPIES, "2");
        let manager = manager(&repo, &provider);
        let dir = tempdir().unwrap();

        let outcome = manager
            .store(&source_file(dir.path()), &StoreOpts::default())
            .await
            .unwrap();
        assert_eq!(outcome.bucket_ids, vec![mem.id]);
    }

    #[tokio::test]
    async fn test_explicit_buckets_are_used_in_order() {
        let repo = InMemoryRepository::new();
        let provider = MemoryProvider::new();
        let a = bucket("A", "memory", 1);
        let b = bucket("B", "memory", 2);
        let c = bucket("C", "memory", 3);
        for x in [&a, &b, &c] {
            repo.add_bucket(x.clone());
        }
        repo.set_setting(SETTING_REDUNDANCY_COPIES, "1");
        let manager = manager(&repo, &provider);
        let dir = tempdir().unwrap();

        let outcome = manager
            .store(
                &source_file(dir.path()),
                &StoreOpts {
                    bucket_ids: Some(vec![c.id, b.id]),
                    path: Some("fixed/name.jpg".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.bucket_ids, vec![c.id]);
        assert_eq!(outcome.path, "fixed/name.jpg");
        assert!(provider.contains(c.id, "fixed/name.jpg"));
        assert!(!provider.contains(a.id, "fixed/name.jpg"));
    }

    #[tokio::test]
    async fn test_retrieve_fails_over_and_stops_at_first_success() {
        let repo = InMemoryRepository::new();
        let provider = MemoryProvider::new();
        let b1 = bucket("B1", "memory", 1);
        let b2 = bucket("B2", "memory", 2);
        let b3 = bucket("B3", "memory", 3);
        for x in [&b1, &b2, &b3] {
            repo.add_bucket(x.clone());
            provider.put(x.id, "a/b.txt", b"payload");
        }
        provider.fail_bucket(b1.id);
        let manager = manager(&repo, &provider);
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.txt");

        let served_by = manager
            .retrieve("a/b.txt", &dest, &RetrieveOpts::default())
            .await
            .unwrap();

        assert_eq!(served_by, b2.id);
        assert_eq!(provider.calls("retrieve"), vec![b1.id, b2.id]);
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_retrieve_exhausted() {
        let repo = InMemoryRepository::new();
        let provider = MemoryProvider::new();
        repo.add_bucket(bucket("B1", "memory", 1));
        let manager = manager(&repo, &provider);
        let dir = tempdir().unwrap();

        let result = manager
            .retrieve("missing.txt", &dir.path().join("x"), &RetrieveOpts::default())
            .await;
        assert!(matches!(result, Err(StorageError::NotFoundInAnyBucket(_))));
    }

    #[tokio::test]
    async fn test_reads_use_cache_until_invalidated() {
        let repo = InMemoryRepository::new();
        let provider = MemoryProvider::new();
        let b1 = bucket("B1", "memory", 1);
        repo.add_bucket(b1.clone());
        let manager = manager(&repo, &provider);

        manager.exists("x", &RetrieveOpts::default()).await.unwrap();
        manager.exists("x", &RetrieveOpts::default()).await.unwrap();
        assert_eq!(repo.bucket_list_calls(), 1);

        // A disabled bucket stays visible to reads until the cache refreshes.
        provider.put(b1.id, "x", b"1");
        repo.set_bucket_enabled(b1.id, false);
        assert!(manager.exists("x", &RetrieveOpts::default()).await.unwrap());

        manager.invalidate_cache().await;
        assert!(!manager.exists("x", &RetrieveOpts::default()).await.unwrap());
        assert_eq!(repo.bucket_list_calls(), 2);
    }

    #[tokio::test]
    async fn test_cache_refreshes_after_ttl() {
        let repo = InMemoryRepository::new();
        let provider = MemoryProvider::new();
        repo.add_bucket(bucket("B1", "memory", 1));
        let manager = manager(&repo, &provider).with_cache_ttl(Duration::from_millis(20));

        manager.exists("x", &RetrieveOpts::default()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        manager.exists("x", &RetrieveOpts::default()).await.unwrap();
        assert_eq!(repo.bucket_list_calls(), 2);
    }

    #[tokio::test]
    async fn test_writes_bypass_cache() {
        let repo = InMemoryRepository::new();
        let provider = MemoryProvider::new();
        let b1 = bucket("B1", "memory", 1);
        let b2 = bucket("B2", "memory", 2);
        repo.add_bucket(b1.clone());
        repo.add_bucket(b2.clone());
        let manager = manager(&repo, &provider);
        let dir = tempdir().unwrap();

        manager.exists("warm", &RetrieveOpts::default()).await.unwrap();
        repo.set_bucket_enabled(b1.id, false);

        let outcome = manager
            .store(&source_file(dir.path()), &StoreOpts::default())
            .await
            .unwrap();
        assert_eq!(outcome.bucket_ids, vec![b2.id]);
    }

    #[tokio::test]
    async fn test_delete_counts() {
        let repo = InMemoryRepository::new();
        let provider = MemoryProvider::new();
        let b1 = bucket("B1", "memory", 1);
        let b2 = bucket("B2", "memory", 2);
        repo.add_bucket(b1.clone());
        repo.add_bucket(b2.clone());
        provider.put(b2.id, "a.txt", b"x");
        provider.fail_bucket(b1.id);
        let manager = manager(&repo, &provider);

        let outcome = manager
            .delete("a.txt", &RetrieveOpts::default())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            DeleteOutcome {
                attempted: 2,
                succeeded: 1
            }
        );
        assert!(!provider.contains(b2.id, "a.txt"));

        provider.fail_bucket(b2.id);
        let result = manager.delete("a.txt", &RetrieveOpts::default()).await;
        assert!(matches!(result, Err(StorageError::AllBucketsFailed { .. })));
    }

    #[tokio::test]
    async fn test_public_url_skips_buckets_without_urls() {
        let repo = InMemoryRepository::new();
        let no_urls = MemoryProvider::new();
        let with_urls = MemoryProvider::with_public_urls("https://cdn.test");
        let local = bucket("disk", "nourl", 1);
        let remote = bucket("remote", "withurl", 2);
        repo.add_bucket(local.clone());
        repo.add_bucket(remote.clone());
        no_urls.put(local.id, "a.jpg", b"x");
        with_urls.put(remote.id, "a.jpg", b"x");

        let mut registry = ProviderRegistry::new();
        registry.register_tag("nourl", Arc::new(no_urls));
        registry.register_tag("withurl", Arc::new(with_urls));
        let manager = StorageManager::new(Arc::new(repo.clone()), Arc::new(repo), registry);

        assert_eq!(
            manager
                .public_url("a.jpg", &RetrieveOpts::default())
                .await
                .unwrap()
                .as_deref(),
            Some("https://cdn.test/remote/a.jpg")
        );
        assert_eq!(
            manager
                .public_url("missing.jpg", &RetrieveOpts::default())
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_connections_report_per_bucket() {
        let repo = InMemoryRepository::new();
        let provider = MemoryProvider::new();
        let ok = bucket("ok", "memory", 1);
        let bad = bucket("bad", "memory", 2);
        let unknown = bucket("odd", "ftp", 3);
        for x in [&ok, &bad, &unknown] {
            repo.add_bucket(x.clone());
        }
        provider.fail_bucket(bad.id);
        let manager = manager(&repo, &provider);

        let checks = manager.test_connections().await.unwrap();
        assert_eq!(checks.len(), 3);
        assert!(checks[0].result.is_ok());
        assert!(checks[1].result.is_err());
        assert!(matches!(
            checks[2].result,
            Err(StorageError::UnknownProvider(_))
        ));
    }
}
