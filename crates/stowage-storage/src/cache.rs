//! Enabled-bucket list cache
//!
//! Read paths (retrieve, exists, public_url) tolerate a stale list, so the
//! enabled buckets are cached for a fixed TTL measured on the monotonic clock.
//! The cached value is only ever replaced whole.

use std::sync::Arc;
use std::time::{Duration, Instant};
use stowage_core::models::Bucket;
use tokio::sync::RwLock;

struct Entry {
    loaded_at: Instant,
    buckets: Arc<Vec<Bucket>>,
}

pub struct BucketCache {
    ttl: Duration,
    entry: RwLock<Option<Entry>>,
}

impl BucketCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// Cached list, if loaded within the TTL.
    pub async fn get(&self) -> Option<Arc<Vec<Bucket>>> {
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|e| e.loaded_at.elapsed() < self.ttl)
            .map(|e| Arc::clone(&e.buckets))
    }

    pub async fn put(&self, buckets: Vec<Bucket>) -> Arc<Vec<Bucket>> {
        let buckets = Arc::new(buckets);
        *self.entry.write().await = Some(Entry {
            loaded_at: Instant::now(),
            buckets: Arc::clone(&buckets),
        });
        buckets
    }

    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }
}
