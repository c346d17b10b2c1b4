//! Bucket repository: read access to storage_buckets.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use std::collections::HashMap;
use stowage_core::models::Bucket;
use stowage_core::AppError;
use uuid::Uuid;

use crate::traits::BucketSource;

const BUCKET_COLUMNS: &str = "id, name, provider, region, endpoint, bucket_name, access_key_id, \
     secret_access_key, cdn_url, local_root, priority, enabled, max_size_mb, inserted_at, updated_at";

#[derive(Clone)]
pub struct BucketRepository {
    pool: PgPool,
}

impl BucketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BucketSource for BucketRepository {
    #[tracing::instrument(skip(self), fields(db.table = "storage_buckets"))]
    async fn list_enabled(&self) -> Result<Vec<Bucket>, AppError> {
        let buckets = sqlx::query_as::<Postgres, Bucket>(&format!(
            "SELECT {} FROM storage_buckets WHERE enabled = TRUE",
            BUCKET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(buckets)
    }

    #[tracing::instrument(skip(self, ids), fields(db.table = "storage_buckets", count = ids.len()))]
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Bucket>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<Postgres, Bucket>(&format!(
            "SELECT {} FROM storage_buckets WHERE id = ANY($1)",
            BUCKET_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_id: HashMap<Uuid, Bucket> = rows.into_iter().map(|b| (b.id, b)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}
