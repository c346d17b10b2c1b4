//! File instance repository: storage_file_instances and storage_file_locations.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use stowage_core::models::{FileInstance, FileLocation, InstanceStatus, NewFileInstance};
use stowage_core::AppError;
use uuid::Uuid;

use crate::traits::InstanceStore;
use crate::transaction::TransactionGuard;

const INSTANCE_COLUMNS: &str = "id, file_id, variant_name, file_name, mime_type, ext, checksum, \
     size, width, height, status, inserted_at";

#[derive(Clone)]
pub struct FileInstanceRepository {
    pool: PgPool,
}

impl FileInstanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstanceStore for FileInstanceRepository {
    #[tracing::instrument(skip(self), fields(db.table = "storage_file_instances"))]
    async fn find_instance(
        &self,
        file_id: Uuid,
        variant_name: &str,
    ) -> Result<Option<FileInstance>, AppError> {
        let instance = sqlx::query_as::<Postgres, FileInstance>(&format!(
            "SELECT {} FROM storage_file_instances WHERE file_id = $1 AND variant_name = $2",
            INSTANCE_COLUMNS
        ))
        .bind(file_id)
        .bind(variant_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(instance)
    }

    #[tracing::instrument(
        skip(self, instance),
        fields(db.table = "storage_file_instances", file_id = %instance.file_id, variant = %instance.variant_name)
    )]
    async fn insert_instance(
        &self,
        instance: NewFileInstance,
    ) -> Result<(FileInstance, bool), AppError> {
        let inserted = sqlx::query_as::<Postgres, FileInstance>(&format!(
            r#"
            INSERT INTO storage_file_instances
                (file_id, variant_name, file_name, mime_type, ext, checksum, size, width, height, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (file_id, variant_name) DO NOTHING
            RETURNING {}
            "#,
            INSTANCE_COLUMNS
        ))
        .bind(instance.file_id)
        .bind(&instance.variant_name)
        .bind(&instance.file_name)
        .bind(&instance.mime_type)
        .bind(&instance.ext)
        .bind(&instance.checksum)
        .bind(instance.size)
        .bind(instance.width)
        .bind(instance.height)
        .bind(InstanceStatus::Completed)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((row, true));
        }

        // Lost the race to a concurrent insert of the same variant.
        let existing = self
            .find_instance(instance.file_id, &instance.variant_name)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "instance {} for file {} vanished after conflict",
                    instance.variant_name, instance.file_id
                ))
            })?;
        Ok((existing, false))
    }

    #[tracing::instrument(skip(self), fields(db.table = "storage_file_instances", db.record_id = %instance_id))]
    async fn delete_instance(&self, instance_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM storage_file_instances WHERE id = $1")
            .bind(instance_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, bucket_ids), fields(db.table = "storage_file_locations", count = bucket_ids.len()))]
    async fn create_locations(
        &self,
        instance_id: Uuid,
        bucket_ids: &[Uuid],
        path: &str,
    ) -> Result<Vec<FileLocation>, AppError> {
        if bucket_ids.is_empty() {
            return Err(AppError::InvalidInput(
                "an instance needs at least one location".to_string(),
            ));
        }

        let mut tx = TransactionGuard::begin(&self.pool).await?;
        let mut locations = Vec::with_capacity(bucket_ids.len());
        for bucket_id in bucket_ids {
            let location = sqlx::query_as::<Postgres, FileLocation>(
                r#"
                INSERT INTO storage_file_locations (file_instance_id, bucket_id, path)
                VALUES ($1, $2, $3)
                RETURNING id, file_instance_id, bucket_id, path, inserted_at
                "#,
            )
            .bind(instance_id)
            .bind(bucket_id)
            .bind(path)
            .fetch_one(&mut **tx)
            .await?;
            locations.push(location);
        }
        tx.commit().await?;

        Ok(locations)
    }

    #[tracing::instrument(skip(self), fields(db.table = "storage_file_locations"))]
    async fn list_locations(&self, instance_id: Uuid) -> Result<Vec<FileLocation>, AppError> {
        let locations = sqlx::query_as::<Postgres, FileLocation>(
            r#"
            SELECT id, file_instance_id, bucket_id, path, inserted_at
            FROM storage_file_locations
            WHERE file_instance_id = $1
            ORDER BY inserted_at
            "#,
        )
        .bind(instance_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(locations)
    }
}
