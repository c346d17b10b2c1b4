//! Repository trait abstractions
//!
//! These traits define the minimal interface the storage manager and the variant
//! generator need from the database, allowing them to be tested with in-memory
//! implementations.

use async_trait::async_trait;
use stowage_core::error::AppError;
use stowage_core::models::{Bucket, Dimension, FileInstance, FileLocation, NewFileInstance};
use uuid::Uuid;

/// Read access to configured buckets.
#[async_trait]
pub trait BucketSource: Send + Sync {
    /// All enabled buckets, in no particular order.
    async fn list_enabled(&self) -> Result<Vec<Bucket>, AppError>;

    /// Buckets with the given ids, in the order of `ids`. Unknown ids are skipped.
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Bucket>, AppError>;
}

/// Read access to dimension presets.
#[async_trait]
pub trait DimensionSource: Send + Sync {
    /// Enabled presets ordered by `sort_order`.
    async fn list_enabled(&self) -> Result<Vec<Dimension>, AppError>;
}

/// Read access to runtime settings by key.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, AppError>;
}

/// File instances and their locations.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    async fn find_instance(
        &self,
        file_id: Uuid,
        variant_name: &str,
    ) -> Result<Option<FileInstance>, AppError>;

    /// Insert unless a row for (file, variant) exists.
    ///
    /// Returns the stored row and whether this call created it.
    async fn insert_instance(
        &self,
        instance: NewFileInstance,
    ) -> Result<(FileInstance, bool), AppError>;

    /// Delete an instance; its locations go with it.
    async fn delete_instance(&self, instance_id: Uuid) -> Result<(), AppError>;

    /// Record `path` on every bucket in `bucket_ids`, all or nothing.
    async fn create_locations(
        &self,
        instance_id: Uuid,
        bucket_ids: &[Uuid],
        path: &str,
    ) -> Result<Vec<FileLocation>, AppError>;

    async fn list_locations(&self, instance_id: Uuid) -> Result<Vec<FileLocation>, AppError>;
}
