//! In-memory repository implementations for testing
//!
//! These allow the storage manager and variant generator to be exercised
//! without a database.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use stowage_core::constants::ORIGINAL_VARIANT;
use stowage_core::models::{
    Bucket, Dimension, DimensionTarget, File, FileInstance, FileKind, FileLocation,
    InstanceStatus, NewFileInstance,
};
use stowage_core::AppError;
use uuid::Uuid;

use crate::traits::{BucketSource, DimensionSource, InstanceStore, SettingsSource};

/// In-memory stand-in for every repository trait.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    buckets: Arc<Mutex<Vec<Bucket>>>,
    dimensions: Arc<Mutex<Vec<Dimension>>>,
    settings: Arc<Mutex<HashMap<String, String>>>,
    instances: Arc<Mutex<Vec<FileInstance>>>,
    locations: Arc<Mutex<Vec<FileLocation>>>,
    fail_locations: Arc<AtomicBool>,
    fail_inserts: Arc<AtomicBool>,
    bucket_list_calls: Arc<AtomicUsize>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bucket(&self, bucket: Bucket) {
        self.buckets.lock().unwrap().push(bucket);
    }

    pub fn set_bucket_enabled(&self, id: Uuid, enabled: bool) {
        for bucket in self.buckets.lock().unwrap().iter_mut() {
            if bucket.id == id {
                bucket.enabled = enabled;
            }
        }
    }

    pub fn add_dimension(&self, dimension: Dimension) {
        self.dimensions.lock().unwrap().push(dimension);
    }

    pub fn set_setting(&self, key: &str, value: &str) {
        self.settings
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    /// Seed an instance (e.g. the original) together with its locations.
    pub fn add_instance(&self, instance: FileInstance, bucket_ids: &[Uuid], path: &str) {
        let now = Utc::now();
        let mut locations = self.locations.lock().unwrap();
        for bucket_id in bucket_ids {
            locations.push(FileLocation {
                id: Uuid::new_v4(),
                file_instance_id: instance.id,
                bucket_id: *bucket_id,
                path: path.to_string(),
                inserted_at: now,
            });
        }
        self.instances.lock().unwrap().push(instance);
    }

    /// Make every subsequent `create_locations` call fail.
    pub fn fail_location_creation(&self, fail: bool) {
        self.fail_locations.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `insert_instance` call fail.
    pub fn fail_instance_insert(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn instances(&self) -> Vec<FileInstance> {
        self.instances.lock().unwrap().clone()
    }

    pub fn locations(&self) -> Vec<FileLocation> {
        self.locations.lock().unwrap().clone()
    }

    /// How many times `BucketSource::list_enabled` was called.
    pub fn bucket_list_calls(&self) -> usize {
        self.bucket_list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BucketSource for InMemoryRepository {
    async fn list_enabled(&self) -> Result<Vec<Bucket>, AppError> {
        self.bucket_list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .buckets
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.enabled)
            .cloned()
            .collect())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Bucket>, AppError> {
        let buckets = self.buckets.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| buckets.iter().find(|b| b.id == *id).cloned())
            .collect())
    }
}

#[async_trait]
impl DimensionSource for InMemoryRepository {
    async fn list_enabled(&self) -> Result<Vec<Dimension>, AppError> {
        let mut dimensions: Vec<Dimension> = self
            .dimensions
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.enabled)
            .cloned()
            .collect();
        dimensions.sort_by_key(|d| d.sort_order);
        Ok(dimensions)
    }
}

#[async_trait]
impl SettingsSource for InMemoryRepository {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.settings.lock().unwrap().get(key).cloned())
    }
}

#[async_trait]
impl InstanceStore for InMemoryRepository {
    async fn find_instance(
        &self,
        file_id: Uuid,
        variant_name: &str,
    ) -> Result<Option<FileInstance>, AppError> {
        Ok(self
            .instances
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.file_id == file_id && i.variant_name == variant_name)
            .cloned())
    }

    async fn insert_instance(
        &self,
        instance: NewFileInstance,
    ) -> Result<(FileInstance, bool), AppError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Internal("instance insert failed".to_string()));
        }
        let mut instances = self.instances.lock().unwrap();
        if let Some(existing) = instances
            .iter()
            .find(|i| i.file_id == instance.file_id && i.variant_name == instance.variant_name)
        {
            return Ok((existing.clone(), false));
        }
        let row = FileInstance {
            id: Uuid::new_v4(),
            file_id: instance.file_id,
            variant_name: instance.variant_name,
            file_name: instance.file_name,
            mime_type: instance.mime_type,
            ext: instance.ext,
            checksum: instance.checksum,
            size: instance.size,
            width: instance.width,
            height: instance.height,
            status: InstanceStatus::Completed,
            inserted_at: Utc::now(),
        };
        instances.push(row.clone());
        Ok((row, true))
    }

    async fn delete_instance(&self, instance_id: Uuid) -> Result<(), AppError> {
        self.instances
            .lock()
            .unwrap()
            .retain(|i| i.id != instance_id);
        self.locations
            .lock()
            .unwrap()
            .retain(|l| l.file_instance_id != instance_id);
        Ok(())
    }

    async fn create_locations(
        &self,
        instance_id: Uuid,
        bucket_ids: &[Uuid],
        path: &str,
    ) -> Result<Vec<FileLocation>, AppError> {
        if self.fail_locations.load(Ordering::SeqCst) {
            return Err(AppError::Internal("location insert failed".to_string()));
        }
        if bucket_ids.is_empty() {
            return Err(AppError::InvalidInput(
                "an instance needs at least one location".to_string(),
            ));
        }
        let now = Utc::now();
        let created: Vec<FileLocation> = bucket_ids
            .iter()
            .map(|bucket_id| FileLocation {
                id: Uuid::new_v4(),
                file_instance_id: instance_id,
                bucket_id: *bucket_id,
                path: path.to_string(),
                inserted_at: now,
            })
            .collect();
        self.locations.lock().unwrap().extend(created.clone());
        Ok(created)
    }

    async fn list_locations(&self, instance_id: Uuid) -> Result<Vec<FileLocation>, AppError> {
        Ok(self
            .locations
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.file_instance_id == instance_id)
            .cloned()
            .collect())
    }
}

/// Enabled bucket fixture.
pub fn bucket(name: &str, provider: &str, priority: i32) -> Bucket {
    let now = Utc::now();
    Bucket {
        id: Uuid::new_v4(),
        name: name.to_string(),
        provider: provider.to_string(),
        region: Some("us-east-1".to_string()),
        endpoint: None,
        bucket_name: Some(name.to_string()),
        access_key_id: None,
        secret_access_key: None,
        cdn_url: None,
        local_root: None,
        priority,
        enabled: true,
        max_size_mb: None,
        inserted_at: now,
        updated_at: now,
    }
}

/// Enabled dimension fixture with quality 85.
pub fn dimension(
    name: &str,
    width: i32,
    height: i32,
    applies_to: DimensionTarget,
    maintain_aspect_ratio: bool,
) -> Dimension {
    Dimension {
        id: Uuid::new_v4(),
        name: name.to_string(),
        width: Some(width),
        height: Some(height),
        quality: 85,
        format: None,
        applies_to,
        maintain_aspect_ratio,
        enabled: true,
        sort_order: 0,
        inserted_at: Utc::now(),
    }
}

/// Original file fixture stored under `2024/05`.
pub fn file(kind: FileKind, mime: &str, file_name: &str) -> File {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_string();
    File {
        id: Uuid::new_v4(),
        original_file_name: file_name.to_string(),
        file_name: file_name.to_string(),
        file_path: Some("2024/05".to_string()),
        mime_type: mime.to_string(),
        file_type: kind,
        ext,
        checksum: Some("c0ffee".to_string()),
        size: 0,
        inserted_at: Utc::now(),
    }
}

/// The "original" instance row for `file`.
pub fn original_instance(file: &File) -> FileInstance {
    FileInstance {
        id: Uuid::new_v4(),
        file_id: file.id,
        variant_name: ORIGINAL_VARIANT.to_string(),
        file_name: file.file_name.clone(),
        mime_type: file.mime_type.clone(),
        ext: file.ext.clone(),
        checksum: file.checksum.clone().unwrap_or_default(),
        size: file.size,
        width: None,
        height: None,
        status: InstanceStatus::Completed,
        inserted_at: Utc::now(),
    }
}
