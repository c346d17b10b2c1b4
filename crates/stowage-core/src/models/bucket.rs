//! Storage bucket: one admin-configured storage endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::storage_types::StorageBackend;

#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Bucket {
    pub id: Uuid,
    pub name: String,
    /// Backend tag as written by the admin layer (`local`, `s3`, `b2`, `r2`).
    pub provider: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    /// Remote bucket name for S3-compatible backends.
    pub bucket_name: Option<String>,
    pub access_key_id: Option<String>,
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,
    pub cdn_url: Option<String>,
    /// Root directory for local buckets; the configured default is used when unset.
    pub local_root: Option<String>,
    /// 0 = auto (shuffled on writes), >0 = fixed, lower first.
    pub priority: i32,
    pub enabled: bool,
    pub max_size_mb: Option<i64>,
    pub inserted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bucket {
    pub fn is_auto_priority(&self) -> bool {
        self.priority <= 0
    }

    /// Parsed backend tag, `None` for tags this build does not know.
    pub fn backend(&self) -> Option<StorageBackend> {
        self.provider.parse().ok()
    }

    /// Remote bucket name, falling back to the display name.
    pub fn remote_name(&self) -> &str {
        self.bucket_name.as_deref().unwrap_or(&self.name)
    }

    /// Ordering key for deterministic reads: fixed priorities ascending, auto last.
    pub fn read_order_key(&self) -> (bool, i32, Uuid) {
        (self.is_auto_priority(), self.priority, self.id)
    }
}

// Credentials stay out of logs.
impl fmt::Debug for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("bucket_name", &self.bucket_name)
            .field("cdn_url", &self.cdn_url)
            .field("priority", &self.priority)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(priority: i32) -> Bucket {
        let now = Utc::now();
        Bucket {
            id: Uuid::new_v4(),
            name: "primary".to_string(),
            provider: "s3".to_string(),
            region: Some("eu-west-1".to_string()),
            endpoint: None,
            bucket_name: None,
            access_key_id: Some("AKIA".to_string()),
            secret_access_key: Some("very-secret".to_string()),
            cdn_url: None,
            local_root: None,
            priority,
            enabled: true,
            max_size_mb: None,
            inserted_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn debug_hides_secret() {
        let rendered = format!("{:?}", bucket(1));
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("primary"));
    }

    #[test]
    fn auto_priority_sorts_after_fixed() {
        let fixed = bucket(7);
        let auto = bucket(0);
        assert!(fixed.read_order_key() < auto.read_order_key());
        assert_eq!(fixed.remote_name(), "primary");
        assert_eq!(fixed.backend(), Some(StorageBackend::S3));
    }
}
