//! Physical renditions of a file and where their bytes live.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "instance_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One rendition ("original" or a named variant) of a logical file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct FileInstance {
    pub id: Uuid,
    pub file_id: Uuid,
    pub variant_name: String,
    pub file_name: String,
    pub mime_type: String,
    pub ext: String,
    pub checksum: String,
    pub size: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub status: InstanceStatus,
    pub inserted_at: DateTime<Utc>,
}

/// Insert payload for a produced variant.
#[derive(Debug, Clone)]
pub struct NewFileInstance {
    pub file_id: Uuid,
    pub variant_name: String,
    pub file_name: String,
    pub mime_type: String,
    pub ext: String,
    pub checksum: String,
    pub size: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

/// Record of one bucket holding an instance's bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct FileLocation {
    pub id: Uuid,
    pub file_instance_id: Uuid,
    pub bucket_id: Uuid,
    pub path: String,
    pub inserted_at: DateTime<Utc>,
}
