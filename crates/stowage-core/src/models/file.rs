//! Logical file record (the original upload).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::constants::PDF_MIME_TYPE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "file_kind", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Other,
}

/// Media family a variant is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantSource {
    Image,
    Video,
    /// First page rasterized, then handled as an image.
    Pdf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct File {
    pub id: Uuid,
    pub original_file_name: String,
    pub file_name: String,
    /// Storage directory of the original; variants are stored beside it.
    pub file_path: Option<String>,
    pub mime_type: String,
    pub file_type: FileKind,
    pub ext: String,
    pub checksum: Option<String>,
    pub size: i64,
    pub inserted_at: DateTime<Utc>,
}

impl File {
    /// Which variant pipeline applies to this file, if any.
    pub fn variant_source(&self) -> Option<VariantSource> {
        match self.file_type {
            FileKind::Image => Some(VariantSource::Image),
            FileKind::Video => Some(VariantSource::Video),
            FileKind::Document if self.mime_type.eq_ignore_ascii_case(PDF_MIME_TYPE) => {
                Some(VariantSource::Pdf)
            }
            _ => None,
        }
    }

    /// Extension without the leading dot, taken from `ext` or the file name.
    pub fn extension(&self) -> Option<String> {
        let ext = self.ext.trim().trim_start_matches('.');
        if !ext.is_empty() {
            return Some(ext.to_lowercase());
        }
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// Checksum when known, otherwise the file name without extension.
    pub fn base_name(&self) -> String {
        match self.checksum.as_deref() {
            Some(sum) if !sum.is_empty() => sum.to_string(),
            _ => Path::new(&self.file_name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(&self.file_name)
                .to_string(),
        }
    }
}
