//! Dimension presets: admin-defined descriptions of one target variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use super::file::VariantSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "dimension_target", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum DimensionTarget {
    Image,
    Video,
    Both,
}

impl DimensionTarget {
    /// PDFs rasterize to images, so they use the image presets.
    pub fn applies_to(&self, source: VariantSource) -> bool {
        match (self, source) {
            (DimensionTarget::Both, _) => true,
            (DimensionTarget::Image, VariantSource::Image | VariantSource::Pdf) => true,
            (DimensionTarget::Video, VariantSource::Video) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
#[validate(schema(function = "validate_quality_range"))]
pub struct Dimension {
    pub id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    /// Accepted as 1-100 for image and both presets, 0-51 for video-only ones.
    /// Encoders always read it as a 1-100 quality; video maps it onto CRF 51-0.
    pub quality: i32,
    /// Forced output extension (`webp`, `mp4`, ...); the original's when unset.
    pub format: Option<String>,
    pub applies_to: DimensionTarget,
    /// Width-only resize when true, exact center crop when false.
    pub maintain_aspect_ratio: bool,
    pub enabled: bool,
    pub sort_order: i32,
    pub inserted_at: DateTime<Utc>,
}

fn validate_quality_range(dimension: &Dimension) -> Result<(), ValidationError> {
    let (min, max) = match dimension.applies_to {
        DimensionTarget::Video => (0, 51),
        DimensionTarget::Image | DimensionTarget::Both => (1, 100),
    };
    if dimension.quality < min || dimension.quality > max {
        let mut err = ValidationError::new("quality_out_of_range");
        err.message = Some(format!("quality must be between {} and {}", min, max).into());
        return Err(err);
    }
    if matches!(dimension.width, Some(w) if w <= 0) || matches!(dimension.height, Some(h) if h <= 0)
    {
        return Err(ValidationError::new("non_positive_size"));
    }
    Ok(())
}
