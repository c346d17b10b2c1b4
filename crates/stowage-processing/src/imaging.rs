//! Image operations derived from a dimension preset.

use std::path::Path;
use stowage_core::models::Dimension;

/// What happens to an image for one preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOp {
    /// Aspect-preserving resize; with neither side set the image is only re-encoded.
    Resize {
        width: Option<u32>,
        height: Option<u32>,
    },
    /// Scale to cover, then center-crop to exactly `width`x`height` on white.
    Crop { width: u32, height: u32 },
}

fn positive(v: Option<i32>) -> Option<u32> {
    v.filter(|v| *v > 0).map(|v| v as u32)
}

impl ImageOp {
    pub fn for_dimension(dimension: &Dimension) -> Self {
        let width = positive(dimension.width);
        let height = positive(dimension.height);

        match (dimension.maintain_aspect_ratio, width, height) {
            (false, Some(width), Some(height)) => ImageOp::Crop { width, height },
            // Width-only resize when the width is known.
            (true, Some(width), _) => ImageOp::Resize {
                width: Some(width),
                height: None,
            },
            (_, width, height) => ImageOp::Resize { width, height },
        }
    }

    /// ImageMagick geometry and operators for this op.
    fn operators(&self) -> Vec<String> {
        match *self {
            ImageOp::Resize {
                width: None,
                height: None,
            } => Vec::new(),
            ImageOp::Resize { width, height } => {
                let w = width.map(|w| w.to_string()).unwrap_or_default();
                let h = height.map(|h| h.to_string()).unwrap_or_default();
                vec!["-resize".to_string(), format!("{}x{}", w, h)]
            }
            ImageOp::Crop { width, height } => vec![
                "-resize".to_string(),
                format!("{}x{}^", width, height),
                "-gravity".to_string(),
                "center".to_string(),
                "-background".to_string(),
                "white".to_string(),
                "-extent".to_string(),
                format!("{}x{}", width, height),
            ],
        }
    }
}

/// Image quality for a preset, clamped to 1-100.
pub fn quality(dimension: &Dimension) -> u8 {
    dimension.quality.clamp(1, 100) as u8
}

/// Arguments for `magick` (input first, output last).
pub fn magick_args(input: &Path, output: &Path, op: &ImageOp, quality: u8) -> Vec<String> {
    let mut args = vec![input.to_string_lossy().to_string()];
    args.extend(op.operators());
    args.push("-quality".to_string());
    args.push(quality.to_string());
    args.push(output.to_string_lossy().to_string());
    args
}

/// Width and height of an image file, decoded off the async runtime.
pub async fn read_dimensions(path: &Path) -> Option<(u32, u32)> {
    let path = path.to_path_buf();
    match tokio::task::spawn_blocking(move || ::image::image_dimensions(&path)).await {
        Ok(Ok(dims)) => Some(dims),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Failed to read image dimensions");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Image dimension task failed");
            None
        }
    }
}
