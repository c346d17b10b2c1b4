//! Video encoding presets
//!
//! The named presets `360p`, `720p`, `1080p` and `video_thumbnail` use fixed
//! filter/CRF pairs regardless of the preset's own quality. Any other preset
//! maps quality 1-100 linearly onto CRF 51-0.

use std::path::Path;
use stowage_core::models::Dimension;

pub const THUMBNAIL_PRESET: &str = "video_thumbnail";

/// Seek position of the frame taken for `video_thumbnail`.
const THUMBNAIL_SEEK_SECS: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEncoding {
    /// ffmpeg `-vf` filter, `None` to keep the source size.
    pub filter: Option<String>,
    pub crf: u8,
    /// Emit one frame instead of a transcode.
    pub single_frame: bool,
}

/// CRF for a 1-100 quality: 100 is lossless (0), 0 is worst (51).
pub fn quality_to_crf(quality: i32) -> u8 {
    let q = quality.clamp(0, 100) as f64;
    (51.0 - q * 51.0 / 100.0).round() as u8
}

fn scale_filter(dimension: &Dimension) -> Option<String> {
    let width = dimension.width.filter(|w| *w > 0);
    let height = dimension.height.filter(|h| *h > 0);
    match (width, height, dimension.maintain_aspect_ratio) {
        (Some(w), Some(h), false) => Some(format!("scale={}:{}", w, h)),
        (Some(w), _, _) => Some(format!("scale={}:-2", w)),
        (None, Some(h), _) => Some(format!("scale=-2:{}", h)),
        (None, None, _) => None,
    }
}

impl VideoEncoding {
    pub fn for_dimension(dimension: &Dimension) -> Self {
        let fixed = |filter: &str, crf: u8| VideoEncoding {
            filter: Some(filter.to_string()),
            crf,
            single_frame: false,
        };

        match dimension.name.as_str() {
            "360p" => fixed("scale=640:360", 28),
            "720p" => fixed("scale=1280:720", 25),
            "1080p" => fixed("scale=1920:1080", 23),
            THUMBNAIL_PRESET => VideoEncoding {
                filter: scale_filter(dimension),
                crf: quality_to_crf(dimension.quality),
                single_frame: true,
            },
            _ => VideoEncoding {
                filter: scale_filter(dimension),
                crf: quality_to_crf(dimension.quality),
                single_frame: false,
            },
        }
    }
}

/// Arguments for `ffmpeg`.
pub fn ffmpeg_args(input: &Path, output: &Path, encoding: &VideoEncoding) -> Vec<String> {
    let mut args = vec!["-y".to_string()];

    if encoding.single_frame {
        args.extend(["-ss".to_string(), THUMBNAIL_SEEK_SECS.to_string()]);
    }
    args.extend(["-i".to_string(), input.to_string_lossy().to_string()]);
    if let Some(filter) = &encoding.filter {
        args.extend(["-vf".to_string(), filter.clone()]);
    }

    if encoding.single_frame {
        args.extend(["-frames:v".to_string(), "1".to_string()]);
    } else {
        args.extend([
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-crf".to_string(),
            encoding.crf.to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "128k".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]);
    }

    args.push(output.to_string_lossy().to_string());
    args
}

/// Arguments for `ffprobe` reading the first video stream as JSON.
pub fn ffprobe_args(input: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "quiet".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_streams".to_string(),
        "-select_streams".to_string(),
        "v:0".to_string(),
        input.to_string_lossy().to_string(),
    ]
}

/// Width and height of the first stream in ffprobe JSON output.
pub fn parse_stream_dimensions(stdout: &[u8]) -> Option<(u32, u32)> {
    let parsed: serde_json::Value = serde_json::from_slice(stdout).ok()?;
    let stream = parsed["streams"].get(0)?;
    let width = stream["width"].as_u64()? as u32;
    let height = stream["height"].as_u64()? as u32;
    Some((width, height))
}
