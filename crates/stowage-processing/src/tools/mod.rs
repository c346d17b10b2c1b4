//! External media tools
//!
//! The variant generator talks to ImageMagick, ffmpeg, ffprobe and pdftoppm only
//! through [`MediaTool`], so tests can substitute a fake.

mod command;

pub use command::CommandTool;

use crate::error::ToolError;
use crate::imaging::ImageOp;
use crate::video::VideoEncoding;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Resize or crop `input` into `output`; the output format follows its extension.
    async fn transform_image(
        &self,
        input: &Path,
        output: &Path,
        op: &ImageOp,
        quality: u8,
    ) -> Result<(), ToolError>;

    /// Transcode `input` (or grab one frame) into `output`.
    async fn transcode_video(
        &self,
        input: &Path,
        output: &Path,
        encoding: &VideoEncoding,
    ) -> Result<(), ToolError>;

    /// Render the first page of a PDF to the JPEG `output`.
    async fn rasterize_pdf(&self, input: &Path, output: &Path) -> Result<(), ToolError>;

    /// Width and height of the first video stream.
    async fn video_dimensions(&self, input: &Path) -> Result<(u32, u32), ToolError>;
}
