//! Fake media tool for testing
//!
//! Writes real (blank) images with the `image` crate so the generator's own
//! dimension and checksum reading is exercised, and records every call.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::ToolError;
use crate::imaging::ImageOp;
use crate::tools::MediaTool;
use crate::video::VideoEncoding;

#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Image { op: ImageOp, quality: u8 },
    Video(VideoEncoding),
    Pdf,
    Probe,
}

#[derive(Clone)]
pub struct FakeTool {
    calls: Arc<Mutex<Vec<ToolCall>>>,
    fail_images: Arc<AtomicBool>,
    delay: Option<Duration>,
    video_size: (u32, u32),
    pdf_page: (u32, u32),
}

impl Default for FakeTool {
    fn default() -> Self {
        Self {
            calls: Arc::default(),
            fail_images: Arc::default(),
            delay: None,
            video_size: (1280, 720),
            pdf_page: (612, 792),
        }
    }
}

impl FakeTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make `transform_image` fail with a non-zero exit.
    pub fn fail_images(&self, fail: bool) {
        self.fail_images.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn enter(&self, call: ToolCall) {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn write_image(path: &Path, width: u32, height: u32) -> Result<(), ToolError> {
        let img = ::image::RgbImage::from_pixel(width.max(1), height.max(1), ::image::Rgb([255, 255, 255]));
        img.save(path).map_err(|e| ToolError::InvalidOutput {
            tool: "fake".to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl MediaTool for FakeTool {
    async fn transform_image(
        &self,
        input: &Path,
        output: &Path,
        op: &ImageOp,
        quality: u8,
    ) -> Result<(), ToolError> {
        self.enter(ToolCall::Image { op: *op, quality }).await;
        if self.fail_images.load(Ordering::SeqCst) {
            return Err(ToolError::Failed {
                tool: "magick".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "forced failure".to_string(),
            });
        }

        let (src_w, src_h) = ::image::image_dimensions(input).map_err(|e| {
            ToolError::InvalidOutput {
                tool: "magick".to_string(),
                message: e.to_string(),
            }
        })?;
        let (w, h) = match *op {
            ImageOp::Crop { width, height } => (width, height),
            ImageOp::Resize {
                width: Some(width),
                height: None,
            } => (width, (src_h as u64 * width as u64 / src_w.max(1) as u64) as u32),
            ImageOp::Resize {
                width: None,
                height: Some(height),
            } => ((src_w as u64 * height as u64 / src_h.max(1) as u64) as u32, height),
            ImageOp::Resize {
                width: Some(width),
                height: Some(height),
            } => (width, height),
            ImageOp::Resize {
                width: None,
                height: None,
            } => (src_w, src_h),
        };
        Self::write_image(output, w, h)
    }

    async fn transcode_video(
        &self,
        _input: &Path,
        output: &Path,
        encoding: &VideoEncoding,
    ) -> Result<(), ToolError> {
        self.enter(ToolCall::Video(encoding.clone())).await;
        if encoding.single_frame {
            let (w, h) = self.video_size;
            return Self::write_image(output, w, h);
        }
        tokio::fs::write(output, b"fake mp4 payload").await?;
        Ok(())
    }

    async fn rasterize_pdf(&self, _input: &Path, output: &Path) -> Result<(), ToolError> {
        self.enter(ToolCall::Pdf).await;
        let (w, h) = self.pdf_page;
        Self::write_image(output, w, h)
    }

    async fn video_dimensions(&self, _input: &Path) -> Result<(u32, u32), ToolError> {
        self.calls.lock().unwrap().push(ToolCall::Probe);
        Ok(self.video_size)
    }
}
