//! Stowage Processing Library
//!
//! Derives variants (resized/cropped images, transcoded videos, rasterized PDF
//! pages) from stored originals according to the enabled dimension presets.
//! External programs sit behind the [`MediaTool`] trait.

pub mod checksum;
pub mod error;
pub mod generator;
pub mod imaging;
pub mod mime;
pub mod tools;
pub mod video;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use error::{ToolError, VariantError};
pub use generator::{
    BatchHandle, BatchReport, GenerateMode, GenerateOptions, GenerateOutcome, VariantGenerator,
};
pub use imaging::ImageOp;
pub use tools::{CommandTool, MediaTool};
pub use video::VideoEncoding;
