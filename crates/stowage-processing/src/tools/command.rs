//! Subprocess implementation of [`MediaTool`].

use super::MediaTool;
use crate::error::ToolError;
use crate::imaging::{magick_args, ImageOp};
use crate::video::{ffmpeg_args, ffprobe_args, parse_stream_dimensions, VideoEncoding};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use stowage_core::config::ToolPaths;
use tokio::process::Command;

/// Validate that a path doesn't contain shell metacharacters
fn validate_path(path: &str) -> Result<(), ToolError> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.is_empty() || path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(ToolError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Runs the real binaries. Every child is killed when its timeout elapses or
/// when the calling task is dropped.
#[derive(Clone, Debug)]
pub struct CommandTool {
    paths: ToolPaths,
    timeout: Duration,
}

impl CommandTool {
    pub fn new(paths: ToolPaths, timeout: Duration) -> Result<Self, ToolError> {
        for path in [&paths.magick, &paths.ffmpeg, &paths.ffprobe, &paths.pdftoppm] {
            validate_path(path)?;
        }
        Ok(Self { paths, timeout })
    }

    #[tracing::instrument(skip_all, fields(
        process.executable.name = %tool,
        process.executable.path = %program
    ))]
    async fn run(&self, tool: &str, program: &str, args: &[String]) -> Result<Output, ToolError> {
        let start = Instant::now();

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ToolError::NotInstalled(tool.to_string()),
                _ => ToolError::Io(e),
            })?;

        // Dropping the wait future drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::error!(
                    timeout_secs = self.timeout.as_secs(),
                    "External tool timed out, killed"
                );
                return Err(ToolError::Timeout {
                    tool: tool.to_string(),
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!(status = %output.status, stderr = %stderr, "External tool failed");
            return Err(ToolError::Failed {
                tool: tool.to_string(),
                status: output.status.to_string(),
                stderr,
            });
        }

        tracing::debug!(
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "External tool finished"
        );
        Ok(output)
    }

    fn expect_output(tool: &str, output: &Path) -> Result<(), ToolError> {
        if output.is_file() {
            Ok(())
        } else {
            Err(ToolError::InvalidOutput {
                tool: tool.to_string(),
                message: format!("{} was not produced", output.display()),
            })
        }
    }
}

#[async_trait]
impl MediaTool for CommandTool {
    async fn transform_image(
        &self,
        input: &Path,
        output: &Path,
        op: &ImageOp,
        quality: u8,
    ) -> Result<(), ToolError> {
        let args = magick_args(input, output, op, quality);
        self.run("magick", &self.paths.magick, &args).await?;
        Self::expect_output("magick", output)
    }

    async fn transcode_video(
        &self,
        input: &Path,
        output: &Path,
        encoding: &VideoEncoding,
    ) -> Result<(), ToolError> {
        let args = ffmpeg_args(input, output, encoding);
        self.run("ffmpeg", &self.paths.ffmpeg, &args).await?;
        Self::expect_output("ffmpeg", output)
    }

    async fn rasterize_pdf(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        // pdftoppm appends the extension itself.
        let prefix: PathBuf = output.with_extension("");
        let args = vec![
            "-jpeg".to_string(),
            "-f".to_string(),
            "1".to_string(),
            "-l".to_string(),
            "1".to_string(),
            "-singlefile".to_string(),
            input.to_string_lossy().to_string(),
            prefix.to_string_lossy().to_string(),
        ];
        self.run("pdftoppm", &self.paths.pdftoppm, &args).await?;

        let produced = prefix.with_extension("jpg");
        if produced != output && produced.is_file() {
            tokio::fs::rename(&produced, output).await?;
        }
        Self::expect_output("pdftoppm", output)
    }

    async fn video_dimensions(&self, input: &Path) -> Result<(u32, u32), ToolError> {
        let output = self
            .run("ffprobe", &self.paths.ffprobe, &ffprobe_args(input))
            .await?;
        parse_stream_dimensions(&output.stdout).ok_or_else(|| ToolError::InvalidOutput {
            tool: "ffprobe".to_string(),
            message: "no video stream with width and height".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_with(paths: ToolPaths, timeout: Duration) -> CommandTool {
        CommandTool::new(paths, timeout).unwrap()
    }

    #[test]
    fn test_rejects_shell_metacharacters() {
        let paths = ToolPaths {
            ffmpeg: "ffmpeg && rm -rf /".to_string(),
            ..ToolPaths::default()
        };
        assert!(matches!(
            CommandTool::new(paths, Duration::from_secs(1)),
            Err(ToolError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_installed() {
        let paths = ToolPaths {
            magick: "/nonexistent/stowage-magick".to_string(),
            ..ToolPaths::default()
        };
        let tool = tool_with(paths, Duration::from_secs(5));
        let result = tool
            .transform_image(
                Path::new("in.jpg"),
                Path::new("out.jpg"),
                &ImageOp::Crop {
                    width: 10,
                    height: 10,
                },
                80,
            )
            .await;
        assert!(matches!(result, Err(ToolError::NotInstalled(t)) if t == "magick"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_the_child() {
        let tool = tool_with(ToolPaths::default(), Duration::from_millis(100));
        let start = Instant::now();
        let result = tool.run("sleep", "sleep", &["5".to_string()]).await;
        assert!(matches!(result, Err(ToolError::Timeout { .. })));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failed() {
        let tool = tool_with(ToolPaths::default(), Duration::from_secs(5));
        let result = tool.run("false", "false", &[]).await;
        assert!(matches!(result, Err(ToolError::Failed { tool, .. }) if tool == "false"));
    }
}
