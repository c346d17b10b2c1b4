//! Variant generation through the subprocess tool when the binaries are missing
//!
//! Exercises the real `CommandTool` wiring end to end without requiring
//! ImageMagick or ffmpeg on the test host.

use std::sync::Arc;
use std::time::Duration;
use stowage_core::config::ToolPaths;
use stowage_core::models::{DimensionTarget, FileKind};
use stowage_db::test_helpers::{bucket, dimension, file, original_instance, InMemoryRepository};
use stowage_processing::{CommandTool, GenerateOptions, ToolError, VariantError, VariantGenerator};
use stowage_storage::{ProviderRegistry, StorageManager};
use tempfile::tempdir;

fn missing_tools() -> ToolPaths {
    ToolPaths {
        magick: "/nonexistent/stowage/magick".to_string(),
        ffmpeg: "/nonexistent/stowage/ffmpeg".to_string(),
        ffprobe: "/nonexistent/stowage/ffprobe".to_string(),
        pdftoppm: "/nonexistent/stowage/pdftoppm".to_string(),
    }
}

#[tokio::test]
async fn test_missing_binary_fails_the_batch_without_recording() {
    let root = tempdir().unwrap();
    let scratch = tempdir().unwrap();

    let repo = InMemoryRepository::new();
    let mut local = bucket("local", "local", 1);
    local.local_root = Some(root.path().display().to_string());
    repo.add_bucket(local.clone());
    repo.add_dimension(dimension("thumbnail", 150, 150, DimensionTarget::Image, false));

    let photo = file(FileKind::Image, "image/jpeg", "photo.jpg");
    std::fs::create_dir_all(root.path().join("2024/05")).unwrap();
    ::image::RgbImage::new(64, 48)
        .save(root.path().join("2024/05/photo.jpg"))
        .unwrap();
    repo.add_instance(original_instance(&photo), &[local.id], "2024/05/photo.jpg");

    let storage = StorageManager::new(
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        ProviderRegistry::with_defaults(scratch.path()),
    );
    let tool = CommandTool::new(missing_tools(), Duration::from_secs(5)).unwrap();
    let generator = VariantGenerator::new(
        Arc::new(storage),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(tool),
    )
    .with_temp_dir(scratch.path());

    let result = generator
        .generate_variants(&photo, GenerateOptions::sync())
        .await;

    match result {
        Err(VariantError::AllFailed(failures)) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, "thumbnail");
            assert!(failures[0].1.contains("magick"));
        }
        other => panic!("expected AllFailed, got {:?}", other),
    }
    assert_eq!(repo.instances().len(), 1);

    // The per-variant working directory is gone.
    let leftovers: Vec<_> = std::fs::read_dir(scratch.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("stowage-variant-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_single_variant_surfaces_not_installed() {
    let root = tempdir().unwrap();
    let repo = InMemoryRepository::new();
    let mut local = bucket("local", "local", 1);
    local.local_root = Some(root.path().display().to_string());
    repo.add_bucket(local.clone());

    let clip = file(FileKind::Video, "video/mp4", "clip.mp4");
    std::fs::create_dir_all(root.path().join("2024/05")).unwrap();
    std::fs::write(root.path().join("2024/05/clip.mp4"), b"not really a video").unwrap();
    repo.add_instance(original_instance(&clip), &[local.id], "2024/05/clip.mp4");

    let storage = StorageManager::new(
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        ProviderRegistry::with_defaults(root.path()),
    );
    let generator = VariantGenerator::new(
        Arc::new(storage),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(CommandTool::new(missing_tools(), Duration::from_secs(5)).unwrap()),
    );

    let hd = dimension("720p", 1280, 720, DimensionTarget::Video, true);
    let result = generator.generate_variant(&clip, &hd).await;

    assert!(matches!(
        result,
        Err(VariantError::Tool(ToolError::NotInstalled(tool))) if tool == "ffmpeg"
    ));
}
