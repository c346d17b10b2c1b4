//! Variant generator
//!
//! For each applicable dimension preset: download the original, run the media
//! tool, checksum and measure the result, store it next to the original (on the
//! original's buckets when known) and record a FileInstance with its locations.
//!
//! A batch runs one task per dimension under a single deadline. When the
//! deadline passes the remaining tasks are aborted; their tool processes are
//! killed with them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use stowage_core::constants::{
    parse_flag, DEFAULT_AUTO_GENERATE_VARIANTS, ORIGINAL_VARIANT, SETTING_AUTO_GENERATE_VARIANTS,
    VARIANT_BATCH_TIMEOUT,
};
use stowage_core::models::{Dimension, File, FileInstance, NewFileInstance, VariantSource};
use stowage_db::traits::{DimensionSource, InstanceStore, SettingsSource};
use stowage_storage::keys;
use stowage_storage::{RetrieveOpts, StorageManager, StoreOpts, StoreOutcome};
use tokio::task::{JoinHandle, JoinSet};
use uuid::Uuid;

use crate::checksum::sha256_file;
use crate::error::VariantError;
use crate::imaging::{self, ImageOp};
use crate::mime::{is_image, mime_for_extension};
use crate::tools::MediaTool;
use crate::video::{VideoEncoding, THUMBNAIL_PRESET};

/// How [`VariantGenerator::generate_variants`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerateMode {
    /// Spawn the batch and hand back a [`BatchHandle`].
    #[default]
    Async,
    /// Run the batch to completion before returning.
    Sync,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Restrict the batch to these dimension names.
    pub only: Option<Vec<String>>,
    pub mode: GenerateMode,
}

impl GenerateOptions {
    pub fn sync() -> Self {
        Self {
            only: None,
            mode: GenerateMode::Sync,
        }
    }
}

#[derive(Debug)]
pub struct BatchReport {
    pub file_id: Uuid,
    pub succeeded: Vec<FileInstance>,
    /// Dimension name and why it failed.
    pub failed: Vec<(String, VariantError)>,
}

/// A running batch. Dropping it leaves the batch running; `abort` stops it.
#[derive(Debug)]
pub struct BatchHandle {
    handle: JoinHandle<Result<BatchReport, VariantError>>,
}

impl BatchHandle {
    pub async fn wait(self) -> Result<BatchReport, VariantError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(VariantError::TaskFailed(e.to_string())),
        }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[derive(Debug)]
pub enum GenerateOutcome {
    /// Not a variant source, auto-generation off, or no applicable preset.
    NoWork,
    Completed(BatchReport),
    Spawned(BatchHandle),
}

#[derive(Clone)]
pub struct VariantGenerator {
    storage: Arc<StorageManager>,
    dimensions: Arc<dyn DimensionSource>,
    instances: Arc<dyn InstanceStore>,
    settings: Arc<dyn SettingsSource>,
    tool: Arc<dyn MediaTool>,
    temp_root: PathBuf,
    batch_timeout: Duration,
}

/// Output extension: PDFs rasterize to JPEG; otherwise the preset's format,
/// else the original's.
fn variant_extension(file: &File, dimension: &Dimension, source: VariantSource) -> String {
    if source == VariantSource::Pdf {
        return "jpg".to_string();
    }
    if let Some(format) = dimension
        .format
        .as_deref()
        .map(|f| f.trim().trim_start_matches('.').to_lowercase())
        .filter(|f| !f.is_empty())
    {
        return format;
    }
    if source == VariantSource::Video && dimension.name == THUMBNAIL_PRESET {
        return "jpg".to_string();
    }
    file.extension().unwrap_or_else(|| match source {
        VariantSource::Video => "mp4".to_string(),
        _ => "jpg".to_string(),
    })
}

impl VariantGenerator {
    pub fn new(
        storage: Arc<StorageManager>,
        dimensions: Arc<dyn DimensionSource>,
        instances: Arc<dyn InstanceStore>,
        settings: Arc<dyn SettingsSource>,
        tool: Arc<dyn MediaTool>,
    ) -> Self {
        Self {
            storage,
            dimensions,
            instances,
            settings,
            tool,
            temp_root: std::env::temp_dir(),
            batch_timeout: VARIANT_BATCH_TIMEOUT,
        }
    }

    pub fn with_temp_dir(mut self, temp_root: impl Into<PathBuf>) -> Self {
        self.temp_root = temp_root.into();
        self
    }

    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = timeout;
        self
    }

    async fn auto_generate_enabled(&self) -> bool {
        match self.settings.get_setting(SETTING_AUTO_GENERATE_VARIANTS).await {
            Ok(value) => parse_flag(value.as_deref(), DEFAULT_AUTO_GENERATE_VARIANTS),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read auto-generate setting, using default");
                DEFAULT_AUTO_GENERATE_VARIANTS
            }
        }
    }

    /// Enabled presets for `source`, minus "original", optionally narrowed to `only`.
    pub async fn candidate_dimensions(
        &self,
        source: VariantSource,
        only: Option<&[String]>,
    ) -> Result<Vec<Dimension>, VariantError> {
        let dimensions = self.dimensions.list_enabled().await?;
        Ok(dimensions
            .into_iter()
            .filter(|d| d.applies_to.applies_to(source))
            .filter(|d| d.name != ORIGINAL_VARIANT)
            .filter(|d| only.map_or(true, |names| names.iter().any(|n| n == &d.name)))
            .collect())
    }

    /// Derive every applicable variant of `file`.
    #[tracing::instrument(skip_all, fields(file.id = %file.id, mode = ?opts.mode))]
    pub async fn generate_variants(
        &self,
        file: &File,
        opts: GenerateOptions,
    ) -> Result<GenerateOutcome, VariantError> {
        let Some(source) = file.variant_source() else {
            tracing::debug!(mime_type = %file.mime_type, "No variant pipeline for file");
            return Ok(GenerateOutcome::NoWork);
        };

        if !self.auto_generate_enabled().await {
            tracing::debug!("Variant auto-generation disabled");
            return Ok(GenerateOutcome::NoWork);
        }

        let dimensions = self
            .candidate_dimensions(source, opts.only.as_deref())
            .await?;
        if dimensions.is_empty() {
            return Ok(GenerateOutcome::NoWork);
        }

        tracing::info!(count = dimensions.len(), "Generating variants");

        let batch = self.clone().run_batch(file.clone(), dimensions);
        match opts.mode {
            GenerateMode::Sync => Ok(GenerateOutcome::Completed(batch.await?)),
            GenerateMode::Async => Ok(GenerateOutcome::Spawned(BatchHandle {
                handle: tokio::spawn(batch),
            })),
        }
    }

    async fn run_batch(
        self,
        file: File,
        dimensions: Vec<Dimension>,
    ) -> Result<BatchReport, VariantError> {
        let deadline = tokio::time::Instant::now() + self.batch_timeout;
        let file = Arc::new(file);
        let mut report = BatchReport {
            file_id: file.id,
            succeeded: Vec::new(),
            failed: Vec::new(),
        };

        let mut tasks = JoinSet::new();
        let mut pending = HashMap::new();
        for dimension in dimensions {
            let generator = self.clone();
            let file = Arc::clone(&file);
            let name = dimension.name.clone();
            let handle =
                tasks.spawn(async move { generator.generate_variant(&file, &dimension).await });
            pending.insert(handle.id(), name);
        }

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next_with_id()).await {
                Ok(None) => break,
                Ok(Some(Ok((id, result)))) => {
                    let name = pending.remove(&id).unwrap_or_default();
                    match result {
                        Ok(instance) => report.succeeded.push(instance),
                        Err(e) => {
                            tracing::warn!(variant = %name, error = %e, "Variant generation failed");
                            report.failed.push((name, e));
                        }
                    }
                }
                Ok(Some(Err(join_error))) => {
                    let name = pending.remove(&join_error.id()).unwrap_or_default();
                    tracing::error!(variant = %name, error = %join_error, "Variant task panicked");
                    report
                        .failed
                        .push((name, VariantError::TaskFailed(join_error.to_string())));
                }
                Err(_) => {
                    tracing::error!(
                        timeout_secs = self.batch_timeout.as_secs(),
                        remaining = pending.len(),
                        "Variant batch deadline exceeded, aborting remaining tasks"
                    );
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    for (_, name) in pending.drain() {
                        report
                            .failed
                            .push((name, VariantError::DeadlineExceeded(self.batch_timeout)));
                    }
                    if report.succeeded.is_empty() {
                        return Err(VariantError::DeadlineExceeded(self.batch_timeout));
                    }
                    break;
                }
            }
        }

        if report.succeeded.is_empty() && !report.failed.is_empty() {
            return Err(VariantError::AllFailed(
                report
                    .failed
                    .into_iter()
                    .map(|(name, e)| (name, e.to_string()))
                    .collect(),
            ));
        }

        tracing::info!(
            file.id = %report.file_id,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Variant batch finished"
        );
        Ok(report)
    }

    /// Download the original into `dest`; returns the buckets holding it.
    async fn download_original(
        &self,
        file: &File,
        file_path: &str,
        dest: &Path,
    ) -> Result<Vec<Uuid>, VariantError> {
        let locations = match self.instances.find_instance(file.id, ORIGINAL_VARIANT).await? {
            Some(original) => self.instances.list_locations(original.id).await?,
            None => Vec::new(),
        };
        let bucket_ids: Vec<Uuid> = locations.iter().map(|l| l.bucket_id).collect();
        let remote_path = locations
            .first()
            .map(|l| l.path.clone())
            .unwrap_or_else(|| keys::join(file_path, &file.file_name));

        if !bucket_ids.is_empty() {
            match self
                .storage
                .retrieve(&remote_path, dest, &RetrieveOpts::buckets(bucket_ids.clone()))
                .await
            {
                Ok(_) => return Ok(bucket_ids),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Original missing from its recorded buckets, trying every enabled bucket"
                    );
                }
            }
        }

        self.storage
            .retrieve(&remote_path, dest, &RetrieveOpts::default())
            .await?;
        Ok(bucket_ids)
    }

    async fn measure(&self, output: &Path, mime_type: &str) -> (Option<i32>, Option<i32>) {
        let dims = if is_image(mime_type) {
            imaging::read_dimensions(output).await
        } else {
            match self.tool.video_dimensions(output).await {
                Ok(dims) => Some(dims),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read variant dimensions");
                    None
                }
            }
        };
        match dims {
            Some((w, h)) => (Some(w as i32), Some(h as i32)),
            None => (None, None),
        }
    }

    /// Produce and record one variant. Returns the existing instance if the
    /// variant was generated before.
    #[tracing::instrument(skip_all, fields(file.id = %file.id, variant = %dimension.name))]
    pub async fn generate_variant(
        &self,
        file: &File,
        dimension: &Dimension,
    ) -> Result<FileInstance, VariantError> {
        let file_path = file
            .file_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(VariantError::MissingFilePath(file.id))?;
        let source = file
            .variant_source()
            .ok_or_else(|| VariantError::UnsupportedSource {
                file_id: file.id,
                mime_type: file.mime_type.clone(),
            })?;

        if let Some(existing) = self
            .instances
            .find_instance(file.id, &dimension.name)
            .await?
        {
            tracing::debug!(instance.id = %existing.id, "Variant already exists");
            return Ok(existing);
        }

        let start = std::time::Instant::now();
        let ext = variant_extension(file, dimension, source);
        let variant_file_name = format!("{}_{}.{}", file.base_name(), dimension.name, ext);
        let remote_path = keys::join(file_path, &variant_file_name);
        let mime_type = mime_for_extension(&ext);

        // Removed with everything in it on every return path.
        let workdir = tempfile::Builder::new()
            .prefix("stowage-variant-")
            .tempdir_in(&self.temp_root)?;
        let input = workdir.path().join(format!(
            "original.{}",
            file.extension().unwrap_or_else(|| "bin".to_string())
        ));
        let output = workdir.path().join(&variant_file_name);

        let original_buckets = self.download_original(file, file_path, &input).await?;

        match source {
            VariantSource::Image => {
                self.tool
                    .transform_image(
                        &input,
                        &output,
                        &ImageOp::for_dimension(dimension),
                        imaging::quality(dimension),
                    )
                    .await?
            }
            VariantSource::Video => {
                self.tool
                    .transcode_video(&input, &output, &VideoEncoding::for_dimension(dimension))
                    .await?
            }
            VariantSource::Pdf => {
                let page = workdir.path().join("page.jpg");
                self.tool.rasterize_pdf(&input, &page).await?;
                self.tool
                    .transform_image(
                        &page,
                        &output,
                        &ImageOp::for_dimension(dimension),
                        imaging::quality(dimension),
                    )
                    .await?
            }
        }

        let size = tokio::fs::metadata(&output).await?.len();
        let checksum = sha256_file(&output).await?;
        let (width, height) = self.measure(&output, mime_type).await;

        let stored = self
            .storage
            .store(
                &output,
                &StoreOpts {
                    bucket_ids: (!original_buckets.is_empty()).then_some(original_buckets),
                    path: Some(remote_path),
                    prefix: None,
                    content_type: Some(mime_type.to_string()),
                },
            )
            .await?;

        let new_instance = NewFileInstance {
            file_id: file.id,
            variant_name: dimension.name.clone(),
            file_name: variant_file_name,
            mime_type: mime_type.to_string(),
            ext,
            checksum,
            size: size as i64,
            width,
            height,
        };
        let instance = match self.record(new_instance, &stored).await {
            Ok(instance) => instance,
            Err(e) => {
                self.discard_stored(&stored).await;
                return Err(e);
            }
        };

        tracing::info!(
            instance.id = %instance.id,
            path = %stored.path,
            size_bytes = size,
            copies = stored.successful_storages,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Variant generated"
        );

        Ok(instance)
    }

    /// Insert the instance and its locations. On a location failure the
    /// instance is removed again; the caller owns the stored bytes.
    async fn record(
        &self,
        new_instance: NewFileInstance,
        stored: &StoreOutcome,
    ) -> Result<FileInstance, VariantError> {
        let (instance, created) = self.instances.insert_instance(new_instance).await?;
        if !created {
            tracing::debug!(instance.id = %instance.id, "Variant recorded concurrently");
            return Ok(instance);
        }

        if let Err(e) = self
            .instances
            .create_locations(instance.id, &stored.bucket_ids, &stored.path)
            .await
        {
            tracing::error!(
                instance.id = %instance.id,
                error = %e,
                "Failed to record variant locations, removing instance"
            );
            if let Err(cleanup) = self.instances.delete_instance(instance.id).await {
                tracing::error!(error = %cleanup, "Failed to remove orphaned instance");
            }
            return Err(VariantError::LocationCreation(e));
        }

        Ok(instance)
    }

    /// Best-effort removal of variant bytes that were stored but never recorded.
    async fn discard_stored(&self, stored: &StoreOutcome) {
        if let Err(e) = self
            .storage
            .delete(&stored.path, &RetrieveOpts::buckets(stored.bucket_ids.clone()))
            .await
        {
            tracing::warn!(path = %stored.path, error = %e, "Failed to remove stored variant bytes");
        }
    }

    /// Remove a variant's bytes from its buckets and delete its instance.
    ///
    /// Returns `false` when the variant does not exist.
    #[tracing::instrument(skip_all, fields(file.id = %file.id, variant = %variant_name))]
    pub async fn delete_variant(
        &self,
        file: &File,
        variant_name: &str,
    ) -> Result<bool, VariantError> {
        if variant_name == ORIGINAL_VARIANT {
            return Err(VariantError::OriginalNotDeletable);
        }

        let Some(instance) = self.instances.find_instance(file.id, variant_name).await? else {
            return Ok(false);
        };

        let locations = self.instances.list_locations(instance.id).await?;
        if let Some(first) = locations.first() {
            let bucket_ids = locations.iter().map(|l| l.bucket_id).collect();
            let outcome = self
                .storage
                .delete(&first.path, &RetrieveOpts::buckets(bucket_ids))
                .await?;
            tracing::debug!(
                attempted = outcome.attempted,
                succeeded = outcome.succeeded,
                "Variant bytes deleted"
            );
        }

        self.instances.delete_instance(instance.id).await?;
        tracing::info!(instance.id = %instance.id, "Variant deleted");
        Ok(true)
    }
}
