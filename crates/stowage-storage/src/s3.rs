use crate::traits::{validate_key, StorageError, StorageProvider, StorageResult, StoreOptions};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, Attributes, Error as ObjectStoreError, ObjectStore, ObjectStoreExt,
    PutMultipartOptions, PutOptions, PutPayload, WriteMultipart,
};
use std::path::Path;
use std::time::Instant;
use stowage_core::models::Bucket;
use tokio::fs;
use tokio::io::AsyncReadExt;

const DEFAULT_REGION: &str = "us-east-1";
/// Files up to this size go up in a single PUT.
const MULTIPART_THRESHOLD: u64 = 5 * 1024 * 1024;
/// Minimum S3 part size except for the last part.
const PART_SIZE: usize = 5 * 1024 * 1024;
const MAX_PARTS_IN_FLIGHT: usize = 4;

fn upload_failed(e: ObjectStoreError) -> StorageError {
    StorageError::UploadFailed(e.to_string())
}

/// Upload `source` to `location`. Files above `threshold` are streamed from disk
/// in `part_size` chunks so memory stays bounded by the parts in flight.
async fn upload_file(
    store: &dyn ObjectStore,
    location: &ObjectPath,
    source: &Path,
    attributes: Attributes,
    threshold: u64,
    part_size: usize,
) -> StorageResult<u64> {
    let size = fs::metadata(source).await?.len();

    if size <= threshold {
        let data = fs::read(source).await?;
        let put_opts = PutOptions {
            attributes,
            ..Default::default()
        };
        store
            .put_opts(location, PutPayload::from(Bytes::from(data)), put_opts)
            .await
            .map_err(upload_failed)?;
        return Ok(size);
    }

    let upload = store
        .put_multipart_opts(
            location,
            PutMultipartOptions {
                attributes,
                ..Default::default()
            },
        )
        .await
        .map_err(upload_failed)?;
    let mut writer = WriteMultipart::new_with_chunk_size(upload, part_size);

    let mut file = fs::File::open(source).await?;
    let mut buf = vec![0u8; part_size];
    let mut sent = 0u64;
    loop {
        let n = match file.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                let _ = writer.abort().await;
                return Err(e.into());
            }
        };
        if let Err(e) = writer.wait_for_capacity(MAX_PARTS_IN_FLIGHT).await {
            let _ = writer.abort().await;
            return Err(upload_failed(e));
        }
        writer.write(&buf[..n]);
        sent += n as u64;
    }
    writer.finish().await.map_err(upload_failed)?;

    tracing::debug!(size_bytes = sent, part_size, "S3 multipart upload completed");
    Ok(sent)
}

/// S3-compatible provider for AWS S3, Backblaze B2 and Cloudflare R2
///
/// The client is built from the bucket's own credentials, region and endpoint on
/// every call, so concurrent calls against different buckets never share
/// configuration.
#[derive(Clone, Default)]
pub struct S3Provider;

impl S3Provider {
    pub fn new() -> Self {
        Self
    }

    fn region(bucket: &Bucket) -> &str {
        bucket
            .region
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REGION)
    }

    /// Endpoint the client talks to; `None` means the AWS default.
    fn endpoint(bucket: &Bucket) -> StorageResult<Option<String>> {
        if let Some(endpoint) = bucket.endpoint.as_deref().filter(|e| !e.is_empty()) {
            return Ok(Some(endpoint.trim_end_matches('/').to_string()));
        }
        match bucket.backend() {
            Some(StorageBackend::B2) => Ok(Some(format!(
                "https://s3.{}.backblazeb2.com",
                Self::region(bucket)
            ))),
            Some(StorageBackend::R2) => Err(StorageError::ConfigError(format!(
                "R2 bucket '{}' has no endpoint configured",
                bucket.name
            ))),
            _ => Ok(None),
        }
    }

    /// Build a client for this bucket only.
    fn build_store(bucket: &Bucket) -> StorageResult<AmazonS3> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(Self::region(bucket))
            .with_bucket_name(bucket.remote_name());

        if let (Some(key_id), Some(secret)) = (
            bucket.access_key_id.as_deref(),
            bucket.secret_access_key.as_deref(),
        ) {
            builder = builder
                .with_access_key_id(key_id)
                .with_secret_access_key(secret);
        }

        if let Some(endpoint) = Self::endpoint(bucket)? {
            let allow_http = endpoint.starts_with("http://");
            builder = builder.with_endpoint(endpoint).with_allow_http(allow_http);
        }

        builder.build().map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to build S3 client for bucket '{}': {}",
                bucket.name, e
            ))
        })
    }

    fn location(key: &str) -> StorageResult<ObjectPath> {
        validate_key(key)?;
        Ok(ObjectPath::from(key.to_string()))
    }

    fn vendor_url(bucket: &Bucket, key: &str) -> Option<String> {
        let name = bucket.remote_name();
        let region = Self::region(bucket);
        if let Some(endpoint) = bucket.endpoint.as_deref().filter(|e| !e.is_empty()) {
            return Some(format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                name,
                key
            ));
        }
        match bucket.backend()? {
            StorageBackend::S3 => Some(format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                name, region, key
            )),
            StorageBackend::B2 => Some(format!(
                "https://{}.s3.{}.backblazeb2.com/{}",
                name, region, key
            )),
            // R2 has no public vendor host without an endpoint or CDN.
            StorageBackend::R2 | StorageBackend::Local => None,
        }
    }
}

#[async_trait]
impl StorageProvider for S3Provider {
    #[tracing::instrument(skip_all, fields(
        s3.bucket = %bucket.remote_name(),
        s3.key = %dest_path,
        s3.operation = "PutObject"
    ))]
    async fn store(
        &self,
        bucket: &Bucket,
        source: &Path,
        dest_path: &str,
        opts: &StoreOptions,
    ) -> StorageResult<String> {
        let location = Self::location(dest_path)?;

        if !fs::try_exists(source).await.unwrap_or(false) {
            return Err(StorageError::SourceMissing(source.display().to_string()));
        }

        let mut attributes = Attributes::new();
        if let Some(content_type) = &opts.content_type {
            attributes.insert(Attribute::ContentType, content_type.clone().into());
        }

        let store = Self::build_store(bucket)?;
        let start = Instant::now();
        let result = upload_file(
            &store,
            &location,
            source,
            attributes,
            MULTIPART_THRESHOLD,
            PART_SIZE,
        )
        .await;
        let duration = start.elapsed().as_secs_f64();

        match result {
            Ok(size) => {
                tracing::info!(
                    size_bytes = size,
                    duration_ms = duration * 1000.0,
                    "S3 upload successful"
                );
                Ok(self
                    .public_url(bucket, dest_path)
                    .unwrap_or_else(|| format!("s3://{}/{}", bucket.remote_name(), dest_path)))
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    duration_ms = duration * 1000.0,
                    "S3 upload failed"
                );
                Err(e)
            }
        }
    }

    #[tracing::instrument(skip_all, fields(
        s3.bucket = %bucket.remote_name(),
        s3.key = %remote_path,
        s3.operation = "GetObject"
    ))]
    async fn retrieve(
        &self,
        bucket: &Bucket,
        remote_path: &str,
        dest: &Path,
    ) -> StorageResult<()> {
        let location = Self::location(remote_path)?;
        let store = Self::build_store(bucket)?;
        let start = Instant::now();

        let response = store.get(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(remote_path.to_string()),
            other => StorageError::DownloadFailed(other.to_string()),
        })?;
        let data = response
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(dest, &data).await?;

        tracing::info!(
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(
        s3.bucket = %bucket.remote_name(),
        s3.key = %remote_path,
        s3.operation = "DeleteObject"
    ))]
    async fn delete(&self, bucket: &Bucket, remote_path: &str) -> StorageResult<()> {
        let location = Self::location(remote_path)?;
        let store = Self::build_store(bucket)?;
        let start = Instant::now();

        match store.delete(&location).await {
            Ok(_) | Err(ObjectStoreError::NotFound { .. }) => {
                tracing::info!(
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete successful"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    async fn exists(&self, bucket: &Bucket, remote_path: &str) -> bool {
        let (Ok(location), Ok(store)) = (Self::location(remote_path), Self::build_store(bucket))
        else {
            return false;
        };
        match store.head(&location).await {
            Ok(_) => true,
            Err(ObjectStoreError::NotFound { .. }) => false,
            Err(e) => {
                tracing::warn!(error = %e, bucket = %bucket.name, "S3 head failed");
                false
            }
        }
    }

    fn public_url(&self, bucket: &Bucket, remote_path: &str) -> Option<String> {
        if let Some(cdn) = bucket.cdn_url.as_deref().filter(|c| !c.is_empty()) {
            return Some(format!("{}/{}", cdn.trim_end_matches('/'), remote_path));
        }
        Self::vendor_url(bucket, remote_path)
    }

    #[tracing::instrument(skip_all, fields(s3.bucket = %bucket.remote_name(), s3.operation = "ListObjects"))]
    async fn test_connection(&self, bucket: &Bucket) -> StorageResult<()> {
        let store = Self::build_store(bucket)?;
        let mut listing = store.list(None);
        match listing.next().await {
            Some(Err(e)) => Err(StorageError::BackendError(format!(
                "Cannot list bucket '{}': {}",
                bucket.name, e
            ))),
            _ => Ok(()),
        }
    }
}
