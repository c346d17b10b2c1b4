//! Stowage Storage Library
//!
//! This crate provides the provider contract, the local and S3-compatible
//! providers, the provider registry and the storage manager that writes files
//! redundantly across buckets and reads them back with failover.
//!
//! # Path format
//!
//! Remote paths are relative (`2024/05/abc_thumbnail.jpg`). They must not contain
//! `..` or a leading `/`. Generated names are built in the `keys` module so all
//! backends see the same layout.

pub mod cache;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod manager;
pub mod registry;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

// Re-export commonly used types
pub use cache::BucketCache;
#[cfg(feature = "storage-local")]
pub use local::LocalProvider;
pub use manager::{
    ConnectionCheck, DeleteOutcome, RetrieveOpts, StorageManager, StoreOpts, StoreOutcome,
};
pub use registry::ProviderRegistry;
#[cfg(feature = "storage-s3")]
pub use s3::S3Provider;
pub use stowage_core::StorageBackend;
pub use traits::{StorageError, StorageProvider, StorageResult, StoreOptions};
