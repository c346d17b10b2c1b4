//! Stowage Core Library
//!
//! This crate provides the domain models, error types, configuration and setting
//! keys shared by the storage manager, the variant generator and the database layer.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::AppError;
pub use storage_types::StorageBackend;
// Note: StorageProvider and StorageError live in stowage-storage
