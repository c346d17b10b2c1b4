use std::time::Duration;
use stowage_core::AppError;
use stowage_storage::StorageError;
use thiserror::Error;
use uuid::Uuid;

/// External tool failures
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0} is not installed or not on PATH")]
    NotInstalled(String),

    #[error("{tool} failed ({status}): {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{tool} timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    #[error("Invalid tool path: {0}")]
    InvalidPath(String),

    #[error("Unexpected output from {tool}: {message}")]
    InvalidOutput { tool: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Variant generation failures
#[derive(Debug, Error)]
pub enum VariantError {
    #[error("File {0} has no storage path")]
    MissingFilePath(Uuid),

    #[error("File {file_id} ({mime_type}) has no variant pipeline")]
    UnsupportedSource { file_id: Uuid, mime_type: String },

    #[error("The original instance cannot be removed as a variant")]
    OriginalNotDeletable,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Repository error: {0}")]
    Repository(#[from] AppError),

    #[error("Failed to record variant locations: {0}")]
    LocationCreation(#[source] AppError),

    #[error("All {} variants failed", .0.len())]
    AllFailed(Vec<(String, String)>),

    #[error("Variant batch exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Variant task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
