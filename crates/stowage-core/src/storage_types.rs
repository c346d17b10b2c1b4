use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend types
///
/// Buckets carry their backend as a free-form tag so that rows written by the
/// admin layer with a tag this build does not know can still be loaded; the
/// provider registry is where an unknown tag becomes an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    /// Amazon S3
    S3,
    /// Backblaze B2 through its S3-compatible API
    B2,
    /// Cloudflare R2
    R2,
}

impl StorageBackend {
    pub const ALL: [StorageBackend; 4] = [
        StorageBackend::Local,
        StorageBackend::S3,
        StorageBackend::B2,
        StorageBackend::R2,
    ];
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "s3" | "aws_s3" => Ok(StorageBackend::S3),
            "b2" | "backblaze" => Ok(StorageBackend::B2),
            "r2" | "cloudflare_r2" => Ok(StorageBackend::R2),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::Local => write!(f, "local"),
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::B2 => write!(f, "b2"),
            StorageBackend::R2 => write!(f, "r2"),
        }
    }
}
