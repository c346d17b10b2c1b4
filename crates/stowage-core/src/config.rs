//! Configuration module
//!
//! Process-level settings: database connection, default local storage root,
//! external tool locations and deadlines. Per-bucket credentials and the two
//! runtime settings (redundancy, auto-generate) live in the database instead.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{BUCKET_CACHE_TTL, TOOL_TIMEOUT, VARIANT_BATCH_TIMEOUT};

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const LOCAL_ROOT: &str = "priv/uploads";

/// Locations of the external media tools.
#[derive(Clone, Debug)]
pub struct ToolPaths {
    pub magick: String,
    pub ffmpeg: String,
    pub ffprobe: String,
    pub pdftoppm: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            magick: "magick".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            pdftoppm: "pdftoppm".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Root used by local buckets that do not set their own.
    pub local_root: PathBuf,
    /// Where downloaded originals and produced variants are staged.
    pub temp_dir: PathBuf,
    pub tools: ToolPaths,
    pub tool_timeout: Duration,
    pub variant_batch_timeout: Duration,
    pub bucket_cache_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            local_root: PathBuf::from(LOCAL_ROOT),
            temp_dir: env::temp_dir(),
            tools: ToolPaths::default(),
            tool_timeout: TOOL_TIMEOUT,
            variant_batch_timeout: VARIANT_BATCH_TIMEOUT,
            bucket_cache_ttl: BUCKET_CACHE_TTL,
        }
    }
}

fn secs_from_env(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let config = Config {
            database_url,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            local_root: env::var("STOWAGE_LOCAL_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_root),
            temp_dir: env::var("STOWAGE_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_dir),
            tools: ToolPaths {
                magick: env::var("STOWAGE_MAGICK_PATH").unwrap_or(defaults.tools.magick),
                ffmpeg: env::var("STOWAGE_FFMPEG_PATH").unwrap_or(defaults.tools.ffmpeg),
                ffprobe: env::var("STOWAGE_FFPROBE_PATH").unwrap_or(defaults.tools.ffprobe),
                pdftoppm: env::var("STOWAGE_PDFTOPPM_PATH").unwrap_or(defaults.tools.pdftoppm),
            },
            tool_timeout: secs_from_env("STOWAGE_TOOL_TIMEOUT_SECS", defaults.tool_timeout),
            variant_batch_timeout: secs_from_env(
                "STOWAGE_VARIANT_TIMEOUT_SECS",
                defaults.variant_batch_timeout,
            ),
            bucket_cache_ttl: secs_from_env(
                "STOWAGE_BUCKET_CACHE_TTL_SECS",
                defaults.bucket_cache_ttl,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.is_empty()
            && !(self.database_url.starts_with("postgres://")
                || self.database_url.starts_with("postgresql://"))
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.tool_timeout.is_zero() || self.variant_batch_timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "STOWAGE_TOOL_TIMEOUT_SECS and STOWAGE_VARIANT_TIMEOUT_SECS must be greater than zero"
            ));
        }

        let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
        for (name, path) in [
            ("STOWAGE_MAGICK_PATH", &self.tools.magick),
            ("STOWAGE_FFMPEG_PATH", &self.tools.ffmpeg),
            ("STOWAGE_FFPROBE_PATH", &self.tools.ffprobe),
            ("STOWAGE_PDFTOPPM_PATH", &self.tools.pdftoppm),
        ] {
            if path.is_empty() || path.chars().any(|c| dangerous_chars.contains(&c)) {
                return Err(anyhow::anyhow!("{} contains invalid characters", name));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bucket_cache_ttl, Duration::from_secs(300));
    }

    #[test]
    fn rejects_shell_metacharacters_in_tool_paths() {
        let mut config = Config::default();
        config.tools.ffmpeg = "ffmpeg; rm -rf /".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_postgres_url() {
        let config = Config {
            database_url: "mysql://localhost/db".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_timeouts() {
        let config = Config {
            tool_timeout: Duration::ZERO,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
