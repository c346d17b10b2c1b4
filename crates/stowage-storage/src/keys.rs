//! Shared remote path generation for storage backends.
//!
//! Generated format: `{stem}_{YYYYMMDDTHHMMSSZ}_{8 hex}.{ext}`. The random suffix
//! keeps concurrent uploads of the same file name apart.

use chrono::{DateTime, Utc};
use std::path::Path;

/// Generate a unique remote file name for `file_name`.
pub fn generate_path(file_name: &str) -> String {
    generate_path_at(file_name, Utc::now(), rand::random::<[u8; 4]>())
}

fn generate_path_at(file_name: &str, now: DateTime<Utc>, suffix: [u8; 4]) -> String {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("file");
    let timestamp = now.format("%Y%m%dT%H%M%SZ");
    let random = hex::encode(suffix);

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}_{}.{}", stem, timestamp, random, ext),
        None => format!("{}_{}_{}", stem, timestamp, random),
    }
}

/// Join a caller prefix and a file name with exactly one separator.
pub fn join(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", prefix, file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generated_path_has_timestamp_and_suffix() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap();
        assert_eq!(
            generate_path_at("photo.jpg", now, [0xde, 0xad, 0xbe, 0xef]),
            "photo_20240501T123005Z_deadbeef.jpg"
        );
        assert_eq!(
            generate_path_at("README", now, [0, 1, 2, 3]),
            "README_20240501T123005Z_00010203"
        );
    }

    #[test]
    fn generated_paths_differ() {
        assert_ne!(generate_path("a.png"), generate_path("a.png"));
    }

    #[test]
    fn join_normalizes_slashes() {
        assert_eq!(join("2024/05/", "a.jpg"), "2024/05/a.jpg");
        assert_eq!(join("", "a.jpg"), "a.jpg");
        assert_eq!(join("/x", "a.jpg"), "x/a.jpg");
    }
}
