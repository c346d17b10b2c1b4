//! Setting keys, defaults and fixed names shared across crates.

use std::time::Duration;

/// Variant name of the instance created at ingestion.
pub const ORIGINAL_VARIANT: &str = "original";

/// Setting key: how many buckets a single file is written to.
pub const SETTING_REDUNDANCY_COPIES: &str = "storage_redundancy_copies";

/// Setting key: whether variants are derived automatically after upload.
pub const SETTING_AUTO_GENERATE_VARIANTS: &str = "storage_auto_generate_variants";

pub const DEFAULT_REDUNDANCY_COPIES: usize = 1;
pub const MIN_REDUNDANCY_COPIES: usize = 1;
pub const MAX_REDUNDANCY_COPIES: usize = 5;
pub const DEFAULT_AUTO_GENERATE_VARIANTS: bool = true;

/// Lifetime of the cached enabled-bucket list.
pub const BUCKET_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Deadline for one variant batch (all dimensions of one file).
pub const VARIANT_BATCH_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Deadline for a single external tool invocation.
pub const TOOL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Parse a redundancy setting value, clamped to the supported range.
///
/// Unparseable values fall back to the default.
pub fn parse_redundancy(raw: Option<&str>) -> usize {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .map(|n| n.clamp(MIN_REDUNDANCY_COPIES as i64, MAX_REDUNDANCY_COPIES as i64) as usize)
        .unwrap_or(DEFAULT_REDUNDANCY_COPIES)
}

/// Parse a boolean setting value ("true"/"false", "1"/"0", "yes"/"no", "on"/"off").
pub fn parse_flag(raw: Option<&str>, default: bool) -> bool {
    match raw.map(|v| v.trim().to_lowercase()) {
        Some(v) if matches!(v.as_str(), "true" | "1" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "false" | "0" | "no" | "off") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redundancy_is_clamped() {
        assert_eq!(parse_redundancy(None), 1);
        assert_eq!(parse_redundancy(Some("3")), 3);
        assert_eq!(parse_redundancy(Some("0")), 1);
        assert_eq!(parse_redundancy(Some("-4")), 1);
        assert_eq!(parse_redundancy(Some("12")), 5);
        assert_eq!(parse_redundancy(Some("two")), 1);
    }

    #[test]
    fn flags_fall_back_to_default() {
        assert!(parse_flag(Some("TRUE"), false));
        assert!(!parse_flag(Some("off"), true));
        assert!(parse_flag(None, true));
        assert!(!parse_flag(Some("maybe"), false));
    }
}
