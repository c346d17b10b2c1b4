#[cfg(feature = "storage-local")]
use crate::LocalProvider;
#[cfg(feature = "storage-s3")]
use crate::S3Provider;
use crate::{StorageBackend, StorageError, StorageProvider, StorageResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Lookup table from backend tag to provider.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn StorageProvider>>,
}

impl ProviderRegistry {
    /// Empty registry; see [`ProviderRegistry::with_defaults`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the built-in providers for every backend compiled in.
    ///
    /// `local_root` is the root for local buckets that do not set their own.
    pub fn with_defaults(local_root: impl Into<PathBuf>) -> Self {
        let mut registry = Self::new();
        let local_root = local_root.into();

        for backend in StorageBackend::ALL {
            match backend {
                #[cfg(feature = "storage-local")]
                StorageBackend::Local => {
                    registry.register(backend, Arc::new(LocalProvider::new(local_root.clone())));
                }

                #[cfg(feature = "storage-s3")]
                StorageBackend::S3 | StorageBackend::B2 | StorageBackend::R2 => {
                    registry.register(backend, Arc::new(S3Provider::new()));
                }

                #[allow(unreachable_patterns)]
                _ => {
                    tracing::debug!(backend = %backend, "Storage backend not compiled in");
                }
            }
        }

        registry
    }

    pub fn register(&mut self, backend: StorageBackend, provider: Arc<dyn StorageProvider>) {
        self.register_tag(&backend.to_string(), provider);
    }

    /// Register under a free-form tag (custom backends, tests).
    pub fn register_tag(&mut self, tag: &str, provider: Arc<dyn StorageProvider>) {
        self.providers.insert(tag.to_lowercase(), provider);
    }

    /// Resolve a bucket's backend tag.
    pub fn get(&self, tag: &str) -> StorageResult<Arc<dyn StorageProvider>> {
        let key = tag
            .parse::<StorageBackend>()
            .map(|b| b.to_string())
            .unwrap_or_else(|_| tag.to_lowercase());
        self.providers
            .get(&key)
            .cloned()
            .ok_or_else(|| StorageError::UnknownProvider(tag.to_string()))
    }

    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.providers.keys().cloned().collect();
        tags.sort();
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tag() {
        let registry = ProviderRegistry::with_defaults("priv/uploads");
        assert!(matches!(
            registry.get("ftp"),
            Err(StorageError::UnknownProvider(tag)) if tag == "ftp"
        ));
    }

    #[cfg(all(feature = "storage-local", feature = "storage-s3"))]
    #[test]
    fn test_defaults_cover_every_backend() {
        let registry = ProviderRegistry::with_defaults("priv/uploads");
        assert_eq!(registry.tags(), vec!["b2", "local", "r2", "s3"]);
        assert!(registry.get("S3").is_ok());
        assert!(registry.get("backblaze").is_ok());
    }

    #[test]
    fn test_custom_tag() {
        let mut registry = ProviderRegistry::new();
        registry.register_tag(
            "memory",
            Arc::new(crate::test_helpers::MemoryProvider::new()),
        );
        assert!(registry.get("memory").is_ok());
        assert!(registry.get("local").is_err());
    }
}
