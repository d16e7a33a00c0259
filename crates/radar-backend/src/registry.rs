//! Explicit registration table for content-storage backends.
//!
//! Backends are looked up by name at configuration time; the table is
//! built at process start and passed to whoever needs it, so there is no
//! process-wide implicit registry.

use std::collections::HashMap;
use std::sync::Arc;

use radar_common::{RadarError, RadarResult};
use radar_storage::{BlobStorage, ContentStorage, LargeObjectStorage};

type Factory = Box<dyn Fn() -> Arc<dyn ContentStorage> + Send + Sync>;

/// Name-to-factory table for [`ContentStorage`] implementations.
pub struct StorageRegistry {
    factories: HashMap<String, Factory>,
}

impl StorageRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// The standard table: `"db"` for blob rows, `"lo"` for PostgreSQL
    /// large objects.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("db", || Arc::new(BlobStorage));
        registry.register("lo", || Arc::new(LargeObjectStorage));
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Arc<dyn ContentStorage> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Instantiate the backend registered under `name`.
    pub fn create(&self, name: &str) -> RadarResult<Arc<dyn ContentStorage>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| RadarError::Lookup(format!("no storage backend named {:?}", name)))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for StorageRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_registered() {
        let registry = StorageRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["db", "lo"]);
        assert!(registry.create("db").is_ok());
        assert!(registry.create("lo").is_ok());
    }

    #[test]
    fn test_unknown_backend_is_lookup_error() {
        let registry = StorageRegistry::with_defaults();
        assert!(matches!(
            registry.create("s3").unwrap_err(),
            RadarError::Lookup(_)
        ));
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = StorageRegistry::new();
        registry.register("blob", || Arc::new(BlobStorage));
        assert!(registry.create("blob").is_ok());
        assert!(registry.create("db").is_err());
    }
}
