//! Hot-swappable holder for the current catalog snapshot.

use std::sync::{Arc, PoisonError, RwLock};

use crate::catalog::SchemaCatalog;
use crate::error::CatalogError;

/// Holds the catalog every new validation reads from.
///
/// Readers take the lock only long enough to clone the `Arc`, so a validation keeps
/// the snapshot it started with even if a newer version is published mid-flight.
#[derive(Debug)]
pub struct CatalogStore {
    current: RwLock<Arc<SchemaCatalog>>,
}

impl CatalogStore {
    pub fn new(catalog: SchemaCatalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// The catalog new validations should use.
    pub fn snapshot(&self) -> Arc<SchemaCatalog> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version()
    }

    /// Replace the current catalog. The new version must be strictly greater than
    /// the current one. Returns the version that was replaced.
    pub fn publish(&self, catalog: SchemaCatalog) -> Result<u64, CatalogError> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let current = guard.version();
        if catalog.version() <= current {
            tracing::warn!(
                current,
                proposed = catalog.version(),
                "Refusing to publish stale catalog"
            );
            return Err(CatalogError::StaleVersion {
                current,
                proposed: catalog.version(),
            });
        }

        tracing::info!(
            previous = current,
            version = catalog.version(),
            tables = catalog.table_count(),
            "Published schema catalog"
        );
        *guard = Arc::new(catalog);
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlgate_core::SchemaCatalogConfig;

    fn catalog(version: u64) -> SchemaCatalog {
        let config = SchemaCatalogConfig {
            version,
            ..Default::default()
        }
        .with_table("seller", &[("id", "integer")]);
        SchemaCatalog::from_config(&config).unwrap()
    }

    #[test]
    fn test_publish_newer_version() {
        let store = CatalogStore::new(catalog(1));
        let before = store.snapshot();
        assert_eq!(store.publish(catalog(2)).unwrap(), 1);
        assert_eq!(store.version(), 2);
        // Snapshots taken earlier are unaffected.
        assert_eq!(before.version(), 1);
    }

    #[test]
    fn test_publish_rejects_stale_versions() {
        let store = CatalogStore::new(catalog(5));
        assert_eq!(
            store.publish(catalog(5)).unwrap_err(),
            CatalogError::StaleVersion {
                current: 5,
                proposed: 5
            }
        );
        assert!(store.publish(catalog(3)).is_err());
        assert_eq!(store.version(), 5);
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let store = Arc::new(CatalogStore::new(catalog(1)));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let snapshot = store.snapshot();
                        assert!(snapshot.table("seller").is_some());
                    }
                })
            })
            .collect();
        for version in 2..20 {
            store.publish(catalog(version)).unwrap();
        }
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.version(), 19);
    }
}
