//! Catalog cache
//!
//! Holds one catalog with an explicit time-to-live. Lookups within the
//! TTL serve the cached copy; a miss or an expired entry triggers a
//! refetch. Fetch failures fall back to the stale copy when one exists —
//! pricing data is best-effort and must never fail a turn.

use crate::catalog::{CatalogSource, ModelCatalog};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct CachedCatalog {
    catalog: Arc<ModelCatalog>,
    fetched_at: Instant,
}

/// TTL cache over a catalog source
pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    ttl: Duration,
    state: Mutex<Option<CachedCatalog>>,
}

impl CatalogCache {
    /// Default catalog time-to-live
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Create a cache over the given source
    pub fn new(source: Arc<dyn CatalogSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            state: Mutex::new(None),
        }
    }

    /// Get the current catalog, refetching when the cached copy expired.
    ///
    /// Returns `None` only when no fetch has ever succeeded.
    pub async fn get(&self) -> Option<Arc<ModelCatalog>> {
        let mut state = self.state.lock().await;

        if let Some(cached) = state.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Some(Arc::clone(&cached.catalog));
            }
        }

        match self.source.fetch().await {
            Ok(catalog) => {
                let catalog = Arc::new(catalog);
                *state = Some(CachedCatalog {
                    catalog: Arc::clone(&catalog),
                    fetched_at: Instant::now(),
                });
                Some(catalog)
            }
            Err(e) => {
                tracing::warn!(error = %e, "catalog refresh failed, serving stale copy");
                state.as_ref().map(|cached| Arc::clone(&cached.catalog))
            }
        }
    }
}
