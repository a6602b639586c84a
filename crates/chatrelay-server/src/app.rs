//! Application state wiring

use crate::auth::{SessionProvider, StaticTokenProvider};
use crate::config::ServerConfig;
use anyhow::Result;
use chatrelay_session::{ChatStore, MemoryStore, RateLimiter, StreamRegistry};
use chatrelay_upstream::ResponsesClient;
use chatrelay_usage::{CatalogCache, CatalogEnricher, StaticCatalogSource, UsageEnricher};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,

    /// Chat persistence
    pub store: Arc<dyn ChatStore>,

    /// Resumable delivery registry, absent when disabled
    pub registry: Option<StreamRegistry>,

    /// Upstream provider client
    pub client: ResponsesClient,

    /// Per-user message limiter
    pub limiter: Arc<RateLimiter>,

    /// Usage enrichment seam
    pub enricher: Arc<dyn UsageEnricher>,

    /// Session source
    pub sessions: Arc<dyn SessionProvider>,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    /// Initialize application state from configuration
    pub fn new(config: ServerConfig, metrics_handle: PrometheusHandle) -> Result<Self> {
        Self::with_store(config, Arc::new(MemoryStore::new()), metrics_handle)
    }

    /// Initialize with an explicit store (tests, alternative backends)
    pub fn with_store(
        config: ServerConfig,
        store: Arc<dyn ChatStore>,
        metrics_handle: PrometheusHandle,
    ) -> Result<Self> {
        info!("Initializing application state");

        let client = ResponsesClient::new(
            config.upstream.base_url.clone(),
            config.upstream.api_key.clone(),
        )?;

        let registry = config
            .resumable
            .enabled
            .then(|| StreamRegistry::new(config.resumable.stream_capacity));
        if registry.is_none() {
            info!("Resumable streams disabled, serving live streams only");
        }

        let cache = CatalogCache::new(
            Arc::new(StaticCatalogSource::builtin()),
            Duration::from_secs(config.catalog_ttl_secs),
        );
        let enricher: Arc<dyn UsageEnricher> = Arc::new(CatalogEnricher::new(Arc::new(cache)));

        let limiter = Arc::new(RateLimiter::new(Arc::clone(&store)));
        let sessions: Arc<dyn SessionProvider> =
            Arc::new(StaticTokenProvider::from_config(&config.tokens));
        info!("Loaded {} bearer tokens", config.tokens.len());

        Ok(Self {
            config: Arc::new(config),
            store,
            registry,
            client,
            limiter,
            enricher,
            sessions,
            metrics_handle,
        })
    }
}
