//! Model pricing catalog

use async_trait::async_trait;
use chatrelay_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-million-token pricing for one model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// USD per million input tokens
    pub input_per_million: f64,

    /// USD per million output tokens
    pub output_per_million: f64,
}

/// Catalog mapping model ids to pricing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelCatalog {
    models: HashMap<String, ModelPricing>,
}

impl ModelCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of commonly served models, used when no source is configured
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert(
            "gpt-4o",
            ModelPricing {
                input_per_million: 2.50,
                output_per_million: 10.00,
            },
        );
        catalog.insert(
            "gpt-4o-mini",
            ModelPricing {
                input_per_million: 0.15,
                output_per_million: 0.60,
            },
        );
        catalog.insert(
            "o4-mini",
            ModelPricing {
                input_per_million: 1.10,
                output_per_million: 4.40,
            },
        );
        catalog
    }

    /// Register pricing for a model
    pub fn insert(&mut self, model_id: impl Into<String>, pricing: ModelPricing) {
        self.models.insert(model_id.into(), pricing);
    }

    /// Look up pricing for a model
    pub fn pricing(&self, model_id: &str) -> Option<&ModelPricing> {
        self.models.get(model_id)
    }

    /// Number of priced models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Source of catalog data (remote pricing feed, config file, built-in table)
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch a fresh catalog
    async fn fetch(&self) -> Result<ModelCatalog>;
}

/// Source that always serves a fixed catalog
#[derive(Debug, Clone)]
pub struct StaticCatalogSource {
    catalog: ModelCatalog,
}

impl StaticCatalogSource {
    /// Serve the given catalog
    pub fn new(catalog: ModelCatalog) -> Self {
        Self { catalog }
    }

    /// Serve the built-in catalog
    pub fn builtin() -> Self {
        Self::new(ModelCatalog::builtin())
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn fetch(&self) -> Result<ModelCatalog> {
        Ok(self.catalog.clone())
    }
}
