//! chatrelay Usage
//!
//! Best-effort usage accounting for finished turns: a model pricing
//! catalog behind an explicit TTL cache, and the enrichment seam that
//! turns normalized token counts into the summary delivered to clients.

pub mod cache;
pub mod catalog;
pub mod enrich;

pub use cache::CatalogCache;
pub use catalog::{CatalogSource, ModelCatalog, ModelPricing, StaticCatalogSource};
pub use enrich::{CatalogEnricher, NoEnrichment, UsageEnricher};
