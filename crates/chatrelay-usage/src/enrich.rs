//! Usage enrichment
//!
//! Maps normalized token counts to the usage summary attached to a
//! finished turn, pricing the turn when the model is in the catalog.

use crate::cache::CatalogCache;
use async_trait::async_trait;
use chatrelay_core::{CostSummary, Result, TokenUsage, UsageSummary};
use std::sync::Arc;

/// Seam for attaching cost/model metadata to a turn's token counts
#[async_trait]
pub trait UsageEnricher: Send + Sync {
    /// Build the final usage summary for a turn
    async fn enrich(&self, tokens: TokenUsage, model: Option<&str>) -> Result<UsageSummary>;
}

/// Enricher that passes token counts through without pricing
#[derive(Debug, Clone, Default)]
pub struct NoEnrichment;

#[async_trait]
impl UsageEnricher for NoEnrichment {
    async fn enrich(&self, tokens: TokenUsage, model: Option<&str>) -> Result<UsageSummary> {
        Ok(UsageSummary {
            tokens,
            model_id: model.map(str::to_string),
            cost: None,
        })
    }
}

/// Enricher backed by the pricing catalog cache
pub struct CatalogEnricher {
    cache: Arc<CatalogCache>,
}

impl CatalogEnricher {
    /// Create an enricher over the given cache
    pub fn new(cache: Arc<CatalogCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl UsageEnricher for CatalogEnricher {
    async fn enrich(&self, tokens: TokenUsage, model: Option<&str>) -> Result<UsageSummary> {
        let mut summary = UsageSummary {
            tokens,
            model_id: model.map(str::to_string),
            cost: None,
        };

        // Pricing only applies to turns that actually consumed tokens
        let Some(model_id) = model else {
            return Ok(summary);
        };
        if tokens.total_tokens == 0 {
            return Ok(summary);
        }

        if let Some(catalog) = self.cache.get().await {
            if let Some(pricing) = catalog.pricing(model_id) {
                summary.cost = Some(price_turn(&tokens, pricing));
            }
        }

        Ok(summary)
    }
}

fn price_turn(tokens: &TokenUsage, pricing: &crate::catalog::ModelPricing) -> CostSummary {
    let input_usd = tokens.input_tokens as f64 / 1_000_000.0 * pricing.input_per_million;
    let output_usd = tokens.output_tokens as f64 / 1_000_000.0 * pricing.output_per_million;
    CostSummary {
        input_usd,
        output_usd,
        total_usd: input_usd + output_usd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalogSource;
    use std::time::Duration;

    fn catalog_enricher() -> CatalogEnricher {
        let cache = CatalogCache::new(
            Arc::new(StaticCatalogSource::builtin()),
            Duration::from_secs(3600),
        );
        CatalogEnricher::new(Arc::new(cache))
    }

    fn tokens(input: u64, output: u64) -> TokenUsage {
        TokenUsage {
            input_tokens: input,
            output_tokens: output,
            total_tokens: input + output,
        }
    }

    #[tokio::test]
    async fn test_known_model_is_priced() {
        let summary = catalog_enricher()
            .enrich(tokens(1_000_000, 1_000_000), Some("gpt-4o-mini"))
            .await
            .unwrap();

        let cost = summary.cost.expect("priced");
        assert!((cost.input_usd - 0.15).abs() < 1e-9);
        assert!((cost.output_usd - 0.60).abs() < 1e-9);
        assert!((cost.total_usd - 0.75).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unknown_model_keeps_tokens_only() {
        let summary = catalog_enricher()
            .enrich(tokens(10, 5), Some("mystery-model"))
            .await
            .unwrap();

        assert_eq!(summary.model_id.as_deref(), Some("mystery-model"));
        assert!(summary.cost.is_none());
    }

    #[tokio::test]
    async fn test_zero_usage_is_not_priced() {
        let summary = catalog_enricher()
            .enrich(TokenUsage::default(), Some("gpt-4o-mini"))
            .await
            .unwrap();
        assert!(summary.cost.is_none());
    }

    #[tokio::test]
    async fn test_no_enrichment_passthrough() {
        let summary = NoEnrichment
            .enrich(tokens(3, 4), None)
            .await
            .unwrap();
        assert_eq!(summary.tokens.total_tokens, 7);
        assert!(summary.model_id.is_none());
        assert!(summary.cost.is_none());
    }
}
