//! Token usage accounting
//!
//! Upstream providers report token counts under several historical field
//! names. `TokenUsage::from_raw` normalizes them with a fixed fallback
//! precedence so downstream accounting sees one shape.

use serde::{Deserialize, Serialize};

/// Usage payload as reported by the upstream provider, fields optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,

    /// Legacy name for input tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,

    /// Legacy name for output tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
}

/// Normalized token counts for one assistant turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Derive normalized counts from a raw provider payload.
    ///
    /// Precedence: input falls back from `input_tokens` to `prompt_tokens`
    /// to `total_tokens`; output falls back from `output_tokens` to
    /// `completion_tokens` to `total - input` clamped at zero; total falls
    /// back to the sum of the resolved halves. A missing payload derives
    /// to all zeros.
    pub fn from_raw(raw: &RawUsage) -> Self {
        let input = raw
            .input_tokens
            .or(raw.prompt_tokens)
            .or(raw.total_tokens)
            .unwrap_or(0);

        let output = raw
            .output_tokens
            .or(raw.completion_tokens)
            .or(raw.total_tokens.map(|total| total.saturating_sub(input)))
            .unwrap_or(0);

        let total = raw.total_tokens.unwrap_or_else(|| {
            let input_half = raw.input_tokens.or(raw.prompt_tokens).unwrap_or(0);
            let output_half = raw.output_tokens.or(raw.completion_tokens).unwrap_or(0);
            input_half + output_half
        });

        Self {
            input_tokens: input,
            output_tokens: output,
            total_tokens: total,
        }
    }
}

/// Dollar cost of one assistant turn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSummary {
    pub input_usd: f64,
    pub output_usd: f64,
    pub total_usd: f64,
}

/// Final usage summary attached to a finished turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    #[serde(flatten)]
    pub tokens: TokenUsage,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostSummary>,
}

impl UsageSummary {
    /// Summary with token counts only
    pub fn tokens_only(tokens: TokenUsage) -> Self {
        Self {
            tokens,
            model_id: None,
            cost: None,
        }
    }
}
