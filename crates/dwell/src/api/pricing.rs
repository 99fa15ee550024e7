//! Approximate per-model pricing for cost estimates.
//!
//! OpenRouter only reports cost when usage accounting is on, so the client
//! falls back to these tables. Estimates are for spotting a runaway
//! session, not for billing.

/// USD per 1M tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    pub fn estimate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1_000_000.0) * self.input_per_million
            + (output_tokens as f64 / 1_000_000.0) * self.output_per_million
    }
}

impl Default for ModelPricing {
    fn default() -> Self {
        Self::new(3.0, 15.0)
    }
}

/// Checked in order; first substring match on the model name segment wins,
/// so more specific names come first.
const PRICING_TABLE: &[(&str, ModelPricing)] = &[
    ("opus", ModelPricing::new(15.0, 75.0)),
    ("sonnet", ModelPricing::new(3.0, 15.0)),
    ("haiku", ModelPricing::new(0.80, 4.0)),
    ("4o-mini", ModelPricing::new(0.15, 0.60)),
    ("gpt-4o", ModelPricing::new(2.50, 10.0)),
    ("flash", ModelPricing::new(0.30, 2.50)),
    ("gemini", ModelPricing::new(1.25, 10.0)),
    ("deepseek", ModelPricing::new(0.27, 1.10)),
    ("glm", ModelPricing::new(0.60, 2.20)),
];

/// Look up pricing by model name.
///
/// Matches on the segment after the last `/` (`"claude-sonnet-4"` in
/// `"anthropic/claude-sonnet-4"`) so org prefixes can't cause false hits.
pub fn pricing_for_model(model: &str) -> ModelPricing {
    let name = model.rsplit('/').next().unwrap_or(model).to_lowercase();
    PRICING_TABLE
        .iter()
        .find(|(needle, _)| name.contains(needle))
        .map(|(_, pricing)| *pricing)
        .unwrap_or_default()
}
