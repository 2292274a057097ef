//! Static per-model pricing used for cost estimates

use crate::api::ProviderKind;

/// Cost per 1000 tokens, in euros
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPrice {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

const fn price(input_per_1k: f64, output_per_1k: f64) -> ModelPrice {
    ModelPrice {
        input_per_1k,
        output_per_1k,
    }
}

const PRICES: &[(ProviderKind, &str, ModelPrice)] = &[
    (ProviderKind::OpenAi, "gpt-4o", price(0.0025, 0.01)),
    (ProviderKind::OpenAi, "gpt-4-turbo", price(0.01, 0.03)),
    (ProviderKind::OpenAi, "gpt-4", price(0.03, 0.06)),
    (ProviderKind::OpenAi, "gpt-3.5-turbo", price(0.0005, 0.0015)),
    (ProviderKind::Anthropic, "claude-3-5-sonnet-20241022", price(0.003, 0.015)),
    (ProviderKind::Anthropic, "claude-3-opus-20240229", price(0.015, 0.075)),
    (ProviderKind::Anthropic, "claude-3-sonnet-20240229", price(0.003, 0.015)),
    (ProviderKind::Anthropic, "claude-3-haiku-20240307", price(0.00025, 0.00125)),
    // Gemini free tier
    (ProviderKind::Google, "gemini-2.5-flash", price(0.0, 0.0)),
    (ProviderKind::Google, "gemini-2.5-pro", price(0.0, 0.0)),
    (ProviderKind::Google, "gemini-2.0-flash", price(0.0, 0.0)),
    (ProviderKind::Google, "gemini-flash-latest", price(0.0, 0.0)),
];

/// Registered price for a model, if any
pub fn price_for(kind: ProviderKind, model_id: &str) -> Option<ModelPrice> {
    PRICES
        .iter()
        .find(|(k, m, _)| *k == kind && *m == model_id)
        .map(|(_, _, p)| *p)
}

/// Estimated cost of one call; unregistered (kind, model) pairs cost nothing
pub fn estimate_cost(kind: ProviderKind, model_id: &str, tokens_in: u32, tokens_out: u32) -> f64 {
    match price_for(kind, model_id) {
        Some(p) => {
            (tokens_in as f64 / 1000.0) * p.input_per_1k
                + (tokens_out as f64 / 1000.0) * p.output_per_1k
        }
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_model_cost() {
        let cost = estimate_cost(ProviderKind::OpenAi, "gpt-4", 1000, 500);
        assert!((cost - 0.06).abs() < 1e-12);

        let cost = estimate_cost(ProviderKind::Anthropic, "claude-3-haiku-20240307", 2000, 2000);
        assert!((cost - 0.003).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_pairs_cost_zero() {
        assert_eq!(estimate_cost(ProviderKind::OpenAi, "gpt-unknown", 10_000, 10_000), 0.0);
        assert_eq!(estimate_cost(ProviderKind::Local, "mistral", 10_000, 10_000), 0.0);
        // model registered under a different kind
        assert_eq!(estimate_cost(ProviderKind::Google, "gpt-4o", 10_000, 10_000), 0.0);
        assert!(price_for(ProviderKind::Offline, "basic").is_none());
    }
}
