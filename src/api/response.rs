//! Normalized gateway response structures

use serde::{Deserialize, Serialize};

/// Outcome of one adapter attempt or of a whole `chat` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub success: bool,

    /// Assistant text (present, possibly empty, on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Human readable failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Token counters reported by the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub tokens_in: u32,
    /// Tokens in the response
    pub tokens_out: u32,
    /// Total tokens used
    pub tokens_total: u32,
}

impl TokenUsage {
    pub fn new(tokens_in: u32, tokens_out: u32) -> Self {
        Self {
            tokens_in,
            tokens_out,
            tokens_total: tokens_in.saturating_add(tokens_out),
        }
    }

    /// Use the backend's own total when it reports one
    pub fn with_total(tokens_in: u32, tokens_out: u32, total: Option<u32>) -> Self {
        Self {
            tokens_in,
            tokens_out,
            tokens_total: total.unwrap_or_else(|| tokens_in.saturating_add(tokens_out)),
        }
    }
}

impl GatewayResponse {
    pub fn success(content: impl Into<String>, usage: Option<TokenUsage>) -> Self {
        Self {
            success: true,
            content: Some(content.into()),
            error: None,
            usage,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            content: None,
            error: Some(error.into()),
            usage: None,
        }
    }

    /// Usage counters, zero when the backend reported none
    pub fn usage_or_default(&self) -> TokenUsage {
        self.usage.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_falls_back_to_sum() {
        assert_eq!(TokenUsage::with_total(10, 5, None).tokens_total, 15);
        assert_eq!(TokenUsage::with_total(10, 5, Some(20)).tokens_total, 20);
    }

    #[test]
    fn test_total_saturates() {
        assert_eq!(TokenUsage::new(u32::MAX, 1).tokens_total, u32::MAX);
        assert_eq!(TokenUsage::with_total(u32::MAX, u32::MAX, None).tokens_total, u32::MAX);
    }

    #[test]
    fn test_failure_serialization_omits_content() {
        let json = serde_json::to_value(GatewayResponse::failure("boom")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert!(json.get("content").is_none());
        assert!(json.get("usage").is_none());
    }
}
