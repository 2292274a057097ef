//! Provider adapters translating normalized messages to backend wire formats

mod anthropic;
mod client;
mod google;
mod local;
mod models;
mod offline;
mod openai;
mod request;
mod response;

pub use anthropic::AnthropicAdapter;
pub use client::HttpTransport;
pub use google::GoogleAdapter;
pub use local::{LocalAdapter, DEFAULT_LOCAL_ENDPOINT};
pub use models::{available_models, ModelInfo};
pub use offline::OfflineAdapter;
pub use openai::OpenAiAdapter;
pub use request::{last_user_message, split_system, Message, Role};
pub use response::{GatewayResponse, TokenUsage};

use crate::config::ProviderProfile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0} API key is missing")]
    MissingCredential(ProviderKind),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Backend families the gateway can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Keyword responder, never touches the network
    #[serde(rename = "basic", alias = "offline")]
    Offline,
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Google,
    /// Ollama on the loopback interface
    Local,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::Offline,
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Google,
        ProviderKind::Local,
    ];

    /// Identifier used in persisted profiles and usage records
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Offline => "basic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::Local => "local",
        }
    }

    pub fn requires_credential(&self) -> bool {
        matches!(
            self,
            ProviderKind::OpenAi | ProviderKind::Anthropic | ProviderKind::Google
        )
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Offline => "Basic",
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Google => "Google",
            ProviderKind::Local => "Local",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" | "offline" => Ok(ProviderKind::Offline),
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "google" | "gemini" => Ok(ProviderKind::Google),
            "local" | "ollama" => Ok(ProviderKind::Local),
            other => Err(format!("unknown provider kind: {}", other)),
        }
    }
}

/// Per-kind translator between normalized messages and one backend.
///
/// Implementations never return an error: every failure is folded into a
/// `GatewayResponse` with `success == false`.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn invoke(&self, profile: &ProviderProfile, messages: &[Message]) -> GatewayResponse;
}

/// One adapter per provider kind, resolved by exhaustive match
#[derive(Clone)]
pub struct Adapters {
    offline: Arc<dyn ProviderAdapter>,
    openai: Arc<dyn ProviderAdapter>,
    anthropic: Arc<dyn ProviderAdapter>,
    google: Arc<dyn ProviderAdapter>,
    local: Arc<dyn ProviderAdapter>,
}

impl Adapters {
    /// Build the HTTP-backed adapters sharing one client with a per-call timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, ApiError> {
        let http = HttpTransport::new(timeout)?;
        Ok(Self {
            offline: Arc::new(OfflineAdapter),
            openai: Arc::new(OpenAiAdapter::new(http.clone())),
            anthropic: Arc::new(AnthropicAdapter::new(http.clone())),
            google: Arc::new(GoogleAdapter::new(http.clone())),
            local: Arc::new(LocalAdapter::new(http)),
        })
    }

    pub fn for_kind(&self, kind: ProviderKind) -> &Arc<dyn ProviderAdapter> {
        match kind {
            ProviderKind::Offline => &self.offline,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Google => &self.google,
            ProviderKind::Local => &self.local,
        }
    }

    /// Replace the adapter used for one kind
    pub fn with_adapter(mut self, kind: ProviderKind, adapter: Arc<dyn ProviderAdapter>) -> Self {
        let slot = match kind {
            ProviderKind::Offline => &mut self.offline,
            ProviderKind::OpenAi => &mut self.openai,
            ProviderKind::Anthropic => &mut self.anthropic,
            ProviderKind::Google => &mut self.google,
            ProviderKind::Local => &mut self.local,
        };
        *slot = adapter;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_persisted_names() {
        for kind in ProviderKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            let back: ProviderKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn test_offline_alias() {
        let kind: ProviderKind = serde_json::from_str("\"offline\"").unwrap();
        assert_eq!(kind, ProviderKind::Offline);
        assert_eq!("Ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Local);
        assert!("mistral".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_credential_requirements() {
        assert!(ProviderKind::OpenAi.requires_credential());
        assert!(ProviderKind::Google.requires_credential());
        assert!(!ProviderKind::Local.requires_credential());
        assert!(!ProviderKind::Offline.requires_credential());
    }

    #[test]
    fn test_missing_credential_message() {
        let err = ApiError::MissingCredential(ProviderKind::Anthropic);
        assert_eq!(err.to_string(), "Anthropic API key is missing");
    }
}
