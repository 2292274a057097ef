//! CareLink Gateway - AI provider gateway for the CareLink health assistant
//!
//! Routes chat requests to several heterogeneous chat-completion backends and
//! keeps the user-facing call working when one of them is down.
//!
//! ## Key Features
//!
//! - **Priority Failover**: active provider profiles are tried in priority order until one answers
//! - **Provider Adapters**: OpenAI, Anthropic, Google Gemini, a local Ollama server and an offline keyword responder
//! - **Usage Accounting**: every attempt is recorded in the background with token counts, estimated cost and latency
//! - **Profile Persistence**: provider profiles round-trip through a key-value secret store

pub mod api;
pub mod config;
pub mod metrics;
pub mod orchestrator;
pub mod tui;

pub use api::{
    available_models, Adapters, ApiError, GatewayResponse, Message, ModelInfo, ProviderAdapter,
    ProviderKind, Role, TokenUsage,
};
pub use config::{
    ConfigError, FileSecretStore, GatewaySettings, MemorySecretStore, ProfileStore,
    ProviderProfile, SecretStore,
};
pub use metrics::{
    JsonlUsageStore, MemoryUsageStore, UsageError, UsageRecord, UsageRecorder, UsageStats,
    UsageStore,
};
pub use orchestrator::Gateway;
