//! Gateway dispatch with priority failover
//!
//! The gateway owns the profile store and routes each `chat` call through the
//! active profiles, highest priority first:
//! - each attempt is bounded by a timeout and isolated from adapter panics
//! - every attempt is handed to the usage recorder without waiting on it
//! - the first successful reply is returned, later profiles are not called

use crate::api::{Adapters, ApiError, GatewayResponse, Message};
use crate::config::{self, ConfigError, GatewaySettings, ProfileStore, ProviderProfile, SecretStore};
use crate::metrics::{JsonlUsageStore, UsageRecorder};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Usage endpoint label for chat attempts
const CHAT_ENDPOINT: &str = "chat";

/// Dispatches chat requests across configured providers
pub struct Gateway {
    profiles: RwLock<ProfileStore>,
    /// Single profile set through `set_config`, used only while the store is empty
    legacy: RwLock<Option<ProviderProfile>>,
    adapters: Adapters,
    recorder: UsageRecorder,
    attempt_timeout: Duration,
}

impl Gateway {
    pub fn new(adapters: Adapters, recorder: UsageRecorder, attempt_timeout: Duration) -> Self {
        Self {
            profiles: RwLock::new(ProfileStore::new()),
            legacy: RwLock::new(None),
            adapters,
            recorder,
            attempt_timeout,
        }
    }

    /// Wire HTTP adapters and a file-backed usage recorder from settings.
    ///
    /// Must be called inside a tokio runtime.
    pub fn from_settings(settings: &GatewaySettings) -> Result<Self, ApiError> {
        let timeout = settings.request_timeout();
        let adapters = Adapters::with_timeout(timeout)?;
        let store = Arc::new(JsonlUsageStore::new(&settings.usage_log_path));
        let recorder = UsageRecorder::spawn(store, settings.usage_queue_capacity);

        Ok(Self::new(adapters, recorder, timeout))
    }

    pub fn recorder(&self) -> &UsageRecorder {
        &self.recorder
    }

    /// Send a conversation to the first provider that answers
    pub async fn chat(&self, messages: &[Message]) -> GatewayResponse {
        let (candidates, legacy) = {
            let store = self.profiles.read().await;
            if store.is_empty() {
                (Vec::new(), self.legacy.read().await.clone())
            } else {
                (store.active(), None)
            }
        };

        if let Some(profile) = legacy {
            debug!("Using single configured provider: {}", profile.label());
            return self.attempt(&profile, messages).await;
        }

        if candidates.is_empty() {
            warn!("Chat requested with no active provider");
            return GatewayResponse::failure("no active provider");
        }

        let total = candidates.len();
        let mut last_error = String::new();
        for (rank, profile) in candidates.iter().enumerate() {
            info!(
                "Trying provider {}/{}: {} (priority {})",
                rank + 1,
                total,
                profile.label(),
                profile.priority
            );

            let response = self.attempt(profile, messages).await;
            if response.success {
                if rank > 0 {
                    info!("Provider {} answered after {} failures", profile.label(), rank);
                }
                return response;
            }

            last_error = response.error.unwrap_or_else(|| "unknown error".to_string());
            warn!("Provider {} returned error: {}", profile.label(), last_error);
            if rank + 1 < total {
                info!("Falling back to next provider");
            }
        }

        warn!("All {} active providers failed", total);
        GatewayResponse::failure(format!(
            "{} providers attempted, all failed (last error: {})",
            total, last_error
        ))
    }

    /// One bounded adapter call, normalized and recorded
    async fn attempt(&self, profile: &ProviderProfile, messages: &[Message]) -> GatewayResponse {
        let adapter = self.adapters.for_kind(profile.kind);
        let started = Instant::now();

        let call = AssertUnwindSafe(adapter.invoke(profile, messages)).catch_unwind();
        let response = match tokio::time::timeout(self.attempt_timeout, call).await {
            Ok(Ok(response)) => response,
            Ok(Err(panic)) => GatewayResponse::failure(format!(
                "{} adapter failed: {}",
                profile.kind,
                panic_message(panic.as_ref())
            )),
            Err(_) => GatewayResponse::failure(ApiError::Timeout(self.attempt_timeout).to_string()),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.recorder.record(
            profile.kind,
            &profile.model_id,
            CHAT_ENDPOINT,
            &response,
            elapsed_ms,
        );

        response
    }

    /// Send a one-word probe through the normal dispatch path
    pub async fn test_connection(&self) -> (bool, Option<String>) {
        let response = self.chat(&[Message::user("Test")]).await;
        (response.success, response.error)
    }

    /// Whether a chat call has any provider to try
    pub async fn is_configured(&self) -> bool {
        let store = self.profiles.read().await;
        if store.is_empty() {
            self.legacy.read().await.is_some()
        } else {
            !store.active().is_empty()
        }
    }

    /// The profile a chat call would try first
    pub async fn primary_profile(&self) -> Option<ProviderProfile> {
        let store = self.profiles.read().await;
        if store.is_empty() {
            self.legacy.read().await.clone()
        } else {
            store.active().into_iter().next()
        }
    }

    pub async fn add_or_replace(&self, profile: ProviderProfile) -> String {
        self.profiles.write().await.add_or_replace(profile)
    }

    pub async fn list(&self) -> Vec<ProviderProfile> {
        self.profiles.read().await.list()
    }

    pub async fn get(&self, id: &str) -> Option<ProviderProfile> {
        self.profiles.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.profiles.write().await.remove(id)
    }

    pub async fn set_active(&self, id: &str, active: bool) -> bool {
        self.profiles.write().await.set_active(id, active)
    }

    pub async fn set_priority(&self, id: &str, priority: i32) -> bool {
        self.profiles.write().await.set_priority(id, priority)
    }

    /// Configure exactly one backend, used while no profiles are registered
    pub async fn set_config(&self, profile: ProviderProfile) {
        info!("Single provider configured: {}", profile.label());
        *self.legacy.write().await = Some(profile);
    }

    pub async fn get_config(&self) -> Option<ProviderProfile> {
        self.legacy.read().await.clone()
    }

    /// Restore saved profiles, returning how many were loaded
    pub async fn load_profiles(&self, secrets: &dyn SecretStore) -> usize {
        let mut store = self.profiles.write().await;
        config::load_profiles(secrets, &mut store)
    }

    pub async fn save_profiles(&self, secrets: &dyn SecretStore) -> Result<(), ConfigError> {
        let profiles = self.list().await;
        config::save_profiles(secrets, &profiles)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic".to_string()
    }
}
