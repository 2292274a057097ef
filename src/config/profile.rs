//! Provider profiles and the priority-ordered profile store

use crate::api::ProviderKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::info;

pub const DEFAULT_PRIORITY: i32 = 50;

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

fn default_active() -> bool {
    true
}

/// A configured backend.
///
/// Field names on the wire follow the persisted profile document
/// (`name`, `provider`, `apiKey`, `model`, `endpoint`, `isActive`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Unique identifier; an empty id is assigned on insertion
    #[serde(default)]
    pub id: String,

    #[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(rename = "provider")]
    pub kind: ProviderKind,

    #[serde(rename = "apiKey", default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,

    #[serde(rename = "model", default)]
    pub model_id: String,

    #[serde(rename = "endpoint", default, skip_serializing_if = "Option::is_none")]
    pub endpoint_override: Option<String>,

    /// Higher is tried first
    #[serde(default = "default_priority")]
    pub priority: i32,

    #[serde(rename = "isActive", default = "default_active")]
    pub active: bool,

    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ProviderProfile {
    pub fn new(kind: ProviderKind, model_id: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            display_name: None,
            kind,
            credential: None,
            model_id: model_id.into(),
            endpoint_override: None,
            priority: DEFAULT_PRIORITY,
            active: true,
            created_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_override = Some(endpoint.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// The credential, ignoring blank values
    pub fn credential(&self) -> Option<&str> {
        self.credential
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Name used in logs and listings
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.kind.to_string())
    }
}

/// Configured profiles, kept sorted by descending priority.
///
/// Sorting is stable, so equal priorities keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    profiles: Vec<ProviderProfile>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a profile, replacing any profile with the same id in place.
    ///
    /// Returns the id the profile is stored under.
    pub fn add_or_replace(&mut self, mut profile: ProviderProfile) -> String {
        if profile.id.trim().is_empty() {
            profile.id = self.generate_id(profile.kind);
        }
        let id = profile.id.clone();
        let label = profile.label();
        let priority = profile.priority;

        match self.profiles.iter_mut().find(|p| p.id == id) {
            Some(existing) => {
                if profile.created_at.is_none() {
                    profile.created_at = existing.created_at;
                }
                *existing = profile;
            }
            None => {
                if profile.created_at.is_none() {
                    profile.created_at = Some(Utc::now());
                }
                self.profiles.push(profile);
            }
        }

        self.sort();
        info!("Profile added: {} (priority {})", label, priority);
        id
    }

    /// Snapshot of all profiles, highest priority first
    pub fn list(&self) -> Vec<ProviderProfile> {
        self.profiles.clone()
    }

    /// Active profiles, highest priority first
    pub fn active(&self) -> Vec<ProviderProfile> {
        self.profiles.iter().filter(|p| p.active).cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<&ProviderProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.profiles.len();
        self.profiles.retain(|p| p.id != id);
        let removed = self.profiles.len() != before;
        if removed {
            info!("Profile removed: {}", id);
        }
        removed
    }

    pub fn set_active(&mut self, id: &str, active: bool) -> bool {
        match self.profiles.iter_mut().find(|p| p.id == id) {
            Some(profile) => {
                profile.active = active;
                info!(
                    "Profile {} {}",
                    id,
                    if active { "activated" } else { "deactivated" }
                );
                true
            }
            None => false,
        }
    }

    pub fn set_priority(&mut self, id: &str, priority: i32) -> bool {
        match self.profiles.iter_mut().find(|p| p.id == id) {
            Some(profile) => {
                profile.priority = priority;
                self.sort();
                info!("Profile {} priority set to {}", id, priority);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    fn sort(&mut self) {
        self.profiles.sort_by_key(|p| Reverse(p.priority));
    }

    /// `<kind>_<unix millis>`, suffixed when that id is already taken
    fn generate_id(&self, kind: ProviderKind) -> String {
        let base = format!("{}_{}", kind.as_str(), Utc::now().timestamp_millis());
        if self.get(&base).is_none() {
            return base;
        }

        let mut suffix = 1;
        loop {
            let candidate = format!("{}_{}", base, suffix);
            if self.get(&candidate).is_none() {
                return candidate;
            }
            suffix += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with(priorities: &[(&str, i32)]) -> ProfileStore {
        let mut store = ProfileStore::new();
        for (id, priority) in priorities {
            store.add_or_replace(
                ProviderProfile::new(ProviderKind::Offline, "basic")
                    .with_id(*id)
                    .with_priority(*priority),
            );
        }
        store
    }

    fn ids(store: &ProfileStore) -> Vec<String> {
        store.list().into_iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_defaults_are_filled() {
        let mut store = ProfileStore::new();
        let id = store.add_or_replace(
            ProviderProfile::new(ProviderKind::Google, "gemini-2.5-flash").with_credential("k"),
        );

        let profile = store.get(&id).unwrap();
        assert!(id.starts_with("google_"));
        assert_eq!(profile.priority, 50);
        assert!(profile.active);
        assert!(profile.created_at.is_some());
    }

    #[test]
    fn test_sorted_by_descending_priority() {
        let store = store_with(&[("low", 25), ("high", 100), ("mid", 50)]);
        assert_eq!(ids(&store), vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_equal_priorities_keep_insertion_order() {
        let store = store_with(&[("a", 50), ("b", 70), ("c", 50), ("d", 50)]);
        assert_eq!(ids(&store), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_replace_by_id_is_idempotent() {
        let mut store = store_with(&[("a", 50), ("b", 40)]);
        let profile = ProviderProfile::new(ProviderKind::OpenAi, "gpt-4o")
            .with_id("c")
            .with_priority(60);

        store.add_or_replace(profile.clone());
        let first = store.list();
        store.add_or_replace(profile);

        assert_eq!(store.list(), first);
        assert_eq!(ids(&store), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_replace_keeps_position_and_creation_time() {
        let mut store = store_with(&[("a", 50), ("b", 50)]);
        let created = store.get("a").unwrap().created_at;

        store.add_or_replace(
            ProviderProfile::new(ProviderKind::Local, "mistral")
                .with_id("a")
                .with_priority(50),
        );

        assert_eq!(ids(&store), vec!["a", "b"]);
        assert_eq!(store.get("a").unwrap().model_id, "mistral");
        assert_eq!(store.get("a").unwrap().created_at, created);
    }

    #[test]
    fn test_generated_ids_do_not_collide() {
        let mut store = ProfileStore::new();
        let first = store.add_or_replace(ProviderProfile::new(ProviderKind::Local, "a"));
        let second = store.add_or_replace(ProviderProfile::new(ProviderKind::Local, "b"));
        let third = store.add_or_replace(ProviderProfile::new(ProviderKind::Local, "c"));

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_mutations_on_unknown_id_are_noops() {
        let mut store = store_with(&[("a", 50)]);
        assert!(!store.remove("zzz"));
        assert!(!store.set_active("zzz", false));
        assert!(!store.set_priority("zzz", 1));
        assert_eq!(ids(&store), vec!["a"]);
        assert!(store.get("a").unwrap().active);
    }

    #[test]
    fn test_set_priority_resorts() {
        let mut store = store_with(&[("a", 100), ("b", 50)]);
        assert!(store.set_priority("b", 150));
        assert_eq!(ids(&store), vec!["b", "a"]);
    }

    #[test]
    fn test_set_active_filters_active_list() {
        let mut store = store_with(&[("a", 100), ("b", 50)]);
        store.set_active("a", false);
        let active: Vec<_> = store.active().into_iter().map(|p| p.id).collect();
        assert_eq!(active, vec!["b"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut store = store_with(&[("a", 100), ("b", 50)]);
        assert!(store.remove("a"));
        assert_eq!(ids(&store), vec!["b"]);
    }

    #[test]
    fn test_persisted_document_shape() {
        let profile: ProviderProfile = serde_json::from_value(json!({
            "id": "google_1731745200000",
            "name": "Gemini Principal",
            "provider": "google",
            "apiKey": "AIza...",
            "model": "gemini-2.5-flash",
            "priority": 100,
            "isActive": false,
            "createdAt": "2025-11-16T08:20:00.000Z"
        }))
        .unwrap();

        assert_eq!(profile.kind, ProviderKind::Google);
        assert_eq!(profile.display_name.as_deref(), Some("Gemini Principal"));
        assert_eq!(profile.priority, 100);
        assert!(!profile.active);
        assert!(profile.created_at.is_some());

        let minimal: ProviderProfile =
            serde_json::from_value(json!({"provider": "local", "model": "mistral"})).unwrap();
        assert!(minimal.id.is_empty());
        assert_eq!(minimal.priority, 50);
        assert!(minimal.active);
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let profile = ProviderProfile::new(ProviderKind::OpenAi, "gpt-4o").with_credential("   ");
        assert!(profile.credential().is_none());
    }
}
