//! Persistence of provider profiles through a key-value secret store

use super::{ConfigError, ProfileStore, ProviderProfile};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Key under which the profile array is stored
pub const PROFILES_KEY: &str = "aiConfigs";

/// Opaque key-value store holding credentials and the profile document
pub trait SecretStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ConfigError>;
}

/// In-process store, mainly for tests and embedding
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| ConfigError::SecretStore(format!("Lock error: {}", e)))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| ConfigError::SecretStore(format!("Lock error: {}", e)))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object file readable only by its owner
#[derive(Debug)]
pub struct FileSecretStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSecretStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| ConfigError::SecretStore(format!("Lock error: {}", e)))?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| ConfigError::SecretStore(format!("Lock error: {}", e)))?;
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }
}

/// Restore saved profiles into `profiles`.
///
/// Startup never fails because of this document: a missing key, unreadable
/// store, or non-array document loads nothing, and malformed entries are
/// skipped. Returns the number of profiles restored.
pub fn load_profiles(secrets: &dyn SecretStore, profiles: &mut ProfileStore) -> usize {
    info!("Loading provider profiles from secure storage");

    let raw = match secrets.get(PROFILES_KEY) {
        Ok(Some(raw)) if !raw.trim().is_empty() => raw,
        Ok(_) => {
            info!("No provider profiles to load (empty storage)");
            return 0;
        }
        Err(e) => {
            warn!("Could not read saved profiles: {}", e);
            return 0;
        }
    };

    let entries = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            error!("Invalid profile document (not an array)");
            return 0;
        }
        Err(e) => {
            error!("Failed to parse saved profiles: {}", e);
            return 0;
        }
    };

    let found = entries.len();
    let mut restored = 0;
    let mut active = 0;

    for entry in entries {
        match serde_json::from_value::<ProviderProfile>(entry) {
            Ok(profile) => {
                debug!(
                    "Restored profile: {} (priority {})",
                    profile.label(),
                    profile.priority
                );
                if profile.active {
                    active += 1;
                }
                profiles.add_or_replace(profile);
                restored += 1;
            }
            Err(e) => warn!("Skipping malformed profile entry: {}", e),
        }
    }

    info!(
        "Loaded {} of {} saved profiles ({} active)",
        restored, found, active
    );
    restored
}

/// Persist the current profile list as a JSON array
pub fn save_profiles(secrets: &dyn SecretStore, profiles: &[ProviderProfile]) -> Result<(), ConfigError> {
    let document = serde_json::to_string(profiles)?;
    secrets.set(PROFILES_KEY, &document)?;
    debug!("Saved {} provider profiles", profiles.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ProviderKind;
    use serde_json::json;

    #[test]
    fn test_missing_key_loads_nothing() {
        let secrets = MemorySecretStore::new();
        let mut profiles = ProfileStore::new();
        assert_eq!(load_profiles(&secrets, &mut profiles), 0);
        assert!(profiles.is_empty());
    }

    #[test]
    fn test_non_array_document_loads_nothing() {
        let secrets = MemorySecretStore::new();
        secrets
            .set(PROFILES_KEY, r#"{"provider": "google"}"#)
            .unwrap();
        let mut profiles = ProfileStore::new();
        assert_eq!(load_profiles(&secrets, &mut profiles), 0);

        secrets.set(PROFILES_KEY, "not json").unwrap();
        assert_eq!(load_profiles(&secrets, &mut profiles), 0);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let secrets = MemorySecretStore::new();
        let document = json!([
            {"id": "a", "provider": "openai", "apiKey": "sk", "model": "gpt-4o", "priority": 10},
            {"id": "b", "provider": "mistral-cloud", "model": "x"},
            {"id": "c", "provider": "local", "model": "mistral", "priority": 90, "isActive": false}
        ]);
        secrets.set(PROFILES_KEY, &document.to_string()).unwrap();

        let mut profiles = ProfileStore::new();
        assert_eq!(load_profiles(&secrets, &mut profiles), 2);

        let list = profiles.list();
        assert_eq!(list[0].id, "c");
        assert_eq!(list[1].id, "a");
        assert!(!list[0].active);
    }

    #[test]
    fn test_save_then_load_reproduces_store() {
        let mut original = ProfileStore::new();
        original.add_or_replace(
            ProviderProfile::new(ProviderKind::Anthropic, "claude-3-haiku-20240307")
                .with_credential("ak")
                .with_priority(80),
        );
        original.add_or_replace(
            ProviderProfile::new(ProviderKind::Local, "llama3.2:3b")
                .with_endpoint("http://127.0.0.1:11434")
                .with_active(false),
        );
        original.add_or_replace(ProviderProfile::new(ProviderKind::Offline, "basic").with_priority(1));

        let secrets = MemorySecretStore::new();
        save_profiles(&secrets, &original.list()).unwrap();

        let mut restored = ProfileStore::new();
        assert_eq!(load_profiles(&secrets, &mut restored), 3);
        assert_eq!(restored.list(), original.list());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("secrets.json");

        let store = FileSecretStore::new(&path);
        assert_eq!(store.get("missing").unwrap(), None);
        store.set("k1", "v1").unwrap();
        store.set("k2", "v2").unwrap();

        let reopened = FileSecretStore::new(&path);
        assert_eq!(reopened.get("k1").unwrap().as_deref(), Some("v1"));
        assert_eq!(reopened.get("k2").unwrap().as_deref(), Some("v2"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
