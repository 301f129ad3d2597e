//! Application settings storage
//!
//! Stores the OpenAI API key and client tuning in a JSON file in the data
//! directory. The file is read once at startup; the key is the only value the
//! running session writes back.

use crate::error::{FolioError, Result};
use crate::utils::safe_truncate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub const SETTINGS_FILE: &str = "settings.json";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_temperature")]
    pub summary_temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub summary_max_tokens: u32,
    #[serde(default = "default_drive_api_base")]
    pub drive_api_base: String,
    #[serde(default = "default_drive_upload_base")]
    pub drive_upload_base: String,
    #[serde(default = "default_userinfo_url")]
    pub userinfo_url: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Background drive sync period (None = only on sign-in and on demand)
    #[serde(default)]
    pub sync_interval_secs: Option<u64>,
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_openai_base_url() -> String {
    crate::ai_client::DEFAULT_BASE_URL.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    500
}

fn default_drive_api_base() -> String {
    crate::storage::drive::DEFAULT_API_BASE.to_string()
}

fn default_drive_upload_base() -> String {
    crate::storage::drive::DEFAULT_UPLOAD_BASE.to_string()
}

fn default_userinfo_url() -> String {
    crate::identity::DEFAULT_USERINFO_URL.to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: default_openai_model(),
            openai_base_url: default_openai_base_url(),
            summary_temperature: default_temperature(),
            summary_max_tokens: default_max_tokens(),
            drive_api_base: default_drive_api_base(),
            drive_upload_base: default_drive_upload_base(),
            userinfo_url: default_userinfo_url(),
            request_timeout_secs: default_timeout(),
            sync_interval_secs: None,
        }
    }
}

impl Settings {
    /// Load settings from disk, or defaults if the file is missing or unreadable
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Settings::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable settings file {:?}: {}", path, e);
                Settings::default()
            }),
            Err(_) => Settings::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| FolioError::Settings(format!("Failed to serialize settings: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }
}

/// Where the active API key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySource {
    Env,
    Settings,
    None,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyStatus {
    pub has_key: bool,
    pub masked_key: Option<String>,
    pub source: KeySource,
}

/// Settings plus the file they persist to.
pub struct SettingsStore {
    path: PathBuf,
    settings: RwLock<Settings>,
    env_key: Option<String>,
}

impl SettingsStore {
    /// Open `settings.json` under `data_dir`. `OPENAI_API_KEY` is read once here.
    pub fn open(data_dir: &Path) -> Self {
        let env_key = std::env::var(API_KEY_ENV).ok();
        Self::open_with_env_key(data_dir, env_key)
    }

    pub fn open_with_env_key(data_dir: &Path, env_key: Option<String>) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let settings = Settings::load(&path);
        Self {
            path,
            settings: RwLock::new(settings),
            env_key: env_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Settings {
        self.settings
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Environment variable takes precedence over the stored key
    pub fn api_key(&self) -> Option<String> {
        if let Some(key) = &self.env_key {
            return Some(key.clone());
        }
        self.settings
            .read()
            .ok()?
            .openai_api_key
            .clone()
            .filter(|k| !k.is_empty())
    }

    pub fn api_key_status(&self) -> ApiKeyStatus {
        let source = if self.env_key.is_some() {
            KeySource::Env
        } else if self.api_key().is_some() {
            KeySource::Settings
        } else {
            KeySource::None
        };
        ApiKeyStatus {
            has_key: source != KeySource::None,
            masked_key: self.api_key().map(|k| mask_key(&k)),
            source,
        }
    }

    /// Store and save the API key. An empty key clears it.
    pub fn set_api_key(&self, key: &str) -> Result<()> {
        let key = key.trim();
        let mut settings = self.settings.write().map_err(|_| FolioError::StatePoisoned)?;
        settings.openai_api_key = if key.is_empty() { None } else { Some(key.to_string()) };
        settings.save(&self.path)?;

        tracing::info!(path = ?self.path, cleared = key.is_empty(), "OpenAI API key saved to settings");
        Ok(())
    }
}

/// Masked key for display (first 8 and last 4 characters)
pub fn mask_key(key: &str) -> String {
    let chars = key.chars().count();
    if chars > 12 {
        let tail: String = key.chars().skip(chars - 4).collect();
        format!("{}...{}", safe_truncate(key, 8), tail)
    } else {
        "*".repeat(chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open_with_env_key(dir.path(), None);
        let settings = store.get();
        assert_eq!(settings.openai_model, "gpt-3.5-turbo");
        assert_eq!(settings.summary_max_tokens, 500);
        assert!(store.api_key().is_none());
        assert_eq!(store.api_key_status().source, KeySource::None);
    }

    #[test]
    fn test_set_api_key_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open_with_env_key(dir.path(), None);
        store.set_api_key("  sk-test-1234567890abcd ").unwrap();

        assert_eq!(store.path(), dir.path().join(SETTINGS_FILE));

        let reopened = SettingsStore::open_with_env_key(dir.path(), None);
        assert_eq!(reopened.api_key().as_deref(), Some("sk-test-1234567890abcd"));
        let status = reopened.api_key_status();
        assert!(status.has_key);
        assert_eq!(status.source, KeySource::Settings);
        assert_eq!(status.masked_key.as_deref(), Some("sk-test-...abcd"));
    }

    #[test]
    fn test_empty_key_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open_with_env_key(dir.path(), None);
        store.set_api_key("sk-abc").unwrap();
        store.set_api_key("").unwrap();
        assert!(store.api_key().is_none());
    }

    #[test]
    fn test_env_key_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open_with_env_key(dir.path(), Some("sk-from-env".to_string()));
        store.set_api_key("sk-from-file").unwrap();
        assert_eq!(store.api_key().as_deref(), Some("sk-from-env"));
        assert_eq!(store.api_key_status().source, KeySource::Env);
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();
        let store = SettingsStore::open_with_env_key(dir.path(), None);
        assert_eq!(store.get().request_timeout_secs, 60);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"openai_api_key": "sk-x", "sync_interval_secs": 300}"#,
        )
        .unwrap();
        let settings = SettingsStore::open_with_env_key(dir.path(), None).get();
        assert_eq!(settings.openai_api_key.as_deref(), Some("sk-x"));
        assert_eq!(settings.sync_interval_secs, Some(300));
        assert_eq!(settings.summary_temperature, 0.7);
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("short"), "*****");
        assert_eq!(mask_key("sk-proj-abcdefghijkl"), "sk-proj-...ijkl");
    }
}
