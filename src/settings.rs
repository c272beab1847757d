use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Environment variables checked for the advice credential, in order.
pub const API_KEY_VARS: &[&str] = &["TALLY_API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub rules_file: Option<String>,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_use_cache() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            api_base_url: default_api_base_url(),
            rules_file: None,
            use_cache: default_use_cache(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("tally")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings).map_err(|e| TallyError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

/// Everything the advice orchestrator needs from configuration. Built once
/// at startup and passed in explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct AdviceConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_api_base_url(),
        }
    }
}

impl AdviceConfig {
    /// Stored settings, with the key overridden by the first non-empty
    /// variable in [`API_KEY_VARS`].
    pub fn resolve(settings: &Settings) -> Self {
        let env_key = API_KEY_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()));
        Self::from_parts(settings, env_key)
    }

    pub fn from_parts(settings: &Settings, env_key: Option<String>) -> Self {
        let api_key = env_key
            .or_else(|| settings.api_key.clone())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Self {
            api_key,
            model: settings.model.clone(),
            base_url: settings.api_base_url.clone(),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            api_key: Some("abc".to_string()),
            model: "gemini-pro".to_string(),
            rules_file: Some("/tmp/rules.json".to_string()),
            use_cache: false,
            ..Settings::default()
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("abc"));
        assert_eq!(loaded.model, "gemini-pro");
        assert!(!loaded.use_cache);
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let s: Settings = serde_json::from_str(r#"{"model": "gemini-pro"}"#).unwrap();
        assert!(s.api_key.is_none());
        assert!(s.use_cache);
        assert_eq!(s.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_env_key_overrides_stored_key() {
        let settings = Settings {
            api_key: Some("stored".to_string()),
            ..Settings::default()
        };
        let config = AdviceConfig::from_parts(&settings, Some("env".to_string()));
        assert_eq!(config.api_key.as_deref(), Some("env"));
        let config = AdviceConfig::from_parts(&settings, None);
        assert_eq!(config.api_key.as_deref(), Some("stored"));
    }

    #[test]
    fn test_blank_key_means_no_credential() {
        let settings = Settings {
            api_key: Some("   ".to_string()),
            ..Settings::default()
        };
        assert!(!AdviceConfig::from_parts(&settings, None).has_credential());
    }

    #[test]
    fn test_shellexpand_leaves_plain_paths() {
        assert_eq!(shellexpand_path("/tmp/rules.json"), "/tmp/rules.json");
    }
}
