//! Configuration loading and saving utilities.
//!
//! Connection settings live in `~/.orderdesk/config.json`; environment
//! variables override the file so CI and one-off shells never need to write
//! it. A missing file yields defaults, a malformed file is an explicit error.

use crate::error::{DeskError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_SERVICE_URL: &str = "ORDERDESK_URL";
pub const ENV_API_KEY: &str = "ORDERDESK_API_KEY";
pub const ENV_ACCESS_TOKEN: &str = "ORDERDESK_TOKEN";
pub const ENV_USER_ID: &str = "ORDERDESK_USER";

/// Connection settings for the hosted data service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeskConfig {
    /// Base URL of the table endpoint, e.g. `https://acme.example.co/rest/v1`.
    #[serde(default)]
    pub service_url: String,
    /// Public API key sent on every request.
    #[serde(default)]
    pub api_key: String,
    /// Per-session bearer token; falls back to the API key when absent.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Identifier of the signed-in user; scopes every query.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Returns the orderdesk directory (~/.orderdesk).
pub fn get_desk_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".orderdesk"))
}

/// Returns the path to the configuration file.
pub fn get_config_path() -> Option<PathBuf> {
    get_desk_dir().map(|d| d.join("config.json"))
}

/// Loads the configuration from the default path and applies environment
/// overrides. A missing file yields defaults.
pub fn load_config() -> Result<DeskConfig> {
    let config = match get_config_path() {
        Some(path) => load_config_from(&path)?,
        None => DeskConfig::default(),
    };
    Ok(apply_overrides(config, |name| std::env::var(name).ok()))
}

/// Loads the configuration from an explicit path, without env overrides.
pub fn load_config_from(path: &Path) -> Result<DeskConfig> {
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(DeskConfig::default());
        }
        Err(err) => {
            return Err(DeskError::Io {
                context: "Failed to read config file".to_string(),
                source: err,
            });
        }
    };
    serde_json::from_str(&content).map_err(|err| DeskError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

/// Saves the configuration to the default path, creating the directory.
pub fn save_config(config: &DeskConfig) -> Result<()> {
    let path = get_config_path().ok_or(DeskError::ConfigMissing("home directory"))?;
    save_config_to(&path, config)
}

/// Saves the configuration to an explicit path.
pub fn save_config_to(path: &Path, config: &DeskConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs_err::create_dir_all(dir).map_err(|err| DeskError::ConfigWriteFailed {
            path: path.to_path_buf(),
            source: err,
        })?;
    }
    let content = serde_json::to_string_pretty(config).map_err(|err| DeskError::Json {
        context: "Failed to serialize config".to_string(),
        source: err,
    })?;
    fs_err::write(path, content).map_err(|err| DeskError::ConfigWriteFailed {
        path: path.to_path_buf(),
        source: err,
    })
}

/// Applies environment-style overrides from a lookup function. Empty values
/// are treated as unset.
fn apply_overrides(mut config: DeskConfig, lookup: impl Fn(&str) -> Option<String>) -> DeskConfig {
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    if let Some(url) = non_empty(ENV_SERVICE_URL) {
        config.service_url = url;
    }
    if let Some(key) = non_empty(ENV_API_KEY) {
        config.api_key = key;
    }
    if let Some(token) = non_empty(ENV_ACCESS_TOKEN) {
        config.access_token = Some(token);
    }
    if let Some(user) = non_empty(ENV_USER_ID) {
        config.user_id = Some(user);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_config() -> DeskConfig {
        DeskConfig {
            service_url: "https://acme.example.co/rest/v1".to_string(),
            api_key: "anon-key".to_string(),
            access_token: None,
            user_id: Some("u1".to_string()),
        }
    }

    #[test]
    fn round_trips_through_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.json");

        let config = sample_config();
        save_config_to(&path, &config).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let loaded = load_config_from(&tmp.path().join("absent.json")).unwrap();
        assert_eq!(loaded, DeskConfig::default());
    }

    #[test]
    fn malformed_file_is_an_explicit_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, DeskError::ConfigMalformed { .. }));
    }

    #[test]
    fn overrides_replace_file_values() {
        let config = apply_overrides(sample_config(), |name| match name {
            ENV_SERVICE_URL => Some("https://other.example.co".to_string()),
            ENV_USER_ID => Some("u2".to_string()),
            _ => None,
        });
        assert_eq!(config.service_url, "https://other.example.co");
        assert_eq!(config.user_id.as_deref(), Some("u2"));
        // Untouched values survive.
        assert_eq!(config.api_key, "anon-key");
    }

    #[test]
    fn empty_override_values_are_ignored() {
        let config = apply_overrides(sample_config(), |name| match name {
            ENV_API_KEY => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.api_key, "anon-key");
    }

    #[test]
    fn unknown_fields_in_file_are_tolerated() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"service_url": "https://x.example.co", "theme": "dark"}"#,
        )
        .unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.service_url, "https://x.example.co");
    }
}
