//! `~/.wardrobe/config.yaml`: remote endpoints, credentials and sync tuning.
//!
//! ```yaml
//! remote:
//!   url: https://project.example.co
//!   api_key: <anon key>
//!   table: items        # optional
//!   bucket: wardrobe    # optional
//! classifier:           # optional
//!   api_key: <key>
//!   model: gemini-3-flash-preview
//! sync:
//!   min_interval_secs: 5
//! ```
//!
//! `WARDROBE_REMOTE_URL`, `WARDROBE_REMOTE_KEY` and `WARDROBE_CLASSIFIER_KEY`
//! override the file. Like the replica, every loader has an `_at(home)` form
//! for tests and a no-arg form rooted at `dirs::home_dir()`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_REMOTE_URL: &str = "WARDROBE_REMOTE_URL";
pub const ENV_REMOTE_KEY: &str = "WARDROBE_REMOTE_KEY";
pub const ENV_CLASSIFIER_KEY: &str = "WARDROBE_CLASSIFIER_KEY";

/// Default minimum spacing between reconcile attempts.
pub const DEFAULT_MIN_SYNC_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WardrobeConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<ClassifierConfig>,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Authoritative store and its blob bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            table: default_table(),
            bucket: default_bucket(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_min_interval")]
    pub min_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: default_min_interval(),
        }
    }
}

impl SyncConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }
}

fn default_table() -> String {
    "items".to_string()
}

fn default_bucket() -> String {
    "wardrobe".to_string()
}

fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_min_interval() -> u64 {
    DEFAULT_MIN_SYNC_INTERVAL_SECS
}

/// `<home>/.wardrobe/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".wardrobe").join("config.yaml")
}

/// Load configuration rooted at `home`, applying the process environment.
pub fn load_at(home: &Path) -> Result<WardrobeConfig, ConfigError> {
    load_with_env(home, |key| std::env::var(key).ok())
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<WardrobeConfig, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    load_at(&home)
}

/// Load configuration with an explicit environment lookup.
///
/// The file is optional when the environment supplies the remote URL; the
/// merged result must name both a remote URL and key.
pub fn load_with_env(
    home: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<WardrobeConfig, ConfigError> {
    let path = config_path_at(home);
    let env_url = env(ENV_REMOTE_URL).filter(|v| !v.is_empty());

    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(&path)?;
        serde_yaml::from_str::<WardrobeConfig>(&contents)
            .map_err(|source| ConfigError::Parse { path: path.clone(), source })?
    } else if env_url.is_some() {
        WardrobeConfig::default()
    } else {
        return Err(ConfigError::NotFound { path });
    };

    if let Some(url) = env_url {
        config.remote.url = url;
    }
    if let Some(key) = env(ENV_REMOTE_KEY).filter(|v| !v.is_empty()) {
        config.remote.api_key = key;
    }
    if let Some(key) = env(ENV_CLASSIFIER_KEY).filter(|v| !v.is_empty()) {
        match config.classifier.as_mut() {
            Some(classifier) => classifier.api_key = key,
            None => {
                config.classifier = Some(ClassifierConfig {
                    api_key: key,
                    model: default_model(),
                    endpoint: default_endpoint(),
                })
            }
        }
    }

    config.validate()?;
    Ok(config)
}

impl WardrobeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.remote.url.trim().is_empty() {
            return Err(ConfigError::Missing("remote.url"));
        }
        if self.remote.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("remote.api_key"));
        }
        if let Some(classifier) = &self.classifier {
            if classifier.api_key.trim().is_empty() {
                return Err(ConfigError::Missing("classifier.api_key"));
            }
        }
        Ok(())
    }
}
