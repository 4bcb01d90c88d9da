//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which holds the agent token, the API base URL and the cache file location.
//!
//! Configuration is stored at `~/.config/spacecache/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::DEFAULT_BASE_URL;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "spacecache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Cache file name
const CACHE_FILE: &str = "data.json";

/// Environment variables checked for the agent token, in order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["SPACECACHE_TOKEN", "ST_TOKEN"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_file: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&contents).with_context(|| format!("Invalid config: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Configured cache file, or `~/.cache/spacecache/data.json`.
    pub fn cache_file(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.cache_file {
            return Ok(path.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join(CACHE_FILE))
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Pick the agent token: an explicit value first, then the environment,
    /// then the config file.
    pub fn resolve_token(&self, explicit: Option<&str>) -> Option<String> {
        self.resolve_token_with(explicit, |name| std::env::var(name).ok())
    }

    fn resolve_token_with(&self, explicit: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        let usable = |t: &String| !t.trim().is_empty();
        explicit
            .map(str::to_string)
            .filter(usable)
            .or_else(|| TOKEN_ENV_VARS.iter().filter_map(|name| env(*name)).find(usable))
            .or_else(|| self.token.clone().filter(usable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_token(token: &str) -> Config {
        Config {
            token: Some(token.to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_token_precedence() {
        let config = config_with_token("from-config");
        let env = |name: &str| (name == "ST_TOKEN").then(|| "from-env".to_string());

        assert_eq!(config.resolve_token_with(Some("explicit"), env).as_deref(), Some("explicit"));
        assert_eq!(config.resolve_token_with(None, env).as_deref(), Some("from-env"));
        assert_eq!(config.resolve_token_with(None, |_| None).as_deref(), Some("from-config"));
        assert_eq!(Config::default().resolve_token_with(None, |_| None), None);
    }

    #[test]
    fn test_blank_token_is_no_token() {
        assert_eq!(config_with_token("  ").resolve_token_with(None, |_| None), None);
    }

    #[test]
    fn test_blank_sources_fall_through() {
        let config = config_with_token("cfg");
        let blank_env = |name: &str| (name == "SPACECACHE_TOKEN").then(String::new);
        assert_eq!(config.resolve_token_with(None, blank_env).as_deref(), Some("cfg"));
        assert_eq!(config.resolve_token_with(Some(""), blank_env).as_deref(), Some("cfg"));

        let both = |name: &str| Some(if name == "ST_TOKEN" { "st".to_string() } else { String::new() });
        assert_eq!(config.resolve_token_with(None, both).as_deref(), Some("st"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        let configured = Config {
            cache_file: Some(PathBuf::from("/tmp/custom.json")),
            ..Config::default()
        };
        assert_eq!(configured.cache_file().expect("path"), PathBuf::from("/tmp/custom.json"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE);
        assert_eq!(Config::load_from(&path).expect("missing is default"), Config::default());

        let config = Config {
            base_url: Some("http://localhost:8080/v2".to_string()),
            ..config_with_token("abc")
        };
        config.save_to(&path).expect("save");
        assert_eq!(Config::load_from(&path).expect("load"), config);
    }
}
