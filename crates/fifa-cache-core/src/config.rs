//! Offline cache configuration.
//!
//! Holds the current cache name, the origin the manager serves, the asset
//! manifest pre-populated on install and the offline page path.
//!
//! Configuration is stored at `~/.config/fifa-cache/config.json`. A missing
//! file yields the built-in defaults; `FIFA_CACHE_ORIGIN` and
//! `FIFA_CACHE_NAME` override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::CacheName;
use crate::network::client::DEFAULT_TIMEOUT_SECS;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "fifa-cache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Current cache generation. Bump when the asset set changes.
pub const DEFAULT_CACHE_NAME: &str = "fifa-tracker-v1";

const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Served for document navigations when both cache and network miss
pub const DEFAULT_OFFLINE_PAGE: &str = "/index.html";

pub const ENV_ORIGIN: &str = "FIFA_CACHE_ORIGIN";
pub const ENV_CACHE_NAME: &str = "FIFA_CACHE_NAME";

/// Assets pre-populated on install. Anything not listed here is only cached
/// after it has been fetched once through the cache-miss path.
const DEFAULT_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/manifest.json",
    "/favicon.ico",
    "/css/styles.css",
    "/css/modals.css",
    "/css/dashboard.css",
    "/js/app.js",
    "/js/auth.js",
    "/js/api.js",
    "/js/matches.js",
    "/js/players.js",
    "/js/finances.js",
    "/js/modals.js",
    "/js/utils.js",
    "/pages/login.html",
    "/pages/matches.html",
    "/pages/players.html",
    "/pages/finances.html",
    "/icons/icon-192x192.png",
    "/icons/icon-512x512.png",
];

/// Ordered list of origin-relative URLs to pre-populate on install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetManifest(Vec<String>);

impl AssetManifest {
    pub fn new(assets: Vec<String>) -> Self {
        Self(assets)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self(DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache_name: CacheName,
    pub origin: Url,
    pub assets: AssetManifest,
    pub offline_page: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_name: CacheName::new(DEFAULT_CACHE_NAME)
                .expect("default cache name is valid"),
            origin: Url::parse(DEFAULT_ORIGIN).expect("default origin is valid"),
            assets: AssetManifest::default(),
            offline_page: DEFAULT_OFFLINE_PAGE.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load from `path` (defaults when absent), then apply environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(origin) = std::env::var(ENV_ORIGIN) {
            self.origin = Url::parse(&origin)
                .with_context(|| format!("Invalid {}: {}", ENV_ORIGIN, origin))?;
        }
        if let Ok(name) = std::env::var(ENV_CACHE_NAME) {
            self.cache_name = CacheName::new(name)?;
        }
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve an origin-relative path (or absolute URL) against the origin
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.origin
            .join(path)
            .with_context(|| format!("Invalid asset URL: {}", path))
    }

    pub fn offline_page_url(&self) -> Result<Url> {
        self.resolve(&self.offline_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_manifest_has_offline_page() {
        let config = Config::default();
        assert!(config.assets.iter().any(|a| a == config.offline_page));
        assert!(config.assets.iter().any(|a| a == "/"));
        assert!(config.assets.len() >= 20);
    }

    #[test]
    fn test_resolve_against_origin() {
        let config = Config::default();
        assert_eq!(
            config.resolve("/js/app.js").unwrap().as_str(),
            "http://localhost:3000/js/app.js"
        );
        assert_eq!(
            config.offline_page_url().unwrap().as_str(),
            "http://localhost:3000/index.html"
        );
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"cache_name":"fifa-tracker-v7","assets":["/a.js"]}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.cache_name.as_str(), "fifa-tracker-v7");
        assert_eq!(config.assets, AssetManifest::new(vec!["/a.js".to_string()]));
        assert_eq!(config.offline_page, DEFAULT_OFFLINE_PAGE);
        assert_eq!(config.request_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_invalid_cache_name_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"cache_name":"../escape"}"#).unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.json");
        let mut config = Config::default();
        config.request_timeout_secs = 5;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.request_timeout_secs, 5);
        assert_eq!(loaded.assets, config.assets);
    }
}
