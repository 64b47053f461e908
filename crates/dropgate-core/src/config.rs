//! Application configuration management.
//!
//! Settings are layered: defaults, then `~/.config/dropgate/config.json` when
//! it exists, then environment variables (callers load `.env` first).
//!
//! | Variable | Default |
//! |---|---|
//! | `API_BASE_URL` | `http://localhost:3000` |
//! | `EDGE_LISTEN_ADDR` | `127.0.0.1:8080` |
//! | `PAGES_ORIGIN_URL` | `http://localhost:3001` |
//! | `GATE_BYPASS_PREFIXES` | `/api,/_next` |

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::gate::routes::DEFAULT_BYPASS_PREFIXES;
use crate::gate::RouteTable;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "dropgate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_PAGES_ORIGIN_URL: &str = "http://localhost:3001";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub listen_addr: String,
    pub pages_origin_url: String,
    pub bypass_prefixes: Vec<String>,
    /// Last email used with `--sign-in`.
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            pages_origin_url: DEFAULT_PAGES_ORIGIN_URL.to_string(),
            bypass_prefixes: DEFAULT_BYPASS_PREFIXES.iter().map(|p| p.to_string()).collect(),
            last_email: None,
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Override fields from an environment lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get("API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(addr) = get("EDGE_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(url) = get("PAGES_ORIGIN_URL") {
            self.pages_origin_url = url;
        }
        if let Some(prefixes) = get("GATE_BYPASS_PREFIXES") {
            self.bypass_prefixes = prefixes
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn route_table(&self) -> RouteTable {
        RouteTable::new(self.bypass_prefixes.iter().cloned())
    }

    /// Whether the page origin is served over HTTPS, which decides `Secure` cookies.
    pub fn pages_origin_is_https(&self) -> bool {
        self.pages_origin_url.starts_with("https://")
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
