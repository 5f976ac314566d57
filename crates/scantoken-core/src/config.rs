//! Configuration management.
//!
//! Everything lives under the user's Docker CLI configuration directory:
//! `$DOCKER_CONFIG` when set, otherwise `~/.docker`. Scan files sit in its
//! `scan/` subdirectory:
//! - `scan/config.json`: settings below
//! - `scan/tokens.json`: the token cache (see `cache::TokenStore`)

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::DEFAULT_EXPIRATION_LEEWAY;

/// Environment variable overriding the configuration directory
const CONFIG_DIR_ENV: &str = "DOCKER_CONFIG";

/// Default configuration directory name under the home directory
const CONFIG_DIR_NAME: &str = ".docker";

/// Scan subdirectory
const SCAN_DIR: &str = "scan";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const HUB_URL_ENV: &str = "SCANTOKEN_HUB_URL";
const JWKS_ENV: &str = "SCANTOKEN_JWKS";

const DEFAULT_HUB_URL: &str = "https://hub.docker.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the Hub API used to negotiate tokens
    pub hub_url: String,
    /// JWKS document holding the verification keys
    pub jwks_path: Option<PathBuf>,
    /// Minimum remaining lifetime for a cached token to be reused
    pub expiration_leeway_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hub_url: DEFAULT_HUB_URL.to_string(),
            jwks_path: None,
            expiration_leeway_secs: DEFAULT_EXPIRATION_LEEWAY.as_secs(),
        }
    }
}

impl Config {
    /// Load `scan/config.json`, falling back to defaults when it is absent,
    /// then apply environment overrides.
    ///
    /// The file is shared with other scan plugin settings; keys this crate
    /// does not know are ignored and the file is never rewritten.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    /// Load settings from `path` without environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn expiration_leeway(&self) -> Duration {
        Duration::from_secs(self.expiration_leeway_secs)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(HUB_URL_ENV) {
            if !url.is_empty() {
                self.hub_url = url;
            }
        }
        if let Ok(path) = std::env::var(JWKS_ENV) {
            if !path.is_empty() {
                self.jwks_path = Some(PathBuf::from(path));
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        Ok(scan_dir()?.join(CONFIG_FILE))
    }
}

/// The user-scoped configuration directory
pub fn config_dir() -> Result<PathBuf> {
    resolve_config_dir(std::env::var_os(CONFIG_DIR_ENV), dirs::home_dir())
}

/// `$DOCKER_CONFIG` when set and non-empty, otherwise `<home>/.docker`
fn resolve_config_dir(env_dir: Option<OsString>, home: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = env_dir.filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = home.ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// `<config dir>/scan`
pub fn scan_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join(SCAN_DIR))
}
