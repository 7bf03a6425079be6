//! # Client configuration
//!
//! Settings live in a YAML file (by default `<config dir>/tesoreria/config.yaml`)
//! and every field has a default, so a missing or partial file is fine.
//! A few settings can be overridden from the environment:
//!
//! | variable              | field       |
//! |-----------------------|-------------|
//! | `TESORERIA_API_URL`   | `api_url`   |
//! | `TESORERIA_LOG`       | `log_level` |
//! | `TESORERIA_DRAFT_DIR` | `draft_dir` |
//!
//! ## YAML Format
//!
//! ```yaml
//! api_url: "http://localhost:8000"
//! request_timeout_secs: 30
//! debounce_ms: 300
//! cache_fresh_secs: 300
//! cache_retain_secs: 600
//! scroll_lead: 10
//! scroll_threshold: 0.25
//! log_level: "info"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{FrontendError, Result};

pub const ENV_API_URL: &str = "TESORERIA_API_URL";
pub const ENV_LOG: &str = "TESORERIA_LOG";
pub const ENV_DRAFT_DIR: &str = "TESORERIA_DRAFT_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend root, without the `/api` prefix.
    pub api_url: String,
    pub request_timeout_secs: u64,
    /// Quiet period before search and filter changes are committed.
    pub debounce_ms: u64,
    /// How long a cached page is served without refetching.
    pub cache_fresh_secs: u64,
    /// How long a cached page is kept at all.
    pub cache_retain_secs: u64,
    /// Rows before the end of the list at which the next page is requested.
    pub scroll_lead: usize,
    /// Visible fraction of the sentinel row that triggers the next page.
    pub scroll_threshold: f64,
    /// Where bulk-entry drafts are kept. Defaults under the user data dir.
    pub draft_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
            debounce_ms: 300,
            cache_fresh_secs: 300,
            cache_retain_secs: 600,
            scroll_lead: 10,
            scroll_threshold: 0.25,
            draft_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Default location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tesoreria").join("config.yaml"))
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(component = "config", "No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let yaml = fs::read_to_string(path)
            .map_err(|e| FrontendError::Config(format!("reading {:?}: {}", path, e)))?;
        let config: Self = serde_yaml::from_str(&yaml)
            .map_err(|e| FrontendError::Config(format!("parsing {:?}: {}", path, e)))?;
        debug!(component = "config", "Loaded config from {:?}", path);
        config.validate()?;
        Ok(config)
    }

    /// Load from the default path (if any) and apply environment overrides.
    pub fn load_default() -> Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_url = url;
        }
        if let Some(level) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
            self.log_level = level;
        }
        if let Some(dir) = lookup(ENV_DRAFT_DIR).filter(|v| !v.trim().is_empty()) {
            self.draft_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(FrontendError::Config(format!(
                "api_url must be an http(s) URL, got '{}'",
                self.api_url
            )));
        }
        if self.cache_retain_secs < self.cache_fresh_secs {
            return Err(FrontendError::Config(
                "cache_retain_secs must not be shorter than cache_fresh_secs".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.scroll_threshold) {
            return Err(FrontendError::Config(format!(
                "scroll_threshold must be within 0..=1, got {}",
                self.scroll_threshold
            )));
        }
        Ok(())
    }

    /// Save to `path`, writing a temp file and renaming it over the target.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
                info!(component = "config", "Created config directory {:?}", parent);
            }
        }
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| FrontendError::Config(format!("serializing config: {}", e)))?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, yaml)?;
        fs::rename(&temp_path, path)?;
        debug!(component = "config", "Saved config to {:?}", path);
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn cache_fresh(&self) -> Duration {
        Duration::from_secs(self.cache_fresh_secs)
    }

    pub fn cache_retain(&self) -> Duration {
        Duration::from_secs(self.cache_retain_secs)
    }

    /// Resolved draft directory.
    pub fn draft_dir(&self) -> PathBuf {
        self.draft_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("tesoreria")
                .join("drafts")
        })
    }
}
