// Client configuration: built-in defaults, then an optional JSON file, then
// environment overrides. Command-line flags are applied on top by `cli`.

use crate::error::{Result, VgError};
use crate::upload::{RetryPolicy, TimeoutPolicy, UploadConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://vg-api.btgenomics.com:8082/api";

/// Environment variable that overrides the API base URL.
pub const BASE_URL_ENV: &str = "VG_API_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub max_attempts: u32,
    pub backoff_factor: f64,
    pub max_backoff_secs: u64,
    pub show_progress: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        ClientConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_attempts: retry.max_attempts,
            backoff_factor: retry.backoff_factor,
            max_backoff_secs: retry.max_backoff.as_secs(),
            show_progress: true,
        }
    }
}

impl ClientConfig {
    /// Load from `path`, or from the default location when it exists, then
    /// apply `VG_API_URL`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.is_file() => Self::from_file(&p)?,
                _ => ClientConfig::default(),
            },
        };
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading client configuration");
        let data = std::fs::read_to_string(path)
            .map_err(|e| VgError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: ClientConfig = serde_json::from_str(&data)
            .map_err(|e| VgError::Config(format!("invalid JSON in {}: {e}", path.display())))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(VgError::Config("base_url must not be empty".into()));
        }
        if self.max_attempts == 0 {
            return Err(VgError::Config("max_attempts must be at least 1".into()));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(VgError::Config(format!(
                "backoff_factor must be >= 1, got {}",
                self.backoff_factor
            )));
        }
        Ok(())
    }

    pub fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                backoff_factor: self.backoff_factor,
                max_backoff: Duration::from_secs(self.max_backoff_secs),
            },
            timeouts: TimeoutPolicy::default(),
        }
    }
}

/// `<config dir>/vg-client/config.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vg-client").join("config.json"))
}
