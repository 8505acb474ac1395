//! Configuration loading for the `maitre` binary.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.maitre/config.toml` (user)
//! 3. `/etc/maitre/config.toml` (system)
//!
//! When no file exists the defaults apply. The Gemini API key is read from
//! the `GOOGLE_API_KEY` environment variable only.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::providers::RetryPolicy;
use crate::router::ScoringConfig;
use crate::{MaitreError, Result};

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Binary configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub router: RouterSection,
    #[serde(default)]
    pub gemini: GeminiSection,
}

/// `[cache]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Cache root directory (default: platform cache dir + `maitre`).
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// RAM entries per resource kind (default: 1000).
    #[serde(default = "default_ram_entries")]
    pub ram_entries: usize,
    /// Disk budget per resource kind in megabytes (default: 1024).
    #[serde(default = "default_max_disk_mb")]
    pub max_disk_mb: u64,
    /// Texts per batched embedding call (default: 10).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Disk writes between quota passes (default: 64).
    #[serde(default = "default_cleanup_every")]
    pub cleanup_every_writes: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            root: None,
            ram_entries: default_ram_entries(),
            max_disk_mb: default_max_disk_mb(),
            batch_size: default_batch_size(),
            cleanup_every_writes: default_cleanup_every(),
        }
    }
}

fn default_ram_entries() -> usize {
    1000
}

fn default_max_disk_mb() -> u64 {
    1024
}

fn default_batch_size() -> usize {
    10
}

fn default_cleanup_every() -> u64 {
    64
}

impl CacheSection {
    pub fn to_cache_config(&self, retry: RetryPolicy) -> CacheConfig {
        let mut config = CacheConfig::new()
            .ram_entries(self.ram_entries)
            .max_disk_bytes(self.max_disk_mb.saturating_mul(1024 * 1024))
            .batch_size(self.batch_size)
            .cleanup_every_writes(self.cleanup_every_writes)
            .retry(retry);
        if let Some(root) = &self.root {
            config = config.root(root);
        }
        config
    }
}

/// `[retry]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    /// Attempts including the first (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds (default: 1000).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Backoff growth factor (default: 2.0).
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Delay cap in milliseconds (default: 30000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl RetrySection {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .max_attempts(self.max_attempts)
            .initial_delay(Duration::from_millis(self.initial_delay_ms))
            .multiplier(self.multiplier)
            .max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

/// `[router]` table. Unset fields keep the [`ScoringConfig`] defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouterSection {
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub name_boost: Option<f64>,
    #[serde(default)]
    pub directional_boost: Option<f64>,
    #[serde(default)]
    pub category_boost: Option<f64>,
    #[serde(default)]
    pub booking_create_boost: Option<f64>,
    #[serde(default)]
    pub booking_update_boost: Option<f64>,
    #[serde(default)]
    pub cancel_boost: Option<f64>,
}

impl RouterSection {
    pub fn to_scoring(&self) -> ScoringConfig {
        let d = ScoringConfig::default();
        ScoringConfig {
            threshold: self.threshold.unwrap_or(d.threshold),
            name_boost: self.name_boost.unwrap_or(d.name_boost),
            directional_boost: self.directional_boost.unwrap_or(d.directional_boost),
            category_boost: self.category_boost.unwrap_or(d.category_boost),
            booking_create_boost: self.booking_create_boost.unwrap_or(d.booking_create_boost),
            booking_update_boost: self.booking_update_boost.unwrap_or(d.booking_update_boost),
            cancel_boost: self.cancel_boost.unwrap_or(d.cancel_boost),
        }
    }
}

/// `[gemini]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSection {
    /// API base URL override.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Completion calls allowed per minute (default: 8).
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: usize,
}

impl Default for GeminiSection {
    fn default() -> Self {
        Self {
            base_url: None,
            embedding_model: default_embedding_model(),
            chat_model: default_chat_model(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

fn default_embedding_model() -> String {
    crate::providers::gemini::DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_chat_model() -> String {
    crate::providers::gemini::DEFAULT_CHAT_MODEL.to_string()
}

fn default_requests_per_minute() -> usize {
    crate::providers::rate_limit::DEFAULT_MAX_REQUESTS
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided, must exist)
    /// 2. `~/.maitre/config.toml`
    /// 3. `/etc/maitre/config.toml`
    /// 4. Built-in defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MaitreError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            MaitreError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(MaitreError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".maitre").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/maitre/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Gemini API key from the environment.
    pub fn api_key() -> Result<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| MaitreError::Configuration(format!("{API_KEY_ENV} is not set")))
    }
}
