use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::sink::{BackoffStrategy, RetryConfig};

pub const CONFIG_FILENAME: &str = ".batch2sink.toml";

/// Sink connection settings, loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    pub endpoint: String,
    pub token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
            retry: RetrySettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    500
}

impl SinkConfig {
    pub fn load() -> Result<Self> {
        load_config_from_path(CONFIG_FILENAME)
    }

    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(CONFIG_FILENAME, content)?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.max_attempts,
            delay: Duration::from_millis(self.retry.delay_ms),
            backoff: BackoffStrategy::Fixed,
        }
    }
}

pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<SinkConfig> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
    let config: SinkConfig = toml::from_str(&content)?;
    Ok(config)
}
